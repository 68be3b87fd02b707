//! Order service: the reference user of the version guard.

use std::sync::Arc;

use tracing::{info, instrument};

use stockroom_core::{next_version, Clock, DomainResult, ExpectedVersion, OrderId, Page, Versioned};
use stockroom_sales::{NewOrder, Order, OrderLine, OrderQuery, OrderStatus};

use crate::config::StockroomConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::store::RecordStore;
use crate::version_guard::{update_with_version, VersionGuard};

pub struct OrderService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    guard: VersionGuard,
    config: StockroomConfig,
}

impl<S> OrderService<S>
where
    S: RecordStore<Order>,
{
    pub fn new(store: S, clock: Arc<dyn Clock>, config: StockroomConfig) -> Self {
        Self {
            store,
            clock,
            guard: VersionGuard::new(config.max_cas_attempts),
            config,
        }
    }

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub fn create_order(&self, input: NewOrder) -> ServiceResult<Order> {
        let order = Order::place(input, self.clock.now())?;
        let id = order.id_typed();
        self.store
            .create(order.clone())
            .map_err(|e| ServiceError::from_store("create_order", id, e))?;
        info!(order_id = %id, total = order.total(), "order created");
        Ok(order)
    }

    pub fn get_order(&self, id: OrderId) -> ServiceResult<Order> {
        self.store
            .get(&id)
            .map_err(|e| ServiceError::from_store("get_order", id, e))
    }

    pub fn list_orders(&self, query: &OrderQuery, page: Page) -> ServiceResult<Vec<Order>> {
        self.store
            .list(query, self.config.page(page))
            .map_err(|e| ServiceError::from_store("list_orders", "orders", e))
    }

    /// Write a caller-prepared order if the stored version is still `expected_version`.
    ///
    /// The caller sets the new version (normally `expected_version + 1`).
    #[instrument(skip(self, order), fields(order_id = %order.id_typed(), new_version = order.version()))]
    pub fn update_order_with_version(&self, order: Order, expected_version: u64) -> ServiceResult<Order> {
        let written = update_with_version(&self.store, order, expected_version)?;
        info!(order_id = %written.id_typed(), version = written.version(), "order updated");
        Ok(written)
    }

    /// Replace lines and notes of a pending order.
    #[instrument(skip(self, lines, notes))]
    pub fn revise_order(
        &self,
        id: OrderId,
        lines: Vec<OrderLine>,
        notes: Option<String>,
        expected: ExpectedVersion,
    ) -> ServiceResult<Order> {
        let now = self.clock.now();
        self.modify("revise_order", id, expected, |o| {
            o.revise(lines.clone(), notes.clone(), now)
        })
    }

    /// Move an order along its lifecycle.
    #[instrument(skip(self))]
    pub fn change_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        expected: ExpectedVersion,
    ) -> ServiceResult<Order> {
        let now = self.clock.now();
        let order = self.modify("change_order_status", id, expected, |o| o.transition_to(status, now))?;
        info!(order_id = %id, status = %order.status(), "order status changed");
        Ok(order)
    }

    /// `Exact` writes once against the caller's version; `Any` retries conflicts.
    fn modify(
        &self,
        operation: &'static str,
        id: OrderId,
        expected: ExpectedVersion,
        mut change: impl FnMut(&mut Order) -> DomainResult<()>,
    ) -> ServiceResult<Order> {
        match expected {
            ExpectedVersion::Any => {
                let (order, ()) = self
                    .guard
                    .mutate(&self.store, operation, &id, |o: &mut Order| change(o))?;
                Ok(order)
            }
            ExpectedVersion::Exact(version) => {
                let new_version = next_version(version)?;
                let mut order = self.get_order(id)?;
                expected.check(order.version())?;
                change(&mut order)?;
                order.set_version(new_version);
                update_with_version(&self.store, order, version)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use chrono::{TimeZone, Utc};
    use stockroom_core::{CustomerId, DomainError, ErrorCode, FixedClock, ProductId, Sku};

    fn service() -> OrderService<InMemoryRecordStore<Order>> {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap()));
        OrderService::new(InMemoryRecordStore::new(), clock, StockroomConfig::default())
    }

    fn line(quantity: i32, unit_price: u64) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(),
            sku: Sku::parse("SKU-O").unwrap(),
            quantity,
            unit_price,
        }
    }

    fn place(svc: &OrderService<InMemoryRecordStore<Order>>, customer: CustomerId) -> Order {
        svc.create_order(NewOrder {
            customer_id: customer,
            lines: vec![line(2, 250), line(1, 1_000)],
            notes: None,
        })
        .unwrap()
    }

    #[test]
    fn created_orders_start_at_version_one() {
        let svc = service();
        let order = place(&svc, CustomerId::new());
        assert_eq!(order.version(), 1);
        assert_eq!(order.total(), 1_500);
        assert_eq!(svc.get_order(order.id_typed()).unwrap(), order);
    }

    #[test]
    fn stale_update_is_rejected_and_store_untouched() {
        let svc = service();
        let order = place(&svc, CustomerId::new());

        let mut first = order.clone();
        first.transition_to(OrderStatus::Confirmed, Utc::now()).unwrap();
        first.set_version(2);
        svc.update_order_with_version(first.clone(), 1).unwrap();

        let mut second = order.clone();
        second.transition_to(OrderStatus::Cancelled, Utc::now()).unwrap();
        second.set_version(2);
        let err = svc.update_order_with_version(second, 1).unwrap_err();
        assert_eq!(
            err,
            ServiceError::Domain(DomainError::OptimisticLockFailed { expected: 1, actual: 2 })
        );
        assert_eq!(svc.get_order(order.id_typed()).unwrap(), first);
    }

    #[test]
    fn update_of_missing_order_is_not_found() {
        let svc = service();
        let other = service();
        let mut ghost = place(&other, CustomerId::new());
        ghost.set_version(2);

        assert_eq!(
            svc.update_order_with_version(ghost, 1).unwrap_err().code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn status_changes_follow_the_lifecycle() {
        let svc = service();
        let id = place(&svc, CustomerId::new()).id_typed();

        let o = svc
            .change_order_status(id, OrderStatus::Confirmed, ExpectedVersion::Exact(1))
            .unwrap();
        assert_eq!((o.status(), o.version()), (OrderStatus::Confirmed, 2));

        let err = svc
            .change_order_status(id, OrderStatus::Delivered, ExpectedVersion::Exact(2))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let err = svc
            .change_order_status(id, OrderStatus::Shipped, ExpectedVersion::Exact(1))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OptimisticLockFailed);

        svc.change_order_status(id, OrderStatus::Cancelled, ExpectedVersion::Any)
            .unwrap();
        let err = svc
            .change_order_status(id, OrderStatus::Confirmed, ExpectedVersion::Any)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyTerminal);
    }

    #[test]
    fn maximal_expected_version_is_rejected_not_wrapped() {
        let svc = service();
        let order = place(&svc, CustomerId::new());
        let id = order.id_typed();

        let err = svc
            .change_order_status(id, OrderStatus::Confirmed, ExpectedVersion::Exact(u64::MAX))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(svc.get_order(id).unwrap(), order);
    }

    #[test]
    fn revise_only_while_pending() {
        let svc = service();
        let id = place(&svc, CustomerId::new()).id_typed();

        let o = svc
            .revise_order(id, vec![line(3, 100)], Some("gift wrap".into()), ExpectedVersion::Exact(1))
            .unwrap();
        assert_eq!(o.total(), 300);
        assert_eq!(o.notes(), Some("gift wrap"));

        svc.change_order_status(id, OrderStatus::Confirmed, ExpectedVersion::Any)
            .unwrap();
        let err = svc
            .revise_order(id, vec![line(1, 100)], None, ExpectedVersion::Any)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn listing_filters_by_customer_and_status() {
        let svc = service();
        let alice = CustomerId::new();
        let a1 = place(&svc, alice);
        place(&svc, alice);
        place(&svc, CustomerId::new());
        svc.change_order_status(a1.id_typed(), OrderStatus::Confirmed, ExpectedVersion::Any)
            .unwrap();

        let by_alice = OrderQuery {
            customer_id: Some(alice),
            status: None,
        };
        assert_eq!(svc.list_orders(&by_alice, Page::default()).unwrap().len(), 2);

        let confirmed = OrderQuery {
            customer_id: Some(alice),
            status: Some(OrderStatus::Confirmed),
        };
        let listed = svc.list_orders(&confirmed, Page::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id_typed(), a1.id_typed());
    }
}

//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**; two instances
/// with the same attributes are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Stock-keeping unit: a secondary key for a product/variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Parse a SKU, trimming surrounding whitespace. Empty SKUs are rejected.
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid("sku cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for Sku {}

/// Limit/offset pagination window.
///
/// A `limit` of zero means "unbounded"; services substitute their configured
/// default before hitting a store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Build a page from raw (possibly negative) caller input.
    pub fn from_raw(limit: i64, offset: i64) -> DomainResult<Self> {
        if limit < 0 {
            return Err(DomainError::invalid("limit cannot be negative"));
        }
        if offset < 0 {
            return Err(DomainError::invalid("offset cannot be negative"));
        }
        Ok(Self {
            limit: limit as usize,
            offset: offset as usize,
        })
    }

    /// Replace a zero limit with `default` and clamp to `max`.
    pub fn normalized(self, default: usize, max: usize) -> Self {
        let limit = if self.limit == 0 { default } else { self.limit };
        Self {
            limit: limit.min(max),
            offset: self.offset,
        }
    }

    /// Apply the window to an already-filtered, ordered iterator.
    pub fn apply<T>(self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        if self.limit == 0 {
            iter.collect()
        } else {
            iter.take(self.limit).collect()
        }
    }
}

impl ValueObject for Page {}

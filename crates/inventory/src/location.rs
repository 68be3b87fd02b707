//! Stock locations (warehouses, stores, virtual buckets).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, LocationId, Query, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Warehouse,
    Store,
    Virtual,
}

/// A registered place that can hold stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    code: String,
    name: String,
    kind: LocationKind,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Location {
    pub fn register(
        code: impl AsRef<str>,
        name: impl AsRef<str>,
        kind: LocationKind,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let code = code.as_ref().trim();
        let name = name.as_ref().trim();
        if code.is_empty() {
            return Err(DomainError::invalid("location code cannot be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::invalid("location name cannot be empty"));
        }

        Ok(Self {
            id: LocationId::new(),
            code: code.to_uppercase(),
            name: name.to_string(),
            kind,
            active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> LocationId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.active = true;
        self.updated_at = now;
    }

    pub fn ensure_active(&self) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::LocationInactive(self.code.clone()));
        }
        Ok(())
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.code.clone())
    }
}

impl Versioned for Location {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Location listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub active_only: bool,
    pub kind: Option<LocationKind>,
}

impl Query<Location> for LocationQuery {
    fn matches(&self, location: &Location) -> bool {
        if self.active_only && !location.active {
            return false;
        }
        self.kind.is_none_or(|k| k == location.kind)
    }
}

//! Customer domain model.
//!
//! # Responsibility
//! - Define the canonical customer record persisted by the store.
//! - Enforce creation invariants through validated construction.
//! - Provide explicit status transitions (`activate` / `deactivate`).
//!
//! # Invariants
//! - `id` is assigned by the store on first insert and never changes.
//! - `name` and `email` are never blank.
//! - `created_at <= updated_at` at all times.
//! - New customers always start as `CustomerStatus::Active`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier assigned to a customer by the store.
pub type CustomerId = Uuid;

/// Customer account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

impl CustomerStatus {
    /// Storage/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }

    /// Parses the storage representation. Exact match only.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl Display for CustomerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Caller-supplied fields for a brand new customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
}

/// Model-level validation errors for `Customer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerValidationError {
    /// `id` was set to the nil UUID.
    NilId,
    /// `name` is empty or whitespace only.
    BlankName,
    /// `email` is empty or whitespace only.
    BlankEmail,
    /// `updated_at` is earlier than `created_at`.
    UpdatedBeforeCreated { created_at: i64, updated_at: i64 },
}

impl Display for CustomerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "customer id must not be nil"),
            Self::BlankName => write!(f, "customer name must not be blank"),
            Self::BlankEmail => write!(f, "customer email must not be blank"),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at ({updated_at}) must be >= created_at ({created_at})"
            ),
        }
    }
}

impl Error for CustomerValidationError {}

/// Canonical persisted customer record.
///
/// Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomerRecord")]
pub struct Customer {
    /// `None` until the store assigns an id on first insert.
    pub id: Option<CustomerId>,
    pub name: String,
    /// Unique across the store; compared by exact string match.
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
    pub status: CustomerStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Customer {
    /// Builds a not-yet-persisted customer from a draft.
    ///
    /// # Invariants
    /// - `status` is forced to `Active`.
    /// - `created_at == updated_at == now_ms`.
    /// - `id` stays `None`; the store assigns it.
    pub fn new(draft: CustomerDraft, now_ms: i64) -> Result<Self, CustomerValidationError> {
        let customer = Self {
            id: None,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            company: draft.company,
            address: draft.address,
            status: CustomerStatus::Active,
            created_at: now_ms,
            updated_at: now_ms,
        };
        customer.validate()?;
        Ok(customer)
    }

    /// Checks record invariants. Called by the store before every write.
    pub fn validate(&self) -> Result<(), CustomerValidationError> {
        if self.id.is_some_and(|id| id.is_nil()) {
            return Err(CustomerValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(CustomerValidationError::BlankName);
        }
        if self.email.trim().is_empty() {
            return Err(CustomerValidationError::BlankEmail);
        }
        if self.updated_at < self.created_at {
            return Err(CustomerValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Refreshes `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms.max(self.updated_at);
    }

    pub fn activate(&mut self, now_ms: i64) {
        self.status = CustomerStatus::Active;
        self.touch(now_ms);
    }

    pub fn deactivate(&mut self, now_ms: i64) {
        self.status = CustomerStatus::Inactive;
        self.touch(now_ms);
    }

    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

/// Unchecked serde shape; converted into `Customer` through `validate()`.
#[derive(Deserialize)]
struct CustomerRecord {
    id: Option<CustomerId>,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    address: Option<Address>,
    status: CustomerStatus,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<CustomerRecord> for Customer {
    type Error = CustomerValidationError;

    fn try_from(record: CustomerRecord) -> Result<Self, Self::Error> {
        let customer = Self {
            id: record.id,
            name: record.name,
            email: record.email,
            phone: record.phone,
            company: record.company,
            address: record.address,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        customer.validate()?;
        Ok(customer)
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Clamps to `0` for clocks set before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

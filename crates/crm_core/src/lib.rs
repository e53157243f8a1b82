//! Core domain logic for the customer record manager.
//! This crate is the single source of truth for customer invariants,
//! most importantly email uniqueness across create and update.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CrmConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::customer::{
    Address, Customer, CustomerDraft, CustomerId, CustomerStatus, CustomerValidationError,
};
pub use repo::customer_repo::{
    CustomerRepository, RepoError, RepoResult, SqliteCustomerRepository,
};
pub use repo::customer_store::{CustomerStore, SqliteCustomerStore, TxMode};
pub use service::customer_mapper::{
    AddressPayload, CustomerRequest, CustomerResponse, RequestValidationError,
};
pub use service::customer_service::{CustomerService, CustomerServiceError, ServiceResult};
pub use service::email_uniqueness::EmailUniqueness;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

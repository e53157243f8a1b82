//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the customer entity-store contract.
//! - Isolate SQLite query and transaction details from lifecycle services.
//!
//! # Invariants
//! - Repository writes enforce `Customer::validate()` before persistence.
//! - Repository APIs return semantic errors (`DuplicateEmail`, `NotFound`) in
//!   addition to DB transport errors.

pub mod customer_repo;
pub mod customer_store;

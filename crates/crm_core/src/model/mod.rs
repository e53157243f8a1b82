//! Customer domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every persisted customer is identified by a store-assigned `CustomerId`.
//! - Deletion is a hard delete; no tombstones are kept.

pub mod customer;

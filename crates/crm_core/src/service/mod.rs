//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate mapping, uniqueness checks and repository calls into
//!   lifecycle operations.
//! - Keep boundary adapters decoupled from storage details.

pub mod customer_mapper;
pub mod customer_service;
pub mod email_uniqueness;

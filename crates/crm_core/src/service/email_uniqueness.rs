//! Read-side email uniqueness decisions.
//!
//! # Invariants
//! - Never mutates the store and never retries.
//! - Only an early reject: the unique index on `customers.email` remains the
//!   authority at write time.

use crate::model::customer::CustomerId;
use crate::repo::customer_repo::{CustomerRepository, RepoResult};

/// Email availability checks over one repository.
pub struct EmailUniqueness<'r, R: CustomerRepository + ?Sized> {
    repo: &'r R,
}

impl<'r, R: CustomerRepository + ?Sized> EmailUniqueness<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// True iff no customer currently holds `email`.
    pub fn is_email_available(&self, email: &str) -> RepoResult<bool> {
        Ok(!self.repo.exists_by_email(email)?)
    }

    /// True iff no customer other than `excluded_id` holds `email`.
    ///
    /// A lookup miss counts as available.
    pub fn is_email_available_excluding(
        &self,
        email: &str,
        excluded_id: CustomerId,
    ) -> RepoResult<bool> {
        Ok(self
            .repo
            .get_by_email(email)?
            .map_or(true, |holder| holder.id == Some(excluded_id)))
    }
}

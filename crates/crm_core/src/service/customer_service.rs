//! Customer lifecycle use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/delete and status transition entry points.
//! - Compose request validation, mapping, email uniqueness and persistence
//!   inside one store transaction per operation.
//!
//! # Invariants
//! - A failed create/update leaves the store unchanged.
//! - Email conflicts are reported whether they are caught by the early
//!   availability check or by the unique index at write time.
//! - Errors propagate unchanged to the caller; nothing is retried.
//! - Log lines carry ids and error codes, never emails or names.

use crate::model::customer::{
    now_epoch_ms, Customer, CustomerId, CustomerStatus, CustomerValidationError,
};
use crate::repo::customer_repo::{CustomerRepository, RepoError};
use crate::repo::customer_store::{CustomerStore, TxMode};
use crate::service::customer_mapper::{
    apply_request_to_entity, entity_to_response, request_to_entity, CustomerRequest,
    CustomerResponse, RequestValidationError,
};
use crate::service::email_uniqueness::EmailUniqueness;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ENTITY_NAME: &str = "Customer";

pub type ServiceResult<T> = Result<T, CustomerServiceError>;

/// Service error for customer use-cases.
#[derive(Debug)]
pub enum CustomerServiceError {
    /// Request failed boundary validation; the store was not touched.
    InvalidRequest(RequestValidationError),
    /// Mapped record failed model invariants.
    InvalidCustomer(CustomerValidationError),
    /// Referenced record does not exist.
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    /// Email already held by another customer.
    Conflict { email: String },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl CustomerServiceError {
    /// `NotFound` for a customer looked up by `id`. Takes the raw value so
    /// adapters can report ids that never parsed.
    pub fn customer_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: ENTITY_NAME,
            field: "id",
            value: id.to_string(),
        }
    }

    /// Whether the caller supplied bad input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::InvalidCustomer(_))
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCustomer(_) => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "email_conflict",
            Self::Repo(_) => "repo_failure",
        }
    }
}

impl Display for CustomerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(err) => write!(f, "{err}"),
            Self::InvalidCustomer(err) => write!(f, "{err}"),
            Self::NotFound {
                entity,
                field,
                value,
            } => write!(f, "{entity} not found with {field}: '{value}'"),
            Self::Conflict { email } => write!(f, "email already exists: {email}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CustomerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRequest(err) => Some(err),
            Self::InvalidCustomer(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CustomerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateEmail(email) => Self::Conflict { email },
            RepoError::NotFound(id) => Self::customer_not_found(id),
            RepoError::Validation(err) => Self::InvalidCustomer(err),
            other => Self::Repo(other),
        }
    }
}

impl From<RequestValidationError> for CustomerServiceError {
    fn from(value: RequestValidationError) -> Self {
        Self::InvalidRequest(value)
    }
}

impl From<CustomerValidationError> for CustomerServiceError {
    fn from(value: CustomerValidationError) -> Self {
        Self::InvalidCustomer(value)
    }
}

/// Lifecycle facade over one customer store.
pub struct CustomerService<S: CustomerStore> {
    store: S,
}

impl<S: CustomerStore> CustomerService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates one customer.
    ///
    /// # Contract
    /// - Status is `Active`, `created_at == updated_at`, id assigned by store.
    /// - Fails with `Conflict` when the email is held, writing nothing.
    pub fn create_customer(
        &mut self,
        request: &CustomerRequest,
    ) -> ServiceResult<CustomerResponse> {
        info!("event=customer_create module=service status=start");
        let result = self.try_create(request);
        log_outcome("customer_create", &result, |response| response.id);
        result
    }

    /// Gets one customer by id.
    pub fn get_customer(&mut self, id: CustomerId) -> ServiceResult<CustomerResponse> {
        let result: ServiceResult<CustomerResponse> =
            self.store.in_transaction(TxMode::Read, |repo| {
                let customer = load_required(repo, id)?;
                Ok(entity_to_response(&customer))
            });
        log_outcome("customer_get", &result, |response| response.id);
        result
    }

    /// Lists every customer in insertion order.
    pub fn list_customers(&mut self) -> ServiceResult<Vec<CustomerResponse>> {
        self.list_with("customer_list", |repo| repo.list_all())
    }

    /// Lists customers with the given status in insertion order.
    pub fn list_customers_by_status(
        &mut self,
        status: CustomerStatus,
    ) -> ServiceResult<Vec<CustomerResponse>> {
        self.list_with("customer_list_by_status", |repo| repo.list_by_status(status))
    }

    /// Lists customers whose company matches exactly.
    pub fn list_customers_by_company(
        &mut self,
        company: &str,
    ) -> ServiceResult<Vec<CustomerResponse>> {
        self.list_with("customer_list_by_company", |repo| repo.list_by_company(company))
    }

    /// Replaces the editable fields of one customer.
    ///
    /// # Contract
    /// - `id`, `status` and `created_at` are preserved.
    /// - Fails with `Conflict` when another customer holds the new email;
    ///   the stored record stays untouched.
    pub fn update_customer(
        &mut self,
        id: CustomerId,
        request: &CustomerRequest,
    ) -> ServiceResult<CustomerResponse> {
        info!("event=customer_update module=service status=start id={id}");
        let result = self.try_update(id, request);
        log_outcome("customer_update", &result, |response| response.id);
        result
    }

    /// Hard-deletes one customer.
    pub fn delete_customer(&mut self, id: CustomerId) -> ServiceResult<()> {
        info!("event=customer_delete module=service status=start id={id}");
        let result: ServiceResult<()> = self.store.in_transaction(TxMode::Write, |repo| {
            let customer = load_required(repo, id)?;
            repo.delete(&customer)?;
            Ok(())
        });
        log_outcome("customer_delete", &result, |_| Some(id));
        result
    }

    /// Sets status to `Active`.
    pub fn activate_customer(&mut self, id: CustomerId) -> ServiceResult<CustomerResponse> {
        self.transition(id, "customer_activate", CustomerStatus::Active)
    }

    /// Sets status to `Inactive`.
    pub fn deactivate_customer(&mut self, id: CustomerId) -> ServiceResult<CustomerResponse> {
        self.transition(id, "customer_deactivate", CustomerStatus::Inactive)
    }

    fn try_create(&mut self, request: &CustomerRequest) -> ServiceResult<CustomerResponse> {
        request.validate()?;
        let customer = request_to_entity(request, now_epoch_ms())?;

        self.store.in_transaction(TxMode::Write, |repo| {
            let uniqueness = EmailUniqueness::new(repo);
            if !uniqueness.is_email_available(&customer.email)? {
                return Err(CustomerServiceError::Conflict {
                    email: customer.email.clone(),
                });
            }
            let stored = repo.put(&customer)?;
            Ok(entity_to_response(&stored))
        })
    }

    fn try_update(
        &mut self,
        id: CustomerId,
        request: &CustomerRequest,
    ) -> ServiceResult<CustomerResponse> {
        request.validate()?;

        self.store.in_transaction(TxMode::Write, |repo| {
            let mut customer = load_required(repo, id)?;
            apply_request_to_entity(&mut customer, request, now_epoch_ms());

            let uniqueness = EmailUniqueness::new(repo);
            if !uniqueness.is_email_available_excluding(&customer.email, id)? {
                return Err(CustomerServiceError::Conflict {
                    email: customer.email,
                });
            }
            let stored = repo.put(&customer)?;
            Ok(entity_to_response(&stored))
        })
    }

    fn transition(
        &mut self,
        id: CustomerId,
        event: &'static str,
        status: CustomerStatus,
    ) -> ServiceResult<CustomerResponse> {
        info!("event={event} module=service status=start id={id}");
        let result: ServiceResult<CustomerResponse> =
            self.store.in_transaction(TxMode::Write, |repo| {
                let mut customer = load_required(repo, id)?;
                let now_ms = now_epoch_ms();
                match status {
                    CustomerStatus::Active => customer.activate(now_ms),
                    CustomerStatus::Inactive => customer.deactivate(now_ms),
                }
                let stored = repo.put(&customer)?;
                Ok(entity_to_response(&stored))
            });
        log_outcome(event, &result, |response| response.id);
        result
    }

    fn list_with<F>(
        &mut self,
        event: &'static str,
        query: F,
    ) -> ServiceResult<Vec<CustomerResponse>>
    where
        F: FnOnce(&dyn CustomerRepository) -> Result<Vec<Customer>, RepoError>,
    {
        let result: ServiceResult<Vec<CustomerResponse>> =
            self.store.in_transaction(TxMode::Read, |repo| {
                let customers = query(repo)?;
                Ok(customers.iter().map(entity_to_response).collect())
            });
        match &result {
            Ok(items) => info!("event={event} module=service status=ok count={}", items.len()),
            Err(err) => log_failure(event, err),
        }
        result
    }
}

fn load_required(repo: &dyn CustomerRepository, id: CustomerId) -> ServiceResult<Customer> {
    repo.get(id)?
        .ok_or_else(|| CustomerServiceError::customer_not_found(id))
}

fn log_outcome<T>(
    event: &str,
    result: &ServiceResult<T>,
    id_of: impl FnOnce(&T) -> Option<CustomerId>,
) {
    match result {
        Ok(value) => match id_of(value) {
            Some(id) => info!("event={event} module=service status=ok id={id}"),
            None => info!("event={event} module=service status=ok"),
        },
        Err(err) => log_failure(event, err),
    }
}

fn log_failure(event: &str, err: &CustomerServiceError) {
    match err {
        CustomerServiceError::Repo(inner) => error!(
            "event={event} module=service status=error error_code=repo_failure error={inner}"
        ),
        // Conflict and validation messages may embed user input.
        other => warn!(
            "event={event} module=service status=error error_code={}",
            other.error_code()
        ),
    }
}

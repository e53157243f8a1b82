//! Request/response shapes and entity mapping.
//!
//! # Responsibility
//! - Define the wire-facing customer request and response views.
//! - Validate required request fields before anything touches the store.
//! - Translate between views and the persisted `Customer`.
//!
//! # Invariants
//! - `request_to_entity` forces `Active` status and equal timestamps.
//! - `apply_request_to_entity` never touches `id`, `status` or `created_at`.
//! - `entity_to_response` is a lossless projection.

use crate::model::customer::{
    Address, Customer, CustomerDraft, CustomerId, CustomerStatus, CustomerValidationError,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@.][^\s@]*$").expect("valid email regex"));

/// Address as carried by requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Create/update input. Update uses full-replacement semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<AddressPayload>,
}

/// Projection of a stored customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: Option<CustomerId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<AddressPayload>,
    pub status: CustomerStatus,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Boundary validation failures for `CustomerRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestValidationError {
    /// Required field is empty or whitespace only.
    BlankField(&'static str),
    /// `email` does not look like `local@domain`.
    MalformedEmail(String),
}

impl Display for RequestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} is required"),
            Self::MalformedEmail(email) => write!(f, "email should be valid: `{email}`"),
        }
    }
}

impl Error for RequestValidationError {}

impl CustomerRequest {
    /// Checks required fields: non-blank `name`, non-blank well-formed `email`.
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.name.trim().is_empty() {
            return Err(RequestValidationError::BlankField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(RequestValidationError::BlankField("email"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(RequestValidationError::MalformedEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Builds a new, not-yet-persisted customer from a request.
pub fn request_to_entity(
    request: &CustomerRequest,
    now_ms: i64,
) -> Result<Customer, CustomerValidationError> {
    Customer::new(
        CustomerDraft {
            name: request.name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            company: request.company.clone(),
            address: request.address.as_ref().map(address_from_payload),
        },
        now_ms,
    )
}

pub fn entity_to_response(customer: &Customer) -> CustomerResponse {
    CustomerResponse {
        id: customer.id,
        name: customer.name.clone(),
        email: customer.email.clone(),
        phone: customer.phone.clone(),
        company: customer.company.clone(),
        address: customer.address.as_ref().map(address_to_payload),
        status: customer.status,
        created_at: customer.created_at,
        updated_at: customer.updated_at,
    }
}

/// Overwrites the editable fields of `customer` and refreshes `updated_at`.
pub fn apply_request_to_entity(customer: &mut Customer, request: &CustomerRequest, now_ms: i64) {
    customer.name = request.name.clone();
    customer.email = request.email.clone();
    customer.phone = request.phone.clone();
    customer.company = request.company.clone();
    customer.address = request.address.as_ref().map(address_from_payload);
    customer.touch(now_ms);
}

fn address_from_payload(payload: &AddressPayload) -> Address {
    Address {
        street: payload.street.clone(),
        city: payload.city.clone(),
        state: payload.state.clone(),
        zip_code: payload.zip_code.clone(),
        country: payload.country.clone(),
    }
}

fn address_to_payload(address: &Address) -> AddressPayload {
    AddressPayload {
        street: address.street.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        zip_code: address.zip_code.clone(),
        country: address.country.clone(),
    }
}

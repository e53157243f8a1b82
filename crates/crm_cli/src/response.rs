//! JSON envelope printed by every command.
//!
//! # Invariants
//! - Success signals exit with 0; each failure class has its own code.
//! - Error messages come from `Display` impls, which never echo stored rows.

use crm_core::CustomerServiceError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Created,
    Ok,
    NoContent,
    BadRequest,
    NotFound,
    Conflict,
    InternalError,
}

impl Signal {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Created | Self::Ok | Self::NoContent => 0,
            Self::InternalError => 1,
            Self::BadRequest => 2,
            Self::NotFound => 3,
            Self::Conflict => 4,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: Signal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn success<T: Serialize>(status: Signal, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                status,
                data: Some(value),
                message: None,
            },
            Err(err) => Self::failure(Signal::InternalError, err.to_string()),
        }
    }

    pub fn empty(status: Signal) -> Self {
        Self {
            status,
            data: None,
            message: None,
        }
    }

    pub fn failure(status: Signal, message: impl Into<String>) -> Self {
        Self {
            status,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn from_service_error(err: &CustomerServiceError) -> Self {
        Self::failure(signal_for(err), err.to_string())
    }

    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(
                "{{\"status\":\"internal_error\",\"message\":\"{}\"}}",
                err.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    }
}

pub fn signal_for(err: &CustomerServiceError) -> Signal {
    match err {
        CustomerServiceError::InvalidRequest(_) | CustomerServiceError::InvalidCustomer(_) => {
            Signal::BadRequest
        }
        CustomerServiceError::NotFound { .. } => Signal::NotFound,
        CustomerServiceError::Conflict { .. } => Signal::Conflict,
        CustomerServiceError::Repo(_) => Signal::InternalError,
    }
}

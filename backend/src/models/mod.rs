pub mod booking;
pub mod category;
pub mod id;
pub mod tutor;
pub mod user;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::db::Document;

pub use booking::{Booking, BookingPatch, NewBooking, NewBookingRequest};
pub use category::{CATEGORIES, Category};
pub use id::RecordId;
pub use tutor::{NewTutor, NewTutorRequest, validate_tutor_patch};
pub use user::{NewUser, NewUserRequest, RoleUpdateRequest};

/// Rejected input, reported to the caller as 400.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Serializes a record into the document shape the store persists.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Trimmed, non-empty string or a "missing field" error.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::new(format!("{} is required", field)))
}

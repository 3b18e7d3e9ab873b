//! Remote contact collection.
//!
//! This module provides:
//! - `ContactService` trait for the list/create/delete operations
//! - `HttpContactService` (rest.rs) talking to a REST-style collection endpoint
//! - `ServiceError`, the failure taxonomy every call returns

pub mod rest;

#[cfg(test)]
pub mod testing;

use http::StatusCode;
use thiserror::Error;

use crate::contact::{Contact, NewContact};

pub use self::rest::HttpContactService;

/// Failure of a single remote call. Calls are never retried.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure (connection refused, timeout, TLS, ...)
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// Non-2xx answer that has no more specific meaning
    #[error("server responded with {status}")]
    Server { status: StatusCode },
    /// The server refused the submitted record
    #[error("server rejected the contact ({status})")]
    Validation { status: StatusCode },
    /// The contact no longer exists on the server
    #[error("contact {id} not found on server")]
    NotFound { id: i64 },
    /// Body could not be decoded into contacts
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Map a response status to an error, `None` for success.
    ///
    /// `id` is the contact the request addressed, if any; only then does a
    /// 404 mean the contact is gone rather than a misconfigured endpoint.
    pub fn from_status(status: StatusCode, id: Option<i64>) -> Option<Self> {
        if status.is_success() {
            return None;
        }
        Some(match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => ServiceError::NotFound { id },
            (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
                ServiceError::Validation { status }
            }
            _ => ServiceError::Server { status },
        })
    }
}

/// Trait for contact collection backends
#[allow(async_fn_in_trait)]
pub trait ContactService {
    /// Fetch the whole collection
    async fn get_all(&self) -> Result<Vec<Contact>, ServiceError>;

    /// Create a contact, returning the server's canonical record
    async fn create(&self, contact: &NewContact) -> Result<Contact, ServiceError>;

    /// Remove a contact by id
    async fn delete_number(&self, contact: &Contact) -> Result<(), ServiceError>;
}

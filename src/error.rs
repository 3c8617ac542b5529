//! Request-scoped error taxonomy.
//!
//! Every failure raised while building a projection, translating it into an
//! analytic query, or validating that query is one of these variants. None of
//! them are fatal to the process; the request handler maps them to responses
//! with [`RequestError::status`].

use thiserror::Error;

/// Result type for request processing.
pub type RequestResult<T> = Result<T, RequestError>;

/// Errors raised while processing a single request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Unknown root collection, or an unknown relationship used as a path segment.
    #[error("Unknown collection '{0}'")]
    InvalidCollection(String),

    /// A client supplied value that the target type cannot accept.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Malformed filter, failed filter template, or rejected query parameters.
    #[error("{0}")]
    BadRequest(String),

    /// Structurally illegal analytic query.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl RequestError {
    pub fn invalid_collection(name: impl Into<String>) -> Self {
        RequestError::InvalidCollection(name.into())
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        RequestError::InvalidValue(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        RequestError::BadRequest(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        RequestError::InvalidOperation(message.into())
    }

    /// HTTP status code a handler should answer with.
    pub fn status(&self) -> u16 {
        match self {
            RequestError::InvalidCollection(_) => 404,
            RequestError::InvalidValue(_)
            | RequestError::BadRequest(_)
            | RequestError::InvalidOperation(_) => 400,
        }
    }
}

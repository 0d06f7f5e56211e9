//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::InvalidDocument`], [`ServiceError::KeyFormat`],
///   [`ServiceError::Descriptor`] → 400
/// - [`ServiceError::Auth`] → 401
/// - [`ServiceError::KeyNotFound`], [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Crypto`] → 422
/// - [`ServiceError::Collaborator`] → 502
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The input is not valid JSON or its top level is not an object.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Key material could not be decoded: bad PEM tag, DER, or base64.
    #[error("key format error: {0}")]
    KeyFormat(String),

    /// The requested key alias does not exist in the key-store.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key-store password was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// An encrypt, decrypt, or sign operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The crypto descriptor list is malformed or missing.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// The ledger collaborator failed. The message is passed through verbatim.
    #[error("ledger error: {0}")]
    Collaborator(String),

    /// No record is stored under the requested key.
    #[error("record not found: {0}")]
    NotFound(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::InvalidDocument(_) => 400,
            ServiceError::KeyFormat(_) => 400,
            ServiceError::Descriptor(_) => 400,
            ServiceError::Auth(_) => 401,
            ServiceError::KeyNotFound(_) => 404,
            ServiceError::NotFound(_) => 404,
            ServiceError::Crypto(_) => 422,
            ServiceError::Collaborator(_) => 502,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidDocument(_) => "invalid_document",
            ServiceError::KeyFormat(_) => "key_format",
            ServiceError::KeyNotFound(_) => "key_not_found",
            ServiceError::Auth(_) => "auth_error",
            ServiceError::Crypto(_) => "crypto_error",
            ServiceError::Descriptor(_) => "descriptor_error",
            ServiceError::Collaborator(_) => "collaborator_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

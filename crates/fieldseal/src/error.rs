//! Conversions from layer errors into [`ServiceError`].

use common::ServiceError;

use crate::crypto::CipherError;
use crate::keys::KeyError;
use crate::ledger::LedgerError;
use crate::transform::{FieldFailure, TransformError};

impl From<CipherError> for ServiceError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::KeyFormat(_) => ServiceError::KeyFormat(e.to_string()),
            CipherError::PlaintextTooLarge { .. } | CipherError::Crypto(_) => {
                ServiceError::Crypto(e.to_string())
            }
        }
    }
}

impl From<TransformError> for ServiceError {
    fn from(e: TransformError) -> Self {
        match &e {
            TransformError::InvalidDocument(_) => ServiceError::InvalidDocument(e.to_string()),
            TransformError::Descriptor(_) => ServiceError::Descriptor(e.to_string()),
            TransformError::Field {
                source: FieldFailure::Cipher(CipherError::KeyFormat(_)),
                ..
            } => ServiceError::KeyFormat(e.to_string()),
            TransformError::Field { .. } => ServiceError::Crypto(e.to_string()),
        }
    }
}

impl From<KeyError> for ServiceError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::NotFound(_) => ServiceError::KeyNotFound(e.to_string()),
            KeyError::Format(_) => ServiceError::KeyFormat(e.to_string()),
            KeyError::Auth(_) => ServiceError::Auth(e.to_string()),
            KeyError::Io { .. } => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(e: LedgerError) -> Self {
        ServiceError::Collaborator(e.to_string())
    }
}

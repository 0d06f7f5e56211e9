//! Ledger collaborator contract.
//!
//! The ledger persists sealed records by key and owns consistency: conflict
//! detection between concurrent writers, retries and transaction ids all
//! belong to the implementation behind [`Ledger`]. Nothing in this crate
//! retries a failed ledger call.
//!
//! Every write returns the id of the transaction that carried it, so
//! concurrent callers sharing one handle each see their own id.

pub mod memory;

pub use memory::MemoryLedger;

use thiserror::Error;

/// Errors reported by a ledger implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Backend failure. The message is surfaced to callers unchanged.
    #[error("{0}")]
    Backend(String),

    /// The query expression was rejected.
    #[error("invalid query expression: {0}")]
    InvalidQuery(String),
}

/// Key/value ledger holding serialised records.
#[cfg_attr(test, mockall::automock)]
pub trait Ledger: Send + Sync {
    /// Read the record stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Store `value` under `key`, replacing any previous record. Returns the
    /// transaction id assigned to this write.
    fn put(&self, key: &str, value: Vec<u8>) -> Result<String, LedgerError>;

    /// Remove the record stored under `key` and return the transaction id.
    /// Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<String, LedgerError>;

    /// All `(key, record)` pairs matching `query`, ordered by key. The
    /// expression language is defined by the implementation.
    fn range_query(&self, query: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError>;
}

//! [`MemoryLedger`]: in-process ledger for development and tests.
//!
//! # Query expressions
//!
//! `range_query` accepts a selector document:
//!
//! ```json
//! {"selector": {"docType": "indicator", "id": 52235}}
//! ```
//!
//! A record matches when every selector entry equals the record's top-level
//! field of the same name. Sealed fields hold ciphertext, so only clear
//! fields are useful in a selector. `{"selector": {}}` matches every record.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Ledger, LedgerError};

/// Thread-safe in-memory ledger. Each write is its own transaction with a
/// fresh UUID v4 id.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryLedger {
    /// Create a new, empty [`MemoryLedger`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Return `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Backend("ledger lock poisoned".into())
}

fn parse_selector(query: &str) -> Result<Map<String, Value>, LedgerError> {
    let expr: Value =
        serde_json::from_str(query).map_err(|e| LedgerError::InvalidQuery(e.to_string()))?;
    match expr.get("selector") {
        Some(Value::Object(selector)) => Ok(selector.clone()),
        _ => Err(LedgerError::InvalidQuery(
            "expected {\"selector\": {...}}".into(),
        )),
    }
}

fn selector_matches(selector: &Map<String, Value>, record: &[u8]) -> bool {
    let Ok(Value::Object(doc)) = serde_json::from_slice::<Value>(record) else {
        return false;
    };
    selector.iter().all(|(k, v)| doc.get(k) == Some(v))
}

impl Ledger for MemoryLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<String, LedgerError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(key.to_owned(), value);
        Ok(Uuid::new_v4().to_string())
    }

    fn delete(&self, key: &str) -> Result<String, LedgerError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.remove(key);
        Ok(Uuid::new_v4().to_string())
    }

    fn range_query(&self, query: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        let selector = parse_selector(query)?;
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .iter()
            .filter(|(_, v)| selector_matches(&selector, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

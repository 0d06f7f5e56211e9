//! Shared application state injected into every Axum handler.

use crate::records::RecordService;

/// Application state shared across all request handlers.
///
/// [`RecordService`] is `Arc`-backed, so Axum can clone the state per request
/// without copying keys or ledger handles.
#[derive(Clone)]
pub struct AppState {
    pub records: RecordService,
}

impl AppState {
    pub fn new(records: RecordService) -> Self {
        Self { records }
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use std::sync::Arc;

    use crate::keys::ring::owner_ring;
    use crate::ledger::MemoryLedger;

    AppState::new(RecordService::new(
        Arc::new(MemoryLedger::new()),
        Arc::new(owner_ring()),
    ))
}

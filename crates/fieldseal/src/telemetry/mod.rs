//! Structured logging and optional trace export.
//!
//! Logs are JSON lines on stdout. When an OTLP endpoint is configured, spans
//! are also exported over gRPC to that collector.
//!
//! Plaintext field values, passwords and private key material must never
//! appear in a span attribute or log field. Log field names and record keys
//! only.

pub mod init;

pub use init::init_telemetry;

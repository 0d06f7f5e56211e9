//! `fieldseal` service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from the INI file named by the first
//!    argument (optional) and `FIELDSEAL__*` environment variables.
//! 2. Initialise tracing.
//! 3. Resolve the service key pair into a [`KeyRing`].
//! 4. Build the [`RecordService`] over the ledger and start the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use fieldseal::config::Config;
use fieldseal::keys::KeyRing;
use fieldseal::ledger::MemoryLedger;
use fieldseal::records::RecordService;
use fieldseal::server::{self, state::AppState};
use fieldseal::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let mut cfg = Config::load(config_path.as_deref()).map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(
        cfg.server.otel_exporter_otlp_endpoint.as_deref(),
        &cfg.server.log_level,
    )?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        partner = %cfg.merchant.partner,
        "fieldseal starting"
    );

    // -----------------------------------------------------------------------
    // 3. Keys
    // -----------------------------------------------------------------------
    let keys = KeyRing::load(&mut cfg).context("failed to load service keys")?;
    info!(strategy = ?keys.strategy(), "service keys loaded");

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let records = RecordService::new(Arc::new(MemoryLedger::new()), Arc::new(keys));
    let router = server::router::build(AppState::new(records));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.server.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

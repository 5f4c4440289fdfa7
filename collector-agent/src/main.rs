//! Collector agent binary: samples runtime/host telemetry and dispatches it to a server.

// std
use std::sync::Arc;
// crates.io
use collector_core::AgentConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
	let config = Arc::new(AgentConfig::load());

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::new(&config.log_level))
		.init();

	#[cfg(feature = "prometheus")]
	if let Err(err) = collector_core::install_default_exporter() {
		tracing::warn!(error = %err, "failed to install prometheus exporter");
	}

	let client = Arc::new(reqwest::Client::new());
	let cancel = CancellationToken::new();

	tracing::info!(address = %config.address, "collector agent started");

	tokio::select! {
		_ = collector_core::agent::run(Arc::clone(&config), client, cancel.clone()) => {},
		_ = signal::ctrl_c() => {
			tracing::info!("shutdown signal received");
			cancel.cancel();
		},
	}
}

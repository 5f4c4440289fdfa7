//! Collector server binary: aggregates metric reports into memory and persists them through
//! whichever backend [`collector_core::store::select`] resolves to.

// std
use std::{process::ExitCode, sync::Arc};
// crates.io
use collector_core::{AppState, ServerConfig, Table, build_router, store};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
	let config = ServerConfig::load();

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::new(&config.log_level))
		.init();

	#[cfg(feature = "prometheus")]
	if let Err(err) = collector_core::install_default_exporter() {
		tracing::warn!(error = %err, "failed to install prometheus exporter");
	}

	let table = Table::new();
	let backend = store::select(&config, Arc::clone(&table)).await;
	let cancel = CancellationToken::new();
	let store_service =
		collector_core::StoreService::new(backend, config.store_interval, cancel.clone());

	if config.restore
		&& let Err(err) = store_service.restore().await
	{
		tracing::error!(error = %err, "failed to restore storage");
	}

	store_service.spawn_flush_ticker();

	let state = AppState { table, store: store_service.clone(), config: Arc::new(config.clone()) };
	let router = build_router(state);
	let listener = match TcpListener::bind(&config.address).await {
		Ok(listener) => listener,
		Err(err) => {
			tracing::error!(error = %err, address = %config.address, "failed to bind listener");

			return ExitCode::FAILURE;
		},
	};

	tracing::info!(address = %config.address, "collector server listening");

	axum::serve(listener, router)
		.with_graceful_shutdown(shutdown_signal(cancel.clone()))
		.await
		.expect("server failed");

	if let Err(err) = store_service.save().await {
		tracing::error!(error = %err, "failed to flush storage on shutdown");
	}
	if let Err(err) = store_service.close().await {
		tracing::error!(error = %err, "failed to close storage on shutdown");
	}

	ExitCode::SUCCESS
}

async fn shutdown_signal(cancel: CancellationToken) {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("failed to install ctrl-c handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	cancel.cancel();
}

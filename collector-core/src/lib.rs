//! Core metrics table, storage backends, signing, retry and transport primitives shared by the
//! collector agent and server binaries.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod agent;
pub mod config;
#[cfg(feature = "metrics")] pub mod metrics;
pub mod server;
pub mod signing;
pub mod store;

mod error;
mod model;
mod retry;
mod _prelude {
	pub use std::sync::Arc;
	pub use std::time::{Duration, SystemTime};

	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}
#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	config::{AgentConfig, ServerConfig},
	error::{Error, Result},
	model::{HASH_HEADER, MetricForm, MetricKind, Table},
	retry::retry,
	server::{AppState, build_router},
	store::{Store, StoreKind, StoreService},
};

#[cfg(test)]
mod _test {
	use metrics_util as _;
	use tracing_subscriber as _;
	use wiremock as _;
}

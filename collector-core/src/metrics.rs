//! Self-observability: operational counters/histograms for the collector processes themselves,
//! independent of the business gauges/counters it aggregates on behalf of callers.

// std
use std::sync::OnceLock;
// crates.io
use metrics::Label;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::_prelude::*;

type LabelSet = SmallVec<[Label; 4]>;

const METRIC_REQUESTS_TOTAL: &str = "collector_http_requests_total";
const METRIC_STORE_SAVES_TOTAL: &str = "collector_store_saves_total";
const METRIC_STORE_SAVE_DURATION: &str = "collector_store_save_duration_seconds";
const METRIC_DISPATCH_TOTAL: &str = "collector_agent_dispatch_total";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the default Prometheus recorder. Idempotent; later calls are no-ops.
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a completed server request.
pub fn record_request(method: &str, path: &str, status: u16) {
	metrics::counter!(METRIC_REQUESTS_TOTAL, labels(method, path, status).iter()).increment(1);
}

/// Record the outcome and latency of a store save.
pub fn record_store_save(ok: bool, duration: Duration) {
	let status = if ok { "ok" } else { "error" };

	metrics::counter!(METRIC_STORE_SAVES_TOTAL, &[Label::new("status", status)]).increment(1);
	metrics::histogram!(METRIC_STORE_SAVE_DURATION).record(duration.as_secs_f64());
}

/// Record a dispatcher send outcome.
pub fn record_dispatch(ok: bool) {
	let status = if ok { "ok" } else { "error" };

	metrics::counter!(METRIC_DISPATCH_TOTAL, &[Label::new("status", status)]).increment(1);
}

fn labels(method: &str, path: &str, status: u16) -> LabelSet {
	let mut labels = LabelSet::with_capacity(3);

	labels.push(Label::new("method", method.to_owned()));
	labels.push(Label::new("path", path.to_owned()));
	labels.push(Label::new("status", status.to_string()));

	labels
}

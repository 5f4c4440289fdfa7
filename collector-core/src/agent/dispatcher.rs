//! Fan out a batch of metric reports to the server through a bounded worker pool.

// crates.io
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	config::AgentConfig,
	model::{HASH_HEADER, MetricForm},
	retry::retry,
	signing,
};

/// Outcome of a single metric POST, kept for logging/telemetry parity with the original agent's
/// `SendMetricResult`.
#[derive(Debug)]
pub struct SendResult {
	/// Metric id this result belongs to.
	pub id: String,
	/// HTTP status code of the final attempt.
	pub status: u16,
}

/// Send every form in `forms` through `config.rate_limit` concurrent workers, retrying each send
/// independently. Returns once every job has been attempted (success or exhausted retries).
pub async fn dispatch(
	forms: Vec<MetricForm>,
	client: Arc<Client>,
	config: &AgentConfig,
	cancel: CancellationToken,
) -> Vec<SendResult> {
	if forms.is_empty() {
		return Vec::new();
	}

	let (tx, rx) = mpsc::channel(forms.len());
	let rx = Arc::new(tokio::sync::Mutex::new(rx));
	let mut workers = Vec::with_capacity(config.rate_limit);

	for _ in 0..config.rate_limit {
		let rx = Arc::clone(&rx);
		let client = Arc::clone(&client);
		let address = config.address.clone();
		let hash_key = config.hash_key.clone();
		let cancel = cancel.clone();

		workers.push(tokio::spawn(async move {
			let mut results = Vec::new();

			loop {
				let form = {
					let mut rx = rx.lock().await;

					rx.recv().await
				};
				let Some(form) = form else { break };
				let id = form.id.clone();
				let status = send_with_retry(&client, &address, &hash_key, &form, &cancel).await;

				results.push(SendResult { id, status });
			}

			results
		}));
	}

	for form in forms {
		if tx.send(form).await.is_err() {
			break;
		}
	}

	drop(tx);

	let mut results = Vec::new();

	for worker in workers {
		if let Ok(mut partial) = worker.await {
			results.append(&mut partial);
		}
	}

	results
}

async fn send_with_retry(
	client: &Client,
	address: &str,
	hash_key: &str,
	form: &MetricForm,
	cancel: &CancellationToken,
) -> u16 {
	let url = match endpoint(address, form) {
		Ok(url) => url,
		Err(err) => {
			tracing::error!(error = %err, metric = %form.id, "invalid metric type");

			return 0;
		},
	};
	let body = match serde_json::to_vec(form) {
		Ok(body) => body,
		Err(err) => {
			tracing::error!(error = %err, "marshal data error");

			return 0;
		},
	};

	let result = retry(cancel, || async {
		let mut request = client.post(&url).header("Content-Type", "application/json");

		if !hash_key.is_empty() {
			request = request.header(HASH_HEADER, signing::sign(&body, hash_key.as_bytes()));
		}

		request.body(body.clone()).send().await
	})
	.await;

	match result {
		Ok(response) => {
			let status = response.status();

			#[cfg(feature = "metrics")]
			crate::metrics::record_dispatch(status.is_success());

			status.as_u16()
		},
		Err(err) => {
			tracing::error!(error = %err, metric = %form.id, "send stats error");

			#[cfg(feature = "metrics")]
			crate::metrics::record_dispatch(false);

			0
		},
	}
}

fn endpoint(address: &str, form: &MetricForm) -> crate::error::Result<String> {
	match form.kind {
		Some(crate::model::MetricKind::Gauge) => {
			let value = form.value.unwrap_or_default();

			Ok(format!("http://{address}/update/gauge/{}/{value}", form.id))
		},
		Some(crate::model::MetricKind::Counter) => {
			let delta = form.delta.unwrap_or_default();

			Ok(format!("http://{address}/update/counter/{}/{delta}", form.id))
		},
		None => Err(crate::error::Error::InvalidMetricKind(form.id.clone())),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use wiremock::{
		Mock, MockServer, ResponseTemplate,
		matchers::{method, path_regex},
	};
	// self
	use super::*;

	#[tokio::test]
	async fn dispatch_sends_every_form_and_reports_status() {
		let server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path_regex(r"^/update/(gauge|counter)/.*"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;

		let address = server.address().to_string();
		let config = AgentConfig {
			log_level: "debug".into(),
			address,
			hash_key: String::new(),
			report_interval: Duration::from_secs(10),
			poll_interval: Duration::from_secs(2),
			rate_limit: 2,
		};
		let forms = vec![MetricForm::gauge("temp", 1.0), MetricForm::counter("hits", 3)];
		let results = dispatch(
			forms,
			Arc::new(Client::new()),
			&config,
			CancellationToken::new(),
		)
		.await;

		assert_eq!(results.len(), 2);
		assert!(results.iter().all(|r| r.status == 200));
	}
}

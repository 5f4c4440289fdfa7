//! End-to-end agent cycle: sample host/runtime stats, then dispatch them to a mock server.

// std
use std::sync::Arc;
// crates.io
use collector_core::agent::{Sampler, dispatch};
use tokio_util::sync::CancellationToken;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path_regex},
};

fn test_config(address: String) -> collector_core::AgentConfig {
	collector_core::AgentConfig {
		log_level: "debug".into(),
		address,
		hash_key: String::new(),
		report_interval: std::time::Duration::from_millis(10),
		poll_interval: std::time::Duration::from_millis(10),
		rate_limit: 4,
	}
}

#[tokio::test]
async fn sampled_stats_are_dispatched_and_acknowledged() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path_regex(r"^/update/(gauge|counter)/.+$"))
		.respond_with(ResponseTemplate::new(200))
		.mount(&server)
		.await;

	let sampler = Sampler::new();

	sampler.refresh();

	let mut forms = sampler.stat_forms();

	forms.push(sampler.poll_count_form());

	assert!(!forms.is_empty(), "a refreshed sampler must produce at least one stat");

	let address = server.uri().trim_start_matches("http://").to_owned();
	let config = test_config(address);
	let client = Arc::new(reqwest::Client::new());
	let results = dispatch(forms, client, &config, CancellationToken::new()).await;

	assert!(!results.is_empty());
	assert!(results.iter().all(|r| r.status == 200), "every dispatched metric should succeed: {results:?}");
}

#[tokio::test]
async fn server_error_responses_are_reported_without_panicking() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path_regex(r"^/update/(gauge|counter)/.+$"))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;

	let sampler = Sampler::new();

	sampler.refresh();

	let forms = vec![sampler.poll_count_form()];
	let address = server.uri().trim_start_matches("http://").to_owned();
	let config = test_config(address);
	let client = Arc::new(reqwest::Client::new());
	let results = dispatch(forms, client, &config, CancellationToken::new()).await;

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].status, 500, "a server-side error response is surfaced as-is, not retried");
}

/// Mirrors the reset-gating logic in `agent::run`'s report tick: only clear `PollCount` once
/// every dispatched send actually reached the server (`status != 0`).
fn all_sends_succeeded(results: &[collector_core::agent::SendResult]) -> bool {
	results.iter().all(|r| r.status != 0)
}

#[tokio::test]
async fn poll_count_is_not_reset_after_a_send_that_never_reaches_the_server() {
	let sampler = Sampler::new();

	sampler.refresh();
	sampler.refresh();

	let forms = vec![sampler.poll_count_form()];
	// Nothing listens here, so every attempt fails at the transport layer (status 0) rather than
	// returning an HTTP response.
	let config = test_config("127.0.0.1:1".to_owned());
	let client = Arc::new(reqwest::Client::new());
	let cancel = CancellationToken::new();

	// Cancel immediately so the fixed 1s/3s/5s backoff between retries is skipped; the first
	// attempt still runs and still fails against the closed port.
	cancel.cancel();

	let results = dispatch(forms, client, &config, cancel).await;

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].status, 0, "a connection failure must surface as status 0");
	assert!(!all_sends_succeeded(&results));

	if all_sends_succeeded(&results) {
		sampler.reset_poll_count();
	}

	assert_eq!(
		sampler.poll_count_form().delta,
		Some(2),
		"a failed dispatch cycle must leave PollCount accumulating rather than resetting it"
	);
}

//! End-to-end coverage of the server's route table, run against the router directly via
//! `tower::ServiceExt::oneshot` rather than a bound socket.

// std
use std::sync::Arc;
// crates.io
use axum::body::Body;
use collector_core::{AppState, MetricForm, Table, build_router, store::MemoryStore};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn test_state(hash_key: &str) -> AppState {
	let table = Table::new();
	let backend = Arc::new(MemoryStore::new(Arc::clone(&table)));
	let store = collector_core::StoreService::new(
		backend,
		std::time::Duration::from_secs(0),
		CancellationToken::new(),
	);
	let mut config = test_config();

	config.hash_key = hash_key.to_owned();

	AppState { table, store, config: Arc::new(config) }
}

fn test_config() -> collector_core::ServerConfig {
	collector_core::ServerConfig {
		log_level: "debug".into(),
		address: "127.0.0.1:0".into(),
		hash_key: String::new(),
		file_storage_path: "storage.db".into(),
		dsn: String::new(),
		store_interval: std::time::Duration::from_secs(0),
		restore: false,
	}
}

async fn send(
	app: axum::Router,
	method: &str,
	uri: &str,
	body: Vec<u8>,
) -> (u16, Vec<u8>) {
	let request =
		axum::http::Request::builder().method(method).uri(uri).body(Body::from(body)).unwrap();
	let response = app.oneshot(request).await.unwrap();
	let status = response.status().as_u16();
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();

	(status, bytes)
}

#[tokio::test]
async fn path_gauge_write_then_read_round_trips() {
	let state = test_state("");
	let app = build_router(state);

	let (status, _) =
		send(app.clone(), "POST", "/update/gauge/temp/12.5", Vec::new()).await;

	assert_eq!(status, 200);

	let (status, body) = send(app, "GET", "/value/gauge/temp", Vec::new()).await;

	assert_eq!(status, 200);
	assert_eq!(String::from_utf8(body).unwrap(), "12.5");
}

#[tokio::test]
async fn path_counter_write_twice_then_read_accumulates() {
	let state = test_state("");
	let app = build_router(state);

	send(app.clone(), "POST", "/update/counter/hits/1", Vec::new()).await;
	send(app.clone(), "POST", "/update/counter/hits/2", Vec::new()).await;

	let (status, body) = send(app, "GET", "/value/counter/hits", Vec::new()).await;

	assert_eq!(status, 200);
	assert_eq!(String::from_utf8(body).unwrap(), "3");
}

#[tokio::test]
async fn batch_update_accumulates_counters() {
	let state = test_state("");
	let app = build_router(state.clone());
	let forms =
		serde_json::to_vec(&vec![MetricForm::counter("hits", 5), MetricForm::gauge("temp", 1.0)])
			.unwrap();

	let (status, _) = send(app, "POST", "/updates/", forms).await;

	assert_eq!(status, 200);
	assert_eq!(state.table.counter("hits"), Some(5));
	assert_eq!(state.table.gauge("temp"), Some(1.0));
}

#[tokio::test]
async fn empty_batch_is_rejected() {
	let state = test_state("");
	let app = build_router(state);

	let (status, _) = send(app, "POST", "/updates/", b"[]".to_vec()).await;

	assert_eq!(status, 400);
}

#[tokio::test]
async fn unrecognized_metric_body_is_rejected_by_allowed_metrics_filter() {
	let state = test_state("");
	let app = build_router(state);
	let body = serde_json::to_vec(&serde_json::json!({"id": "x", "type": "histogram"})).unwrap();

	let (status, _) = send(app, "POST", "/update/", body).await;

	assert_eq!(status, 400);
}

#[tokio::test]
async fn signed_request_with_correct_signature_is_accepted() {
	let state = test_state("secret");
	let app = build_router(state);
	let form = MetricForm::gauge("temp", 3.0);
	let body = serde_json::to_vec(&form).unwrap();
	let signature = collector_core::signing::sign(&body, b"secret");
	let request = axum::http::Request::builder()
		.method("POST")
		.uri("/update/")
		.header(collector_core::HASH_HEADER, signature)
		.body(Body::from(body))
		.unwrap();
	let response = app.oneshot(request).await.unwrap();

	assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn signed_request_with_wrong_signature_is_rejected() {
	let state = test_state("secret");
	let app = build_router(state);
	let form = MetricForm::gauge("temp", 3.0);
	let body = serde_json::to_vec(&form).unwrap();
	let request = axum::http::Request::builder()
		.method("POST")
		.uri("/update/")
		.header(collector_core::HASH_HEADER, "deadbeef")
		.body(Body::from(body))
		.unwrap();
	let response = app.oneshot(request).await.unwrap();

	assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn missing_counter_returns_404() {
	let state = test_state("");
	let app = build_router(state);

	let (status, _) = send(app, "GET", "/value/counter/never-reported", Vec::new()).await;

	assert_eq!(status, 404);
}

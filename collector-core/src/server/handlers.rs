//! Route handlers: metric ingestion (path-encoded and JSON-bodied) and query endpoints.

// crates.io
use axum::{
	Json,
	body::Bytes,
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
};
// self
use super::AppState;
use crate::{
	error::Error,
	model::{HASH_HEADER, MetricForm, MetricKind},
	signing,
};

/// `GET /` — liveness landing page; the original server just returns an empty 200 HTML body.
pub async fn index() -> impl IntoResponse {
	([(axum::http::header::CONTENT_TYPE, "text/html")], StatusCode::OK)
}

/// `GET /ping` — reports whether the active backend is the database.
pub async fn ping(State(state): State<AppState>) -> impl IntoResponse {
	if state.store.kind() != crate::store::StoreKind::Db {
		return Error::Store("connect to db doesn't exist".to_owned()).into_response();
	}

	success(&state)
}

/// `POST /updates/` — ingest a batch of metrics in one request.
pub async fn update_metrics_batch(
	State(state): State<AppState>,
	body: Bytes,
) -> Response {
	let forms: Vec<MetricForm> = match serde_json::from_slice(&body) {
		Ok(forms) => forms,
		Err(err) => return bad_request(&err.to_string()),
	};

	if forms.is_empty() {
		return Error::EmptyBatch.into_response();
	}

	for form in &forms {
		apply(&state, form);
	}

	flush_if_sync(&state).await;

	success(&state)
}

/// `POST /update/` — ingest a single metric described by a JSON body.
pub async fn update_metric(State(state): State<AppState>, body: Bytes) -> Response {
	let form = match parse_form(&body) {
		Ok(form) => form,
		Err(err) => return bad_request(&err.to_string()),
	};

	let response = match form.kind {
		Some(MetricKind::Gauge) => {
			let Some(value) = form.value else {
				return Error::Validation { field: "value", reason: "gauge report missing value".into() }
					.into_response();
			};

			state.table.set_gauge(&form.id, value);

			send_json(&state, StatusCode::OK, &MetricForm::gauge(form.id, value))
		},
		Some(MetricKind::Counter) => {
			let Some(delta) = form.delta else {
				return Error::Validation {
					field: "delta",
					reason: "counter report missing delta".into(),
				}
				.into_response();
			};
			let total = state.table.add_counter(&form.id, delta);

			send_json(&state, StatusCode::OK, &MetricForm::counter(form.id, total))
		},
		None => Error::InvalidMetricKind("none".to_owned()).into_response(),
	};

	flush_if_sync(&state).await;

	response
}

/// `POST /value/` — query a single metric described by a JSON body; absent metrics echo zero
/// rather than 404ing, matching the permissive body-query behavior of the original server.
pub async fn get_metric(State(state): State<AppState>, body: Bytes) -> Response {
	let form = match parse_form(&body) {
		Ok(form) => form,
		Err(err) => return bad_request(&err.to_string()),
	};

	match form.kind {
		Some(MetricKind::Gauge) => {
			let value = state.table.gauge(&form.id).unwrap_or_default();

			send_json(&state, StatusCode::OK, &MetricForm::gauge(form.id, value))
		},
		Some(MetricKind::Counter) => {
			let delta = state.table.counter(&form.id).unwrap_or_default();

			send_json(&state, StatusCode::OK, &MetricForm::counter(form.id, delta))
		},
		None => Error::InvalidMetricKind("none".to_owned()).into_response(),
	}
}

/// `POST /` under the allowed-metrics-only group — acknowledges with an empty 200.
pub async fn update_root(State(state): State<AppState>) -> Response {
	success(&state)
}

/// `POST /update/counter/` and `/update/gauge/` with no metric segment — always 404.
pub async fn not_found() -> impl IntoResponse {
	StatusCode::NOT_FOUND
}

/// `POST /update/counter/{metric}/{value}` — path-encoded counter increment.
pub async fn update_counter(
	State(state): State<AppState>,
	Path((metric, value)): Path<(String, String)>,
) -> Response {
	let delta: i64 = match value.parse() {
		Ok(v) => v,
		Err(err) => return bad_request(&err.to_string()),
	};

	state.table.add_counter(&metric, delta);

	flush_if_sync(&state).await;

	success(&state)
}

/// `POST /update/gauge/{metric}/{value}` — path-encoded gauge write.
pub async fn update_gauge(
	State(state): State<AppState>,
	Path((metric, value)): Path<(String, String)>,
) -> Response {
	let value: f64 = match value.parse() {
		Ok(v) => v,
		Err(err) => return bad_request(&err.to_string()),
	};

	state.table.set_gauge(&metric, value);

	flush_if_sync(&state).await;

	success(&state)
}

/// `GET /value/counter/{metric}` — 404 when the counter has never been reported.
pub async fn get_counter(
	State(state): State<AppState>,
	Path(metric): Path<String>,
) -> Response {
	match state.table.counter(&metric) {
		Some(value) => send_json(&state, StatusCode::OK, &value),
		None => Error::MetricNotFound(metric).into_response(),
	}
}

/// `GET /value/gauge/{metric}` — 404 when the gauge has never been reported.
pub async fn get_gauge(State(state): State<AppState>, Path(metric): Path<String>) -> Response {
	match state.table.gauge(&metric) {
		Some(value) => send_json(&state, StatusCode::OK, &value),
		None => Error::MetricNotFound(metric).into_response(),
	}
}

fn apply(state: &AppState, form: &MetricForm) {
	match form.kind {
		Some(MetricKind::Gauge) => {
			if let Some(value) = form.value {
				state.table.set_gauge(&form.id, value);
			}
		},
		Some(MetricKind::Counter) => {
			if let Some(delta) = form.delta {
				state.table.add_counter(&form.id, delta);
			}
		},
		None => {},
	}
}

async fn flush_if_sync(state: &AppState) {
	if state.store.should_flush_sync()
		&& let Err(err) = state.store.save().await
	{
		tracing::error!(error = %err, "synchronous save failed");
	}
}

/// Deserialize a single metric form, tolerating an empty body the way the original decoder
/// tolerates `io.EOF` — callers that needed the payload still see `None` fields.
fn parse_form(body: &Bytes) -> crate::error::Result<MetricForm> {
	if body.is_empty() {
		return Ok(MetricForm::default());
	}

	Ok(serde_json::from_slice(body)?)
}

fn success(state: &AppState) -> Response {
	send_body(state, StatusCode::OK, Vec::new())
}

fn send_json<T: serde::Serialize>(state: &AppState, status: StatusCode, body: &T) -> Response {
	let data = match serde_json::to_vec(body) {
		Ok(data) => data,
		Err(err) => return bad_request(&err.to_string()),
	};

	send_body(state, status, data)
}

fn send_body(state: &AppState, status: StatusCode, data: Vec<u8>) -> Response {
	let mut headers = HeaderMap::new();

	headers.insert(axum::http::header::CONTENT_TYPE, "application/json".parse().unwrap());

	if state.config.has_hash_key() {
		let signature = signing::sign(&data, state.config.hash_key.as_bytes());

		if let Ok(value) = signature.parse() {
			headers.insert(HASH_HEADER, value);
		}
	}

	(status, headers, data).into_response()
}

fn bad_request(message: &str) -> Response {
	(StatusCode::BAD_REQUEST, message.to_owned()).into_response()
}

//! Ambient middleware stack: request IDs, access logging, panic recovery, gzip and signature
//! checking. Hand-rolled as `axum::middleware::from_fn` layers, mirroring the original server's
//! own hand-rolled `net/http` middleware rather than reaching for an off-the-shelf layer.

// std
use std::io::{Read, Write};
// crates.io
use axum::{
	body::{Body, Bytes, to_bytes},
	extract::{Request, State},
	http::{HeaderValue, StatusCode, header},
	middleware::Next,
	response::{IntoResponse, Response},
};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use uuid::Uuid;
// self
use super::AppState;
use crate::{_prelude::*, model::{HASH_HEADER, MetricForm}, signing};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Tag every request with a UUID, available to handlers/logs via [`RequestId`].
#[derive(Clone, Copy, Debug)]
pub struct RequestId(pub Uuid);

/// Attach a unique request id to the request's extensions.
pub async fn request_id(mut req: Request, next: Next) -> Response {
	req.extensions_mut().insert(RequestId(Uuid::new_v4()));

	next.run(req).await
}

/// Log method, path, status, latency and response size for every request.
pub async fn access_log(req: Request, next: Next) -> Response {
	let method = req.method().clone();
	let uri = req.uri().clone();
	let request_id = req.extensions().get::<RequestId>().copied();
	let start = Instant::now();

	let response = next.run(req).await;
	let duration = start.elapsed();
	let status = response.status();
	let (parts, body) = response.into_parts();
	let bytes = to_bytes(body, MAX_BODY_BYTES).await.unwrap_or_default();

	tracing::info!(
		?request_id,
		%method,
		%uri,
		status = status.as_u16(),
		?duration,
		size = bytes.len(),
		"request info",
	);

	#[cfg(feature = "metrics")]
	crate::metrics::record_request(method.as_str(), uri.path(), status.as_u16());

	Response::from_parts(parts, Body::from(bytes))
}

/// Catch a panicking handler and turn it into a 500 instead of tearing down the connection.
pub async fn recover(req: Request, next: Next) -> Response {
	match tokio::spawn(async move { next.run(req).await }).await {
		Ok(response) => response,
		Err(panic) => {
			tracing::error!(%panic, "recovered from panic");

			(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
		},
	}
}

/// Decompress a gzip-encoded request body and compress the response when the client accepts it.
pub async fn gzip(req: Request, next: Next) -> Response {
	let is_gzip_request = header_contains(req.headers(), header::CONTENT_ENCODING, "gzip");
	let accepts_gzip = header_contains(req.headers(), header::ACCEPT_ENCODING, "gzip");
	let (parts, body) = req.into_parts();
	let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
		Ok(bytes) => bytes,
		Err(err) => {
			tracing::error!(error = %err, "compress read error");

			return StatusCode::BAD_REQUEST.into_response();
		},
	};
	let body_bytes = if is_gzip_request {
		match decompress(&body_bytes) {
			Ok(bytes) => bytes,
			Err(err) => {
				tracing::error!(error = %err, "compress read error");

				return StatusCode::BAD_REQUEST.into_response();
			},
		}
	} else {
		body_bytes
	};
	let req = Request::from_parts(parts, Body::from(body_bytes));
	let response = next.run(req).await;

	if !accepts_gzip || !is_supported_content_type(response.headers()) {
		return response;
	}

	let (mut parts, body) = response.into_parts();
	let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
		Ok(bytes) => bytes,
		Err(err) => {
			tracing::error!(error = %err, "compress error");

			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		},
	};

	match compress(&bytes) {
		Ok(compressed) => {
			parts.headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));

			Response::from_parts(parts, Body::from(compressed))
		},
		Err(err) => {
			tracing::error!(error = %err, "compress error");

			Response::from_parts(parts, Body::from(bytes))
		},
	}
}

/// Verify the `HashSHA256` request header when a signing key is configured. Absent header is
/// treated as "unsigned" and passed through; only a present-but-wrong signature is rejected.
pub async fn check_sign(State(state): State<AppState>, req: Request, next: Next) -> Response {
	if !state.config.has_hash_key() {
		return next.run(req).await;
	}

	let header_hash = req
		.headers()
		.get(HASH_HEADER)
		.and_then(|v| v.to_str().ok())
		.map(str::to_owned);

	let Some(header_hash) = header_hash else {
		return next.run(req).await;
	};

	let (parts, body) = req.into_parts();
	let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
		Ok(bytes) => bytes,
		Err(err) => {
			tracing::error!(error = %err, "sign error");

			return StatusCode::BAD_REQUEST.into_response();
		},
	};

	if !signing::verify(&bytes, state.config.hash_key.as_bytes(), &header_hash) {
		return crate::error::Error::SignatureMismatch.into_response();
	}

	let req = Request::from_parts(parts, Body::from(bytes));

	next.run(req).await
}

/// Reject any single-metric request whose path or JSON body doesn't name a gauge/counter.
pub async fn allowed_metrics_only(req: Request, next: Next) -> Response {
	let path = req.uri().path().to_owned();

	if path.contains("gauge") || path.contains("counter") {
		return next.run(req).await;
	}

	let (parts, body) = req.into_parts();
	let bytes: Bytes = match to_bytes(body, MAX_BODY_BYTES).await {
		Ok(bytes) => bytes,
		Err(err) => {
			tracing::warn!(error = %err, "decode error");

			return StatusCode::BAD_REQUEST.into_response();
		},
	};
	let form: Option<MetricForm> = if bytes.is_empty() {
		Some(MetricForm::default())
	} else {
		serde_json::from_slice(&bytes).ok()
	};
	let allowed = form.as_ref().is_some_and(|f| f.is_gauge() || f.is_counter());

	if !allowed {
		tracing::warn!(%path, "not allowed metric");

		return StatusCode::BAD_REQUEST.into_response();
	}

	let req = Request::from_parts(parts, Body::from(bytes));

	next.run(req).await
}

fn header_contains(headers: &axum::http::HeaderMap, name: header::HeaderName, needle: &str) -> bool {
	headers.get(name).and_then(|v| v.to_str().ok()).is_some_and(|v| v.contains(needle))
}

fn is_supported_content_type(headers: &axum::http::HeaderMap) -> bool {
	let content_type =
		headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("text/html");

	content_type.contains("application/json") || content_type.contains("text/html")
}

fn decompress(bytes: &[u8]) -> std::io::Result<Bytes> {
	let mut decoder = GzDecoder::new(bytes);
	let mut out = Vec::new();

	decoder.read_to_end(&mut out)?;

	Ok(Bytes::from(out))
}

fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
	let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());

	encoder.write_all(bytes)?;
	encoder.finish()
}

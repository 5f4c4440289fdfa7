//! Crate-wide error types and `Result` alias.

// crates.io
use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
};

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the collector crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	ParseFloat(#[from] std::num::ParseFloatError),
	#[error(transparent)]
	ParseInt(#[from] std::num::ParseIntError),

	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),

	#[error("database DSN is empty")]
	EmptyDsn,
	#[error("unknown metric type: {0}")]
	InvalidMetricKind(String),
	#[error("metric '{0}' not found")]
	MetricNotFound(String),
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("no metrics found in request body")]
	EmptyBatch,
	#[error("request body signature mismatch")]
	SignatureMismatch,
	#[error("storage backend unavailable: {0}")]
	Store(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = match self {
			Self::EmptyBatch
			| Self::InvalidMetricKind(_)
			| Self::SignatureMismatch
			| Self::Validation { .. } => StatusCode::BAD_REQUEST,
			Self::MetricNotFound(_) => StatusCode::NOT_FOUND,
			Self::Store(_) => StatusCode::BAD_GATEWAY,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};

		(status, self.to_string()).into_response()
	}
}

#[cfg(feature = "metrics")]
impl<T> From<metrics::SetRecorderError<T>> for Error
where
	T: std::fmt::Display,
{
	fn from(value: metrics::SetRecorderError<T>) -> Self {
		Self::Metrics(value.to_string())
	}
}

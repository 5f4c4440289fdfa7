//! Axum HTTP server: route table, middleware stack and handlers for metric ingestion/query.

mod handlers;
mod middleware;

// crates.io
use axum::{
	Router,
	routing::{get, post},
};
// self
use crate::{_prelude::*, config::ServerConfig, model::Table, store::StoreService};

/// Shared state every handler has access to.
#[derive(Clone)]
pub struct AppState {
	/// The in-memory metrics table.
	pub table: Arc<Table>,
	/// Persistence facade; handlers flush through it when `store_interval == 0`.
	pub store: StoreService,
	/// Resolved server configuration, carries the HMAC key and other handler-visible settings.
	pub config: Arc<ServerConfig>,
}

/// Build the full router: route table plus the ambient middleware stack.
pub fn build_router(state: AppState) -> Router {
	let single_metric_routes = Router::new()
		.route("/update/", post(handlers::update_metric))
		.route("/value/", post(handlers::get_metric))
		.route("/value/counter/{metric}", get(handlers::get_counter))
		.route("/value/gauge/{metric}", get(handlers::get_gauge))
		.route("/update/counter/{metric}/{value}", post(handlers::update_counter))
		.route("/update/gauge/{metric}/{value}", post(handlers::update_gauge))
		.route("/update/counter/", post(handlers::not_found))
		.route("/update/gauge/", post(handlers::not_found))
		.route("/", post(handlers::update_root))
		.route_layer(axum::middleware::from_fn(middleware::allowed_metrics_only));

	Router::new()
		.route("/", get(handlers::index))
		.route("/ping", get(handlers::ping))
		.route("/updates/", post(handlers::update_metrics_batch))
		.merge(single_metric_routes)
		.layer(axum::middleware::from_fn_with_state(state.clone(), middleware::check_sign))
		.layer(axum::middleware::from_fn(middleware::gzip))
		.layer(axum::middleware::from_fn(middleware::recover))
		.layer(axum::middleware::from_fn(middleware::access_log))
		.layer(axum::middleware::from_fn(middleware::request_id))
		.with_state(state)
}

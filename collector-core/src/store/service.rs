//! Retry-wrapped facade over a [`Store`](super::Store), with an optional background flush ticker.

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, error::Result, retry::retry, store::Store};

/// Wraps a backend, retrying every operation and optionally flushing on a timer.
///
/// When `store_interval` is zero the service flushes synchronously after every mutating
/// request instead of running a background ticker; see [`StoreService::should_flush_sync`].
#[derive(Clone)]
pub struct StoreService {
	store: Arc<dyn Store>,
	store_interval: Duration,
	cancel: CancellationToken,
}
impl StoreService {
	/// Wrap `store`, retrying via `cancel` and flushing every `store_interval` when non-zero.
	pub fn new(store: Arc<dyn Store>, store_interval: Duration, cancel: CancellationToken) -> Self {
		Self { store, store_interval, cancel }
	}

	/// Whether callers should flush synchronously after each mutation (`store_interval == 0`).
	pub fn should_flush_sync(&self) -> bool {
		self.store_interval.is_zero()
	}

	/// Spawn the background flush ticker; a no-op when `store_interval` is zero.
	pub fn spawn_flush_ticker(&self) {
		if self.store_interval.is_zero() {
			return;
		}

		let service = self.clone();

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(service.store_interval);

			ticker.tick().await;

			loop {
				tokio::select! {
					_ = ticker.tick() => {
						if let Err(err) = service.save().await {
							tracing::error!(error = %err, "save storage error");
						}
					},
					_ = service.cancel.cancelled() => return,
				}
			}
		});
	}

	/// Persist current state, retrying on failure.
	pub async fn save(&self) -> Result<()> {
		#[cfg(feature = "metrics")]
		let start = Instant::now();

		let result = retry(&self.cancel, || self.store.save()).await;

		#[cfg(feature = "metrics")]
		crate::metrics::record_store_save(result.is_ok(), start.elapsed());

		result
	}

	/// Load persisted state, retrying on failure.
	pub async fn restore(&self) -> Result<()> {
		retry(&self.cancel, || self.store.restore()).await
	}

	/// Release backend resources, retrying on failure.
	pub async fn close(&self) -> Result<()> {
		retry(&self.cancel, || self.store.close()).await
	}

	/// Which backend is actually in use, for the `/ping` route.
	pub fn kind(&self) -> super::StoreKind {
		self.store.kind()
	}
}

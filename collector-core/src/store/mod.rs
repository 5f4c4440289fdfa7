//! Pluggable persistence backends for the metrics [`Table`](crate::model::Table).

mod db;
mod file;
mod memory;
pub mod service;

pub use db::DbStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use service::StoreService;

// self
use crate::{_prelude::*, config::ServerConfig, model::Table};

/// Which backend a [`Store`] is actually backed by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreKind {
	/// Postgres-backed.
	Db,
	/// Local file-backed.
	File,
	/// Process-local, not persisted.
	Memory,
}

/// A persistence backend for the metrics table.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
	/// Persist the current state of the table.
	async fn save(&self) -> Result<()>;

	/// Load persisted state into the table, replacing its contents.
	async fn restore(&self) -> Result<()>;

	/// Release any held resources (connections, file handles).
	async fn close(&self) -> Result<()>;

	/// Which backend this is, used by the `/ping` liveness route.
	fn kind(&self) -> StoreKind;
}

/// Select the best available backend: DB if a DSN is configured and reachable, else the file
/// backend if the filesystem accepts writes, else an in-memory fallback. Each failed attempt is
/// logged as a warning, mirroring the original server's `NewStore` cascade.
pub async fn select(conf: &ServerConfig, table: Arc<Table>) -> Arc<dyn Store> {
	if !conf.dsn.is_empty() {
		match DbStore::connect(&conf.dsn, Arc::clone(&table)).await {
			Ok(store) => return Arc::new(store),
			Err(err) => tracing::warn!(error = %err, "failed to connect to database, falling back"),
		}
	}

	match FileStore::new(conf.file_storage_path.clone(), Arc::clone(&table)) {
		Ok(store) => return Arc::new(store),
		Err(err) => tracing::warn!(error = %err, "failed to initialize file storage, falling back"),
	}

	Arc::new(MemoryStore::new(table))
}

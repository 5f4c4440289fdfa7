//! In-memory backend: the table already lives in memory, so persistence is a no-op.

// self
use super::StoreKind;
use crate::{_prelude::*, error::Result, model::Table};

/// Backend of last resort; holds no durable state.
#[derive(Debug)]
pub struct MemoryStore {
	_table: Arc<Table>,
}
impl MemoryStore {
	/// Wrap `table`; nothing else to set up.
	pub fn new(table: Arc<Table>) -> Self {
		Self { _table: table }
	}
}
#[async_trait::async_trait]
impl super::Store for MemoryStore {
	async fn save(&self) -> Result<()> {
		Ok(())
	}

	async fn restore(&self) -> Result<()> {
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		Ok(())
	}

	fn kind(&self) -> StoreKind {
		StoreKind::Memory
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::Store;

	#[tokio::test]
	async fn save_and_restore_are_no_ops() {
		let table = Table::new();
		let store = MemoryStore::new(Arc::clone(&table));

		store.save().await.unwrap();
		store.restore().await.unwrap();

		assert_eq!(store.kind(), StoreKind::Memory);
	}
}

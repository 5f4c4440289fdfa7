//! File-backed store: JSON snapshot of the table written atomically via a tempfile + rename.

// std
use std::{
	fs::File,
	io::{BufReader, Write},
	path::{Path, PathBuf},
};
// crates.io
use tempfile::NamedTempFile;
// self
use super::StoreKind;
use crate::{_prelude::*, error::Result, model::Table};

/// Persists the table to a single JSON file on local disk.
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
	table: Arc<Table>,
}
impl FileStore {
	/// Build a file store rooted at `path`, probing that its parent directory is writable.
	pub fn new(path: impl Into<PathBuf>, table: Arc<Table>) -> Result<Self> {
		let path = path.into();

		ping_fs(&path)?;

		Ok(Self { path, table })
	}
}
#[async_trait::async_trait]
impl super::Store for FileStore {
	async fn save(&self) -> Result<()> {
		let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
		let data = serde_json::to_vec(self.table.as_ref())?;
		let mut tmp = NamedTempFile::with_prefix_in("collector-", dir)?;

		tmp.write_all(&data)?;
		tmp.persist(&self.path).map_err(|err| err.error)?;

		Ok(())
	}

	async fn restore(&self) -> Result<()> {
		let file = match File::open(&self.path) {
			Ok(file) => file,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				tracing::warn!(path = %self.path.display(), "restore file doesn't exist");

				return Ok(());
			},
			Err(err) => return Err(err.into()),
		};
		let restored: Table = match serde_json::from_reader(BufReader::new(file)) {
			Ok(table) => table,
			Err(err) if err.is_eof() => return Ok(()),
			Err(err) => return Err(err.into()),
		};

		self.table.restore(restored.snapshot_counters(), restored.snapshot_gauges());

		Ok(())
	}

	async fn close(&self) -> Result<()> {
		Ok(())
	}

	fn kind(&self) -> StoreKind {
		StoreKind::File
	}
}

fn ping_fs(target: &Path) -> Result<()> {
	let dir = target.parent().unwrap_or_else(|| Path::new("."));
	let probe = NamedTempFile::with_prefix_in("collector-ping-", dir)?;

	probe.close()?;

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::Store;

	#[tokio::test]
	async fn save_then_restore_round_trips_state() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("storage.db");
		let table = Table::new();

		table.add_counter("hits", 5);
		table.set_gauge("temp", 1.5);

		let store = FileStore::new(&path, Arc::clone(&table)).unwrap();

		store.save().await.unwrap();

		let restored_table = Table::new();
		let restorer = FileStore::new(&path, Arc::clone(&restored_table)).unwrap();

		restorer.restore().await.unwrap();

		assert_eq!(restored_table.counter("hits"), Some(5));
		assert_eq!(restored_table.gauge("temp"), Some(1.5));
	}

	#[tokio::test]
	async fn restore_without_existing_file_is_a_no_op() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.db");
		let table = Table::new();
		let store = FileStore::new(&path, Arc::clone(&table)).unwrap();

		store.restore().await.unwrap();

		assert_eq!(table.counter("anything"), None);
	}

	#[tokio::test]
	async fn restore_from_an_empty_file_is_a_no_op() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("empty.db");

		File::create(&path).unwrap();

		let table = Table::new();
		let store = FileStore::new(&path, Arc::clone(&table)).unwrap();

		store.restore().await.unwrap();

		assert_eq!(table.counter("anything"), None);
	}
}

//! Postgres-backed store.
//!
//! Unlike the original implementation this always rolls back on any insert failure: the
//! transaction is only committed once every row has been written, instead of committing
//! unconditionally and merely logging the commit error.

// crates.io
use chrono::Utc;
use sqlx::{PgPool, postgres::PgPoolOptions};
// self
use super::StoreKind;
use crate::{_prelude::*, error::Result, model::Table};

const CREATE_GAUGES: &str = "CREATE TABLE IF NOT EXISTS gauges (\
	name TEXT PRIMARY KEY, value DOUBLE PRECISION NOT NULL, created_at TIMESTAMPTZ NOT NULL)";
const CREATE_COUNTERS: &str = "CREATE TABLE IF NOT EXISTS counters (\
	name TEXT PRIMARY KEY, value BIGINT NOT NULL, created_at TIMESTAMPTZ NOT NULL)";

/// Persists the table to Postgres via a connection pool.
#[derive(Debug)]
pub struct DbStore {
	pool: PgPool,
	table: Arc<Table>,
}
impl DbStore {
	/// Connect to `dsn` and ensure the `gauges`/`counters` tables exist.
	pub async fn connect(dsn: &str, table: Arc<Table>) -> Result<Self> {
		if dsn.is_empty() {
			return Err(crate::error::Error::EmptyDsn);
		}

		let pool = PgPoolOptions::new().max_connections(5).connect(dsn).await?;

		sqlx::query(CREATE_GAUGES).execute(&pool).await?;
		sqlx::query(CREATE_COUNTERS).execute(&pool).await?;

		Ok(Self { pool, table })
	}
}
#[async_trait::async_trait]
impl super::Store for DbStore {
	async fn save(&self) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		sqlx::query("TRUNCATE TABLE gauges").execute(&mut *tx).await?;
		sqlx::query("TRUNCATE TABLE counters").execute(&mut *tx).await?;

		let now = Utc::now();

		for (name, value) in self.table.snapshot_gauges() {
			sqlx::query("INSERT INTO gauges (name, value, created_at) VALUES ($1, $2, $3)")
				.bind(name)
				.bind(value)
				.bind(now)
				.execute(&mut *tx)
				.await?;
		}

		for (name, value) in self.table.snapshot_counters() {
			sqlx::query("INSERT INTO counters (name, value, created_at) VALUES ($1, $2, $3)")
				.bind(name)
				.bind(value)
				.bind(now)
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;

		Ok(())
	}

	async fn restore(&self) -> Result<()> {
		let gauges: Vec<(String, f64)> =
			sqlx::query_as("SELECT name, value FROM gauges").fetch_all(&self.pool).await?;
		let counters: Vec<(String, i64)> =
			sqlx::query_as("SELECT name, value FROM counters").fetch_all(&self.pool).await?;

		tracing::debug!(gauges = gauges.len(), counters = counters.len(), "restored state");

		self.table.restore(counters.into_iter().collect(), gauges.into_iter().collect());

		Ok(())
	}

	async fn close(&self) -> Result<()> {
		self.pool.close().await;

		Ok(())
	}

	fn kind(&self) -> StoreKind {
		StoreKind::Db
	}
}

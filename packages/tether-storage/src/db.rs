use std::time::Duration;

use sqlx::{
	SqliteConnection, SqlitePool,
	sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

use crate::{Error, Result, schema};

/// Handle to the on-disk store. Cloning shares the underlying pool.
#[derive(Clone, Debug)]
pub struct Db {
	pub pool: SqlitePool,
}
impl Db {
	pub async fn connect(cfg: &tether_config::Sqlite) -> Result<Self> {
		let options = SqliteConnectOptions::new()
			.filename(&cfg.path)
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal)
			.synchronous(SqliteSynchronous::Full)
			.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms));
		let pool =
			SqlitePoolOptions::new().max_connections(cfg.pool_max_conns).connect_with(options).await?;

		Ok(Self { pool })
	}

	/// Connects and brings the schema up to date. Safe to call from several processes at once.
	pub async fn open(cfg: &tether_config::Sqlite) -> Result<Self> {
		let db = Self::connect(cfg).await?;

		db.ensure_schema().await?;

		Ok(db)
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let mut conn = self.pool.acquire().await?;

		// IMMEDIATE takes the write lock up front so concurrent openers queue on the busy timeout
		// instead of failing a read-to-write upgrade.
		sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

		match apply_schema(&mut conn).await {
			Ok(()) => {
				sqlx::query("COMMIT").execute(&mut *conn).await?;

				Ok(())
			},
			Err(err) => {
				if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
					tracing::warn!(error = %rollback_err, "Failed to roll back schema transaction.");
				}

				Err(err)
			},
		}
	}

	pub async fn schema_version(&self) -> Result<i64> {
		let version: i64 = sqlx::query_scalar("PRAGMA user_version").fetch_one(&self.pool).await?;

		Ok(version)
	}
}

async fn apply_schema(conn: &mut SqliteConnection) -> Result<()> {
	let found: i64 = sqlx::query_scalar("PRAGMA user_version").fetch_one(&mut *conn).await?;

	if found > schema::SCHEMA_VERSION {
		return Err(Error::SchemaVersion { found, expected: schema::SCHEMA_VERSION });
	}

	let sql = schema::render_schema();

	for statement in sql.split(';') {
		let trimmed = statement.trim();

		if trimmed.is_empty() {
			continue;
		}

		sqlx::query(trimmed).execute(&mut *conn).await?;
	}

	sqlx::query(&format!("PRAGMA user_version = {}", schema::SCHEMA_VERSION))
		.execute(&mut *conn)
		.await?;

	Ok(())
}

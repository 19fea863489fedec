use serde_json::Value;
use time::OffsetDateTime;

use crate::{Result, db::Db, models::OutboxEntry};

/// Persists `payload` as a new entry and returns its identifier.
pub async fn append(db: &Db, payload: &Value) -> Result<i64> {
	let encoded = serde_json::to_string(payload)?;
	let now = OffsetDateTime::now_utc();
	let result = sqlx::query("INSERT INTO outbox_entries (payload, created_at) VALUES (?, ?)")
		.bind(encoded)
		.bind(now)
		.execute(&db.pool)
		.await?;

	Ok(result.last_insert_rowid())
}

/// Snapshot of every pending entry in ascending identifier order.
pub async fn list_all(db: &Db) -> Result<Vec<OutboxEntry>> {
	let entries = sqlx::query_as::<_, OutboxEntry>(
		"\
SELECT
	outbox_id,
	payload,
	attempts,
	last_error,
	last_attempt_at,
	created_at
FROM outbox_entries
ORDER BY outbox_id ASC",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(entries)
}

/// Deletes an entry. Returns false when the identifier was already gone.
pub async fn remove(db: &Db, outbox_id: i64) -> Result<bool> {
	let result = sqlx::query("DELETE FROM outbox_entries WHERE outbox_id = ?")
		.bind(outbox_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn record_failure(
	db: &Db,
	outbox_id: i64,
	error: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE outbox_entries
SET attempts = attempts + 1,
	last_error = ?,
	last_attempt_at = ?
WHERE outbox_id = ?",
	)
	.bind(error)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn count(db: &Db) -> Result<i64> {
	let count: i64 =
		sqlx::query_scalar("SELECT count(*) FROM outbox_entries").fetch_one(&db.pool).await?;

	Ok(count)
}

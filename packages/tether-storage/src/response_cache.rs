use time::OffsetDateTime;

use crate::{Error, Result, db::Db, models::CachedResponse};

pub async fn put(
	db: &Db,
	cache_name: &str,
	request_key: &str,
	response: &CachedResponse,
) -> Result<()> {
	if cache_name.trim().is_empty() {
		return Err(Error::InvalidArgument("cache_name must be non-empty.".to_string()));
	}
	if !request_key.starts_with('/') {
		return Err(Error::InvalidArgument(format!(
			"request_key {request_key:?} must be an absolute path."
		)));
	}

	sqlx::query(
		"\
INSERT INTO response_cache (cache_name, request_key, status, content_type, body, stored_at)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT (cache_name, request_key) DO UPDATE SET
	status = excluded.status,
	content_type = excluded.content_type,
	body = excluded.body,
	stored_at = excluded.stored_at",
	)
	.bind(cache_name)
	.bind(request_key)
	.bind(response.status)
	.bind(response.content_type.as_deref())
	.bind(response.body.as_slice())
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn get(db: &Db, cache_name: &str, request_key: &str) -> Result<Option<CachedResponse>> {
	let row = sqlx::query_as::<_, CachedResponse>(
		"\
SELECT status, content_type, body
FROM response_cache
WHERE cache_name = ? AND request_key = ?",
	)
	.bind(cache_name)
	.bind(request_key)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Drops every row stored under a cache name other than `current`.
pub async fn purge_stale(db: &Db, current: &str) -> Result<u64> {
	let result = sqlx::query("DELETE FROM response_cache WHERE cache_name <> ?")
		.bind(current)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn cache_names(db: &Db) -> Result<Vec<String>> {
	let names: Vec<String> =
		sqlx::query_scalar("SELECT DISTINCT cache_name FROM response_cache ORDER BY cache_name")
			.fetch_all(&db.pool)
			.await?;

	Ok(names)
}

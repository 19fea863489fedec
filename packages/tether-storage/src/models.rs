use serde_json::Value;
use time::OffsetDateTime;

/// One queued request awaiting delivery confirmation.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct OutboxEntry {
	pub outbox_id: i64,
	#[sqlx(json)]
	pub payload: Value,
	pub attempts: i64,
	pub last_error: Option<String>,
	pub last_attempt_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct CachedResponse {
	pub status: i64,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}

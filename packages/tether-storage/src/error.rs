#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error("Store schema version {found} is newer than the supported version {expected}.")]
	SchemaVersion { found: i64, expected: i64 },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] tether_storage::Error),
	#[error("Failed to precache {path}: {message}")]
	Precache { path: String, message: String },
	#[error("{path} is unavailable: {message}")]
	Unavailable { path: String, message: String },
}

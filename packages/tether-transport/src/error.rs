pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The request never produced a response: refused, reset, DNS failure or timeout.
	#[error("Transport failure: {0}")]
	Transport(#[from] reqwest::Error),
	/// The endpoint answered with a non-2xx status.
	#[error("Endpoint rejected the request with status {status}.")]
	Rejected { status: u16 },
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
}
impl Error {
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	pub fn is_rejected(&self) -> bool {
		matches!(self, Self::Rejected { .. })
	}
}

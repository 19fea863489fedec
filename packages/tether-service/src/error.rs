pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Persistence error: {0}")]
	Persistence(#[from] tether_storage::Error),
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	#[error(transparent)]
	Registration(#[from] RegistrationError),
	#[error("Invalid configuration: {message}")]
	InvalidConfig { message: String },
}

/// Outcome of a delivery attempt that did not confirm.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
	/// No response was obtained. Retried later; aborts a drain.
	#[error("Transport failure: {message}")]
	Transport { message: String },
	/// The endpoint was reachable and answered with a non-2xx status.
	#[error("Endpoint rejected the request with status {status}.")]
	Rejected { status: u16 },
}
impl From<tether_transport::Error> for DeliveryError {
	fn from(err: tether_transport::Error) -> Self {
		match err {
			tether_transport::Error::Rejected { status } => Self::Rejected { status },
			tether_transport::Error::Transport(inner) => Self::Transport { message: inner.to_string() },
			other => Self::Transport { message: other.to_string() },
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
	#[error("Sync registration was rejected: {message}")]
	Rejected { message: String },
	#[error("No worker is listening for sync events.")]
	WorkerUnavailable,
}

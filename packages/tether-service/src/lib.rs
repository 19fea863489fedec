pub mod fallback;
pub mod platform;
pub mod registrar;
pub mod retry;
pub mod submit;

mod error;

pub use error::{DeliveryError, Error, RegistrationError, Result};
pub use fallback::{FallbackAction, FallbackTimer, HeartbeatProbe};
pub use platform::{Connectivity, ConnectivityMonitor, LocalSyncManager, WakeEvent};
pub use registrar::{Registration, SyncPlatform, SyncRegistrar};
pub use retry::{BackoffPolicy, RetryDecision, RetryPolicy};
pub use submit::SubmitResponse;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use tether_storage::db::Db;
use tether_transport::{Endpoint, FetchedResponse};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Network seam shared by the submission interceptor and the background worker.
pub trait Transport
where
	Self: Send + Sync,
{
	fn submit<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, Result<(), DeliveryError>>;

	fn heartbeat<'a>(&'a self) -> BoxFuture<'a, Result<(), DeliveryError>>;

	fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<FetchedResponse, DeliveryError>>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
	endpoint: Endpoint,
}
impl HttpTransport {
	pub fn new(cfg: &tether_config::Endpoint) -> Result<Self> {
		let endpoint = Endpoint::new(cfg)
			.map_err(|err| Error::InvalidConfig { message: err.to_string() })?;

		Ok(Self { endpoint })
	}
}

impl Transport for HttpTransport {
	fn submit<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, Result<(), DeliveryError>> {
		Box::pin(async move { self.endpoint.submit(payload).await.map_err(DeliveryError::from) })
	}

	fn heartbeat<'a>(&'a self) -> BoxFuture<'a, Result<(), DeliveryError>> {
		Box::pin(async move { self.endpoint.heartbeat().await.map_err(DeliveryError::from) })
	}

	fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<FetchedResponse, DeliveryError>> {
		Box::pin(async move { self.endpoint.fetch(path).await.map_err(DeliveryError::from) })
	}
}

/// Page-side half of the outbox: immediate delivery with durable fallback.
pub struct OutboxService {
	pub db: Db,
	pub transport: Arc<dyn Transport>,
	pub registrar: Arc<SyncRegistrar>,
}
impl OutboxService {
	pub fn new(db: Db, transport: Arc<dyn Transport>, registrar: Arc<SyncRegistrar>) -> Self {
		Self { db, transport, registrar }
	}
}

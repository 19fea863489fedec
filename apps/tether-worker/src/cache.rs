use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{Error, Result};
use tether_service::{BoxFuture, DeliveryError, HeartbeatProbe, Transport, WakeEvent};
use tether_storage::{db::Db, models::CachedResponse, response_cache};
use tether_transport::FetchedResponse;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
	Network(FetchedResponse),
	Cached(CachedResponse),
}
impl FetchOutcome {
	pub fn status(&self) -> u16 {
		match self {
			Self::Network(response) => response.status,
			Self::Cached(response) => u16::try_from(response.status).unwrap_or(500),
		}
	}

	pub fn content_type(&self) -> Option<&str> {
		match self {
			Self::Network(response) => response.content_type.as_deref(),
			Self::Cached(response) => response.content_type.as_deref(),
		}
	}

	pub fn body(&self) -> &[u8] {
		match self {
			Self::Network(response) => &response.body,
			Self::Cached(response) => &response.body,
		}
	}
}

/// Network-first read interception backed by the named response cache.
pub struct ResponseCache {
	db: Db,
	transport: Arc<dyn Transport>,
	cache_name: String,
	heartbeat_path: String,
	wake: UnboundedSender<WakeEvent>,
}
impl ResponseCache {
	pub fn new(
		db: Db,
		transport: Arc<dyn Transport>,
		cache_name: impl Into<String>,
		heartbeat_path: impl Into<String>,
		wake: UnboundedSender<WakeEvent>,
	) -> Self {
		Self {
			db,
			transport,
			cache_name: cache_name.into(),
			heartbeat_path: heartbeat_path.into(),
			wake,
		}
	}

	pub fn cache_name(&self) -> &str {
		&self.cache_name
	}

	pub fn heartbeat_path(&self) -> &str {
		&self.heartbeat_path
	}

	/// Fetches and stores every path. Any failure fails the whole install.
	pub async fn precache(&self, paths: &[String]) -> Result<()> {
		for path in paths {
			let response = self.transport.fetch(path).await.map_err(|err| Error::Precache {
				path: path.clone(),
				message: err.to_string(),
			})?;

			if !response.is_success() {
				return Err(Error::Precache {
					path: path.clone(),
					message: format!("Origin answered with status {}.", response.status),
				});
			}

			response_cache::put(&self.db, &self.cache_name, path, &to_cached(&response)).await?;
		}

		Ok(())
	}

	/// Deletes responses stored under any previous cache name.
	pub async fn activate(&self) -> Result<u64> {
		let purged = response_cache::purge_stale(&self.db, &self.cache_name).await?;

		if purged > 0 {
			tracing::info!(purged, cache_name = %self.cache_name, "Purged stale cached responses.");
		}

		Ok(purged)
	}

	/// Serves a GET for `path`: network first, cached copy when the network is unreachable.
	///
	/// `path` includes any query string and is the cache key as given, so `/items?page=1` and
	/// `/items?page=2` are cached separately.
	pub async fn handle_fetch(&self, path: &str) -> Result<FetchOutcome> {
		let route = path.split_once('?').map_or(path, |(route, _)| route);

		if route == self.heartbeat_path && self.wake.send(WakeEvent::Probe).is_err() {
			tracing::debug!("Worker is not listening for probes.");
		}

		match self.transport.fetch(path).await {
			Ok(response) => {
				if response.is_success()
					&& let Err(err) =
						response_cache::put(&self.db, &self.cache_name, path, &to_cached(&response))
							.await
				{
					tracing::warn!(error = %err, path, "Failed to cache response.");
				}

				Ok(FetchOutcome::Network(response))
			},
			Err(err @ DeliveryError::Transport { .. }) => {
				match response_cache::get(&self.db, &self.cache_name, path).await? {
					Some(cached) => {
						tracing::debug!(path, "Serving cached response.");

						Ok(FetchOutcome::Cached(cached))
					},
					None => Err(Error::Unavailable { path: path.to_string(), message: err.to_string() }),
				}
			},
			Err(err) => Err(Error::Unavailable { path: path.to_string(), message: err.to_string() }),
		}
	}
}

/// Heartbeat probe routed through read interception so the worker sees it.
pub struct WorkerProbe {
	cache: Arc<ResponseCache>,
}
impl WorkerProbe {
	pub fn new(cache: Arc<ResponseCache>) -> Self {
		Self { cache }
	}
}

impl HeartbeatProbe for WorkerProbe {
	fn probe<'a>(&'a self) -> BoxFuture<'a, ()> {
		Box::pin(async move {
			if let Err(err) = self.cache.handle_fetch(self.cache.heartbeat_path()).await {
				tracing::debug!(error = %err, "Heartbeat probe failed.");
			}
		})
	}
}

fn to_cached(response: &FetchedResponse) -> CachedResponse {
	CachedResponse {
		status: i64::from(response.status),
		content_type: response.content_type.clone(),
		body: response.body.clone(),
	}
}

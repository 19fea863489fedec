use std::{
	collections::BTreeSet,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use tokio::sync::mpsc::UnboundedSender;

use crate::{BoxFuture, DeliveryError, RegistrationError, SyncPlatform, Transport};

/// Reasons the worker is woken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WakeEvent {
	/// A registered trigger fired.
	Sync { tag: String },
	/// A page probed the heartbeat endpoint through the worker.
	Probe,
}

/// Shared online flag, the equivalent of a client's own online indicator.
#[derive(Clone, Debug)]
pub struct Connectivity(Arc<AtomicBool>);
impl Connectivity {
	pub fn new(online: bool) -> Self {
		Self(Arc::new(AtomicBool::new(online)))
	}

	pub fn is_online(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// Stores the new state and returns the previous one.
	pub fn set(&self, online: bool) -> bool {
		self.0.swap(online, Ordering::SeqCst)
	}
}

/// In-process wake-on-connectivity facility.
///
/// Registered tags are held as a set, so repeating a registration before it fires is a no-op.
/// Each pending tag fires once when the client is or becomes online and is then forgotten.
pub struct LocalSyncManager {
	pending: Mutex<BTreeSet<String>>,
	connectivity: Connectivity,
	events: UnboundedSender<WakeEvent>,
}
impl LocalSyncManager {
	pub fn new(connectivity: Connectivity, events: UnboundedSender<WakeEvent>) -> Self {
		Self { pending: Mutex::new(BTreeSet::new()), connectivity, events }
	}

	pub fn pending_tags(&self) -> Vec<String> {
		self.lock_pending().iter().cloned().collect()
	}

	/// Records the connectivity state and fires pending tags when online. Returns how many
	/// triggers were delivered to the worker.
	pub fn set_online(&self, online: bool) -> Result<usize, RegistrationError> {
		let was_online = self.connectivity.set(online);

		if online && !was_online {
			tracing::info!("Connectivity restored.");
		} else if !online && was_online {
			tracing::info!("Connectivity lost.");
		}

		if !online {
			return Ok(0);
		}

		self.fire_pending()
	}

	fn fire_pending(&self) -> Result<usize, RegistrationError> {
		let mut pending = self.lock_pending();
		let tags = std::mem::take(&mut *pending);
		let mut fired = 0;

		for tag in &tags {
			if self.events.send(WakeEvent::Sync { tag: tag.clone() }).is_err() {
				pending.extend(tags.iter().skip(fired).cloned());

				return Err(RegistrationError::WorkerUnavailable);
			}

			fired += 1;
		}

		Ok(fired)
	}

	fn lock_pending(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
		self.pending.lock().unwrap_or_else(|err| err.into_inner())
	}
}

impl SyncPlatform for LocalSyncManager {
	fn register<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Result<(), RegistrationError>> {
		Box::pin(async move {
			if self.events.is_closed() {
				return Err(RegistrationError::WorkerUnavailable);
			}
			if tag.trim().is_empty() {
				return Err(RegistrationError::Rejected {
					message: "Sync tag must be non-empty.".to_string(),
				});
			}

			self.lock_pending().insert(tag.to_string());

			if self.connectivity.is_online() {
				self.fire_pending()?;
			}

			Ok(())
		})
	}
}

/// Polls the heartbeat endpoint directly and keeps the online flag current.
pub struct ConnectivityMonitor {
	transport: Arc<dyn Transport>,
	connectivity: Connectivity,
	manager: Option<Arc<LocalSyncManager>>,
	interval: Duration,
}
impl ConnectivityMonitor {
	pub fn new(
		transport: Arc<dyn Transport>,
		connectivity: Connectivity,
		manager: Option<Arc<LocalSyncManager>>,
		interval: Duration,
	) -> Self {
		Self { transport, connectivity, manager, interval }
	}

	/// Any response, even an error status, counts as online.
	pub async fn check_once(&self) -> bool {
		let online = !matches!(
			self.transport.heartbeat().await,
			Err(DeliveryError::Transport { .. })
		);

		match self.manager.as_ref() {
			Some(manager) =>
				if let Err(err) = manager.set_online(online) {
					tracing::warn!(error = %err, "Failed to fire pending sync triggers.");
				},
			None => {
				self.connectivity.set(online);
			},
		}

		online
	}

	pub async fn run(self) {
		loop {
			self.check_once().await;

			tokio::time::sleep(self.interval).await;
		}
	}
}

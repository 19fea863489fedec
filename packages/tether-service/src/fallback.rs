use std::{sync::Arc, time::Duration};

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{BoxFuture, Connectivity, SyncRegistrar};

/// Gives the worker a chance to run when no trigger facility exists.
pub trait HeartbeatProbe
where
	Self: Send + Sync,
{
	fn probe<'a>(&'a self) -> BoxFuture<'a, ()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackAction {
	Offline,
	Registered(bool),
	Probed,
}

/// Periodic best-effort nudge owned by the page context.
pub struct FallbackTimer {
	registrar: Arc<SyncRegistrar>,
	probe: Arc<dyn HeartbeatProbe>,
	connectivity: Connectivity,
	interval: Duration,
}
impl FallbackTimer {
	pub fn new(
		registrar: Arc<SyncRegistrar>,
		probe: Arc<dyn HeartbeatProbe>,
		connectivity: Connectivity,
		interval: Duration,
	) -> Self {
		Self { registrar, probe, connectivity, interval }
	}

	pub async fn tick(&self) -> FallbackAction {
		if !self.connectivity.is_online() {
			return FallbackAction::Offline;
		}
		if self.registrar.is_supported() {
			return FallbackAction::Registered(self.registrar.register().await);
		}

		self.probe.probe().await;

		FallbackAction::Probed
	}

	/// Ticks forever. The first tick happens one interval after start.
	pub async fn run(self) {
		let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			let action = self.tick().await;

			tracing::debug!(?action, "Fallback sync tick.");
		}
	}
}

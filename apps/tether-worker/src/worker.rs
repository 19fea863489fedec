use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
	Result,
	cache::ResponseCache,
	lifecycle::{self, Command, LifecycleEvent, Phase},
};
use tether_service::{DeliveryError, RetryDecision, RetryPolicy, Transport, WakeEvent};
use tether_storage::{db::Db, outbox};

const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub transport: Arc<dyn Transport>,
	pub retry: Arc<dyn RetryPolicy>,
	pub sync_tag: String,
	pub precache: Vec<String>,
	pub cache: Arc<ResponseCache>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
	pub attempted: usize,
	pub delivered: usize,
	pub rejected: usize,
	pub deferred: usize,
	pub exhausted: usize,
	/// The network was unreachable and the remaining entries were left untouched.
	pub aborted: bool,
}

/// Installs the worker, then serves wake events until every sender is gone.
///
/// A failed install leaves the worker `Redundant`. The next matching wake event retries it, so an
/// unreachable origin at startup never stops the gateway from queueing submissions.
pub async fn run_worker(state: WorkerState, mut events: UnboundedReceiver<WakeEvent>) {
	let mut phase = install_phase(&state).await;

	while let Some(wake) = events.recv().await {
		phase = handle_wake(&state, phase, wake).await;
	}

	tracing::info!(?phase, "Wake channel closed. Worker stopping.");
}

/// Precaches static resources and purges caches left by previous versions.
pub async fn install(state: &WorkerState) -> Result<()> {
	state.cache.precache(&state.precache).await?;
	state.cache.activate().await?;

	Ok(())
}

/// Runs `install` and returns the phase it leads to: `Idle` or `Redundant`.
pub async fn install_phase(state: &WorkerState) -> Phase {
	let event = match install(state).await {
		Ok(()) => {
			tracing::info!(cache_name = %state.cache.cache_name(), "Worker installed.");

			LifecycleEvent::Installed
		},
		Err(err) => {
			tracing::error!(error = %err, "Worker installation failed. Retrying on the next wake.");

			LifecycleEvent::InstallFailed
		},
	};

	lifecycle::transition(Phase::Installing, &event, &state.sync_tag).phase
}

pub async fn handle_wake(state: &WorkerState, phase: Phase, wake: WakeEvent) -> Phase {
	let event = LifecycleEvent::Woken(wake);
	let mut step = lifecycle::transition(phase, &event, &state.sync_tag);

	if step.command == Some(Command::Install) {
		let installed = install_phase(state).await;

		if installed != Phase::Idle {
			return installed;
		}

		step = lifecycle::transition(installed, &event, &state.sync_tag);
	}
	if step.command != Some(Command::Drain) {
		return step.phase;
	}

	match process_outbox(state).await {
		Ok(report) => tracing::info!(?report, "Outbox drain finished."),
		Err(err) => tracing::error!(error = %err, "Outbox drain failed."),
	}

	lifecycle::transition(step.phase, &LifecycleEvent::DrainFinished, &state.sync_tag).phase
}

/// Attempts every entry pending at the start of the call, in ascending id order.
///
/// A 2xx removes the entry. A rejection is recorded and the loop moves on. A transport failure
/// stops the loop and leaves the rest untouched.
pub async fn process_outbox(state: &WorkerState) -> Result<DrainReport> {
	let entries = outbox::list_all(&state.db).await?;
	let mut report = DrainReport::default();

	for entry in entries {
		let now = OffsetDateTime::now_utc();
		let attempts = u32::try_from(entry.attempts).unwrap_or(u32::MAX);

		match state.retry.decide(attempts, entry.last_attempt_at, now) {
			RetryDecision::Attempt => {},
			RetryDecision::Defer { until } => {
				tracing::debug!(outbox_id = entry.outbox_id, %until, "Outbox entry deferred.");

				report.deferred += 1;

				continue;
			},
			RetryDecision::Exhausted => {
				tracing::debug!(
					outbox_id = entry.outbox_id,
					attempts,
					"Outbox entry exhausted its attempts. Leaving it queued."
				);

				report.exhausted += 1;

				continue;
			},
		}

		report.attempted += 1;

		match state.transport.submit(&entry.payload).await {
			Ok(()) => {
				outbox::remove(&state.db, entry.outbox_id).await?;

				report.delivered += 1;
			},
			Err(err @ DeliveryError::Rejected { .. }) => {
				let message = truncate_chars(&err.to_string(), MAX_OUTBOX_ERROR_CHARS);

				tracing::warn!(outbox_id = entry.outbox_id, error = %err, "Outbox delivery rejected.");

				outbox::record_failure(&state.db, entry.outbox_id, &message, now).await?;

				report.rejected += 1;
			},
			Err(err @ DeliveryError::Transport { .. }) => {
				tracing::warn!(
					outbox_id = entry.outbox_id,
					error = %err,
					"Network unreachable during drain. Aborting."
				);

				report.aborted = true;

				break;
			},
		}
	}

	Ok(report)
}

fn truncate_chars(text: &str, max: usize) -> String {
	match text.char_indices().nth(max) {
		Some((index, _)) => text[..index].to_string(),
		None => text.to_string(),
	}
}

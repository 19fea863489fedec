use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{OutboxService, Result};
use tether_storage::outbox;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
	pub delivered: bool,
	/// Set when the payload was queued instead of delivered.
	pub outbox_id: Option<i64>,
}

impl OutboxService {
	/// Sends `payload` now, or queues it for the worker when delivery is not confirmed.
	///
	/// Rejections and transport failures are both queued. Only a store failure is returned as an
	/// error, since the payload would otherwise be lost.
	pub async fn submit(&self, payload: &Value) -> Result<SubmitResponse> {
		match self.transport.submit(payload).await {
			Ok(()) => return Ok(SubmitResponse { delivered: true, outbox_id: None }),
			Err(err) => {
				tracing::info!(error = %err, "Immediate delivery failed. Queueing submission.");
			},
		}

		let outbox_id = outbox::append(&self.db, payload).await.inspect_err(|err| {
			tracing::error!(error = %err, "Failed to queue submission.");
		})?;
		let registered = self.registrar.register().await;

		tracing::debug!(outbox_id, registered, "Submission queued.");

		Ok(SubmitResponse { delivered: false, outbox_id: Some(outbox_id) })
	}
}

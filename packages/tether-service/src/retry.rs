use time::{Duration, OffsetDateTime, PrimitiveDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	Attempt,
	/// Backoff has not elapsed yet. The entry stays queued.
	Defer { until: OffsetDateTime },
	/// The attempt budget is spent. The entry stays queued but is no longer attempted.
	Exhausted,
}

/// Decides whether a queued entry is attempted in the current drain.
///
/// `attempts` counts rejections only. Transport failures abort the drain before any entry is
/// charged.
pub trait RetryPolicy
where
	Self: Send + Sync,
{
	fn decide(
		&self,
		attempts: u32,
		last_attempt_at: Option<OffsetDateTime>,
		now: OffsetDateTime,
	) -> RetryDecision;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
	pub max_attempts: Option<u32>,
	pub base_backoff: Duration,
	pub max_backoff: Duration,
}
impl BackoffPolicy {
	/// Every entry is attempted on every drain.
	pub fn unbounded() -> Self {
		Self { max_attempts: None, base_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
	}

	pub fn from_config(cfg: &tether_config::Retry) -> Self {
		Self {
			max_attempts: cfg.max_attempts,
			base_backoff: Duration::milliseconds(to_i64(cfg.base_backoff_ms)),
			max_backoff: Duration::milliseconds(to_i64(cfg.max_backoff_ms)),
		}
	}

	pub fn backoff_for_attempt(&self, attempts: u32) -> Duration {
		if attempts == 0 || self.base_backoff <= Duration::ZERO {
			return Duration::ZERO;
		}

		let exp = attempts.saturating_sub(1).min(16);
		let base = self.base_backoff.saturating_mul(1_i32 << exp);

		base.min(self.max_backoff)
	}
}
impl Default for BackoffPolicy {
	fn default() -> Self {
		Self::unbounded()
	}
}

impl RetryPolicy for BackoffPolicy {
	fn decide(
		&self,
		attempts: u32,
		last_attempt_at: Option<OffsetDateTime>,
		now: OffsetDateTime,
	) -> RetryDecision {
		if let Some(max) = self.max_attempts
			&& attempts >= max
		{
			return RetryDecision::Exhausted;
		}

		let Some(last) = last_attempt_at else {
			return RetryDecision::Attempt;
		};
		let until = last
			.checked_add(self.backoff_for_attempt(attempts))
			.unwrap_or(PrimitiveDateTime::MAX.assume_utc());

		if until > now { RetryDecision::Defer { until } } else { RetryDecision::Attempt }
	}
}

fn to_i64(value: u64) -> i64 {
	i64::try_from(value).unwrap_or(i64::MAX)
}

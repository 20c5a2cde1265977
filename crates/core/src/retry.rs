//! Retry policy with exponential backoff.
//!
//! The policy is a pure decision function over `(error, attempt)`: it
//! classifies a failure as retryable or terminal and computes the delay
//! before the next attempt. It holds no clocks, sockets, or browsers, so
//! classification and backoff are unit-testable on their own; the single
//! retry loop lives in [`run`] and in the session manager's call path.

use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Verdict for one failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
	Retry { delay: Duration },
	Stop,
}

/// Value-parameterized retry tuning.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Total attempts, including the first.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub multiplier: f64,
	/// Randomize delays to avoid synchronized retry storms across
	/// concurrent callers. Disable for reproducible tests.
	pub jitter: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(60),
			multiplier: 2.0,
			jitter: true,
		}
	}
}

impl RetryPolicy {
	/// Backoff delay for a 0-indexed attempt: geometric growth from the
	/// base, capped at the maximum, with an optional jitter fraction.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let delay = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
		let delay = delay.min(self.max_delay.as_millis() as f64);

		let millis = if self.jitter {
			(delay + jitter_fraction(delay * 0.2)).max(0.0) as u64
		} else {
			delay as u64
		};
		Duration::from_millis(millis)
	}

	/// Classifies a failure. Server-side 5xx and explicit rate limiting
	/// are transient; authentication and not-found failures can never
	/// succeed on retry and would waste the session's one-shot re-auth.
	pub fn classify(&self, error: &Error, attempt: u32) -> Decision {
		if attempt + 1 >= self.max_attempts {
			return Decision::Stop;
		}
		match error {
			// Honor the remote-suggested delay when one was given.
			Error::RateLimited { retry_after } => Decision::Retry {
				delay: retry_after.unwrap_or_else(|| self.delay_for(attempt)),
			},
			Error::Remote { status: Some(s), .. } if (500..600).contains(s) => Decision::Retry {
				delay: self.delay_for(attempt),
			},
			Error::Browser(_) => Decision::Retry {
				delay: self.delay_for(attempt),
			},
			_ => Decision::Stop,
		}
	}
}

/// Cheap jitter without a dependency: +/- `max` from subsecond clock noise.
fn jitter_fraction(max: f64) -> f64 {
	use std::time::SystemTime;
	let nanos = SystemTime::now()
		.duration_since(SystemTime::UNIX_EPOCH)
		.map(|d| d.subsec_nanos())
		.unwrap_or(0);
	(nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}

/// Runs an operation under a policy. The last error is raised unchanged
/// once attempts are exhausted or a terminal failure is seen.
pub async fn run<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T>>,
{
	let mut attempt = 0;
	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) => match policy.classify(&err, attempt) {
				Decision::Retry { delay } => {
					warn!(
						target = "nlm",
						attempt = attempt + 1,
						max = policy.max_attempts,
						delay_ms = delay.as_millis() as u64,
						error = %err,
						"retrying after transient failure"
					);
					tokio::time::sleep(delay).await;
					attempt += 1;
				}
				Decision::Stop => return Err(err),
			},
		}
	}
}

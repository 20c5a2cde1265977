//! Poll-until-terminal tracking for long-running remote jobs.
//!
//! Research discovery and studio generation share the same shape: a call
//! starts server-side work and returns a handle, and the caller polls a
//! status endpoint until the job reaches a terminal state. This module
//! implements that loop once; call sites differ only in their payloads.
//!
//! Every tracked job resolves to exactly one of three outcomes: the
//! success value, [`Error::RemoteOperation`] for a failed terminal state,
//! or [`Error::OperationTimeout`] when the caller's deadline passes first
//! — in which case the remote outcome is explicitly unknown, since the
//! job may still complete server-side. Dropping the returned future
//! abandons only the local wait.

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// One status snapshot of a remote job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
	Running,
	Done(T),
	Failed(String),
}

/// Poll backoff: fixed initial delay, geometric growth, cap. Same shape as
/// retry backoff, tuned separately.
#[derive(Debug, Clone)]
pub struct PollSchedule {
	pub initial: Duration,
	pub multiplier: f64,
	pub max: Duration,
}

impl Default for PollSchedule {
	fn default() -> Self {
		Self {
			initial: Duration::from_secs(5),
			multiplier: 1.5,
			max: Duration::from_secs(60),
		}
	}
}

impl PollSchedule {
	/// Delay before the poll following the 0-indexed `poll`th one.
	pub fn delay_for(&self, poll: u32) -> Duration {
		let millis = self.initial.as_millis() as f64 * self.multiplier.powi(poll as i32);
		Duration::from_millis(millis.min(self.max.as_millis() as f64) as u64)
	}
}

/// Starts a job and polls it to a terminal outcome.
///
/// `start` yields the job handle; `fetch` maps a handle to a status
/// snapshot. The loop fetches immediately after start, then sleeps per the
/// schedule between polls. Total wait is bounded by `timeout` plus at most
/// one poll interval.
pub async fn run<H, T, S, F, Fut>(start: S, mut fetch: F, schedule: &PollSchedule, timeout: Duration) -> Result<T>
where
	H: Clone,
	S: std::future::Future<Output = Result<H>>,
	F: FnMut(H) -> Fut,
	Fut: std::future::Future<Output = Result<JobStatus<T>>>,
{
	let handle = start.await?;
	wait(|| fetch(handle.clone()), schedule, timeout).await
}

/// Polls an already-started job to a terminal outcome.
pub async fn wait<T, F, Fut>(mut fetch: F, schedule: &PollSchedule, timeout: Duration) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<JobStatus<T>>>,
{
	let started = tokio::time::Instant::now();
	let mut poll = 0u32;

	loop {
		match fetch().await? {
			JobStatus::Done(value) => {
				debug!(target = "nlm", polls = poll + 1, elapsed_s = started.elapsed().as_secs(), "job finished");
				return Ok(value);
			}
			JobStatus::Failed(detail) => return Err(Error::RemoteOperation { detail }),
			JobStatus::Running => {}
		}

		let elapsed = started.elapsed();
		if elapsed >= timeout {
			return Err(Error::OperationTimeout { elapsed });
		}

		let delay = schedule.delay_for(poll);
		poll += 1;
		debug!(target = "nlm", poll, delay_ms = delay.as_millis() as u64, "job still running");
		tokio::time::sleep(delay).await;
	}
}

//! Session tuning knobs.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Fully owned session configuration.
///
/// This is the stable handoff between the client facade and the session
/// manager; everything here is plain value state so sessions can be built
/// and tested without touching a real browser.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Timeout for streaming endpoints, which hold the connection open
	/// while the remote generates output.
	pub streaming_timeout: Duration,
	/// On an authentication redirect, re-login and retry the call once
	/// before surfacing the failure.
	pub auto_refresh: bool,
	/// How long an extracted anti-forgery token is reused before a
	/// transparent re-extraction. Distinct from credential staleness.
	pub csrf_ttl: Duration,
	/// Credential age beyond which a warning is logged at session open.
	pub credential_stale_after: chrono::Duration,
	/// Retry policy consulted for every remote call.
	pub retry: RetryPolicy,
}

impl SessionOptions {
	pub fn new() -> Self {
		Self {
			streaming_timeout: Duration::from_secs(120),
			auto_refresh: false,
			csrf_ttl: Duration::from_secs(300),
			credential_stale_after: chrono::Duration::days(14),
			retry: RetryPolicy::default(),
		}
	}
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_windows() {
		let opts = SessionOptions::new();
		assert_eq!(opts.csrf_ttl, Duration::from_secs(300));
		assert_eq!(opts.credential_stale_after, chrono::Duration::days(14));
		assert!(!opts.auto_refresh);
	}
}

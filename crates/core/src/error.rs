//! Error taxonomy for the client.
//!
//! Every failure keeps its kind and original status/code so callers can
//! decide what to do next; nothing is downgraded to a generic message
//! inside the library. Recovery rules: the session manager handles exactly
//! one failure class locally (authentication redirect with auto-refresh
//! on); the retry policy and the operation tracker are the only components
//! that delay and repeat.

use std::time::Duration;

use nlm_protocol::{DecodeError, ProtocolError, RemoteFailure};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Credentials missing, incomplete, or rejected by the remote. Never
	/// retried beyond the session manager's single built-in re-auth.
	#[error("authentication failed: {0}")]
	Authentication(String),

	/// The wire format was violated. Never retried; the protocol contract
	/// changed or the response is not what this client understands.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),

	/// A well-formed response encoding an application-level failure.
	#[error("remote call failed: {message}{}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
	Remote {
		status: Option<u16>,
		message: String,
		body: Option<String>,
	},

	/// Explicit backpressure from the remote side. Always retryable; the
	/// suggested delay is honored by the retry policy when present.
	#[error("rate limited{}", .retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default())]
	RateLimited { retry_after: Option<Duration> },

	/// The automation engine failed to start, navigate, or evaluate.
	#[error("browser automation failed: {0}")]
	Browser(String),

	#[error("{what} not found: {id}")]
	NotFound { what: &'static str, id: String },

	/// Caller-side input rejected before any remote call was made.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// A long-running operation reached a failed terminal state.
	#[error("remote operation failed: {detail}")]
	RemoteOperation { detail: String },

	/// The caller's deadline passed while the remote operation was still
	/// running. The outcome is unknown, not failed; the job may yet finish.
	#[error("operation still running after {}s; remote outcome unknown", .elapsed.as_secs())]
	OperationTimeout { elapsed: Duration },

	/// The session is not in a state that can serve the request.
	#[error("session error: {0}")]
	Session(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub(crate) fn remote_status(status: u16, message: impl Into<String>, body: Option<String>) -> Self {
		Error::Remote {
			status: Some(status),
			message: message.into(),
			body,
		}
	}

	/// HTTP status carried by this error, when there is one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Error::Remote { status, .. } => *status,
			_ => None,
		}
	}
}

impl From<DecodeError> for Error {
	fn from(err: DecodeError) -> Self {
		match err {
			DecodeError::Protocol(p) => Error::Protocol(p),
			DecodeError::Remote(RemoteFailure { code }) => Error::Remote {
				status: None,
				message: match code {
					Some(c) => format!("remote returned error code {c}"),
					None => "remote returned an error row".to_string(),
				},
				body: None,
			},
		}
	}
}

//! Wire types and codec for the NotebookLM batched-RPC endpoint.
//!
//! The remote service speaks a reverse-engineered protocol: form-encoded
//! requests carrying a procedure id plus a nested-array parameter tree, and
//! framed responses guarded by an anti-XSSI preamble. This crate owns the
//! bidirectional mapping between typed calls and those bytes; it knows
//! nothing about browsers, sessions, or retries.
//!
//! The protocol is undocumented upstream and may change without notice.
//! Every decode path here fails with a typed error when the observed shape
//! deviates from expectation instead of guessing.

mod codec;
mod stream;
mod value;

pub use codec::{
	ANTI_XSSI_PREFIX, DecodeError, ENVELOPE_TAG, ERROR_TAG, PAYLOAD_SLOT, RemoteFailure, RpcCall, decode_response,
	decode_response_at, encode,
};
pub use stream::{STREAM_TRAILER_TAG, StreamDecoder};
pub use value::Value;

use thiserror::Error;

/// Wire-format violation: the bytes do not match the shape this codec
/// expects. Never retryable; indicates a contract break, not a transient
/// failure.
#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("response is missing the anti-XSSI preamble (unauthenticated or endpoint shape changed)")]
	MissingPrefix,

	#[error("response contained no data frames")]
	EmptyResponse,

	#[error("incomplete frame: declared chunk never completed (near: {snippet})")]
	IncompleteFrame { snippet: String },

	#[error("no envelope row found in decoded frame")]
	MissingEnvelope,

	#[error("envelope has no payload at slot {slot}")]
	MissingPayload { slot: usize },

	#[error("expected {expected}, found {found}")]
	Type {
		expected: &'static str,
		found: &'static str,
	},

	#[error("index {index} out of range (len {len})")]
	Index { index: usize, len: usize },

	#[error("wire value cannot carry a JSON object")]
	UnexpectedObject,

	#[error("stream closed before the end-of-stream trailer")]
	IncompleteStream,

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub(crate) fn snippet(text: &str) -> String {
	const MAX: usize = 120;
	if text.len() <= MAX {
		text.to_string()
	} else {
		let mut end = MAX;
		while !text.is_char_boundary(end) {
			end -= 1;
		}
		format!("{}...", &text[..end])
	}
}

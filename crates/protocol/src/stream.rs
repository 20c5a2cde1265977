//! Incremental decoder for chunked streaming responses.
//!
//! Free-form generation endpoints answer with a sequence of partial frames
//! instead of one complete body. [`StreamDecoder`] is fed raw text as it
//! arrives and yields decoded payload fragments as each frame completes.
//! The remote marks the end of a stream with a trailer row; a stream that
//! closes without it was cut short and must not be treated as complete.

use crate::codec::{self, DecodeError, ENVELOPE_TAG, PAYLOAD_SLOT};
use crate::value::Value;
use crate::{ProtocolError, snippet};

/// Tag of the trailer row the endpoint emits after the final payload frame.
pub const STREAM_TRAILER_TAG: &str = "af.httprm";

/// Accumulates streamed response text and decodes completed frames.
pub struct StreamDecoder {
	slot: usize,
	line_buffer: String,
	chunk_buffer: String,
	prefix_seen: bool,
	finished: bool,
}

impl StreamDecoder {
	pub fn new() -> Self {
		Self::with_slot(PAYLOAD_SLOT)
	}

	/// Decoder for a call family whose payload lives at a non-default slot.
	pub fn with_slot(slot: usize) -> Self {
		Self {
			slot,
			line_buffer: String::new(),
			chunk_buffer: String::new(),
			prefix_seen: false,
			finished: false,
		}
	}

	/// True once the end-of-stream trailer has been observed.
	pub fn finished(&self) -> bool {
		self.finished
	}

	/// Feeds a chunk of raw response text, returning payload fragments from
	/// every frame that completed. Fragments arrive in wire order.
	pub fn push(&mut self, text: &str) -> Result<Vec<Value>, DecodeError> {
		self.line_buffer.push_str(text);

		if !self.prefix_seen {
			if self.line_buffer.len() < codec::ANTI_XSSI_PREFIX.len() {
				return Ok(Vec::new());
			}
			self.line_buffer = codec::strip_prefix(&self.line_buffer)?.to_string();
			self.prefix_seen = true;
		}

		let mut fragments = Vec::new();
		while let Some(newline) = self.line_buffer.find('\n') {
			let line: String = self.line_buffer.drain(..=newline).collect();
			let line = line.trim();
			if line.is_empty() {
				continue;
			}
			if self.chunk_buffer.is_empty() && codec::is_count_line(line) {
				continue;
			}

			self.chunk_buffer.push_str(line);
			if let Ok(json) = serde_json::from_str::<serde_json::Value>(&self.chunk_buffer) {
				self.chunk_buffer.clear();
				let frame = Value::from_json(json)?;
				self.collect_fragments(&frame, &mut fragments)?;
			}
		}

		Ok(fragments)
	}

	fn collect_fragments(&mut self, frame: &Value, out: &mut Vec<Value>) -> Result<(), ProtocolError> {
		if codec::find_row(frame, STREAM_TRAILER_TAG).is_some() {
			self.finished = true;
		}
		let rows = match frame {
			Value::Seq(rows) => rows,
			_ => return Ok(()),
		};
		for row in rows {
			let tagged = match row.get_opt(0) {
				Some(Value::String(tag)) => tag == ENVELOPE_TAG,
				_ => false,
			};
			if tagged {
				out.push(codec::extract_payload(row, self.slot)?);
			} else if codec::find_row(row, ENVELOPE_TAG).is_some() {
				// Some protocol versions nest the envelope a level deeper.
				self.collect_fragments(row, out)?;
			}
		}
		Ok(())
	}

	/// Finalizes the stream. Fails when the remote closed the connection
	/// before the trailer: the response is incomplete, not short.
	pub fn finish(self) -> Result<(), ProtocolError> {
		if !self.chunk_buffer.is_empty() {
			return Err(ProtocolError::IncompleteFrame {
				snippet: snippet(&self.chunk_buffer),
			});
		}
		if !self.finished {
			return Err(ProtocolError::IncompleteStream);
		}
		Ok(())
	}
}

impl Default for StreamDecoder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn envelope_line(payload: &Value) -> String {
		Value::seq([Value::seq([Value::from(ENVELOPE_TAG), Value::Null, Value::from(payload.to_json_string())])])
			.to_json_string()
	}

	fn trailer_line() -> String {
		Value::seq([Value::seq([Value::from(STREAM_TRAILER_TAG), Value::from(1)])]).to_json_string()
	}

	#[test]
	fn yields_fragments_as_frames_complete() {
		let mut decoder = StreamDecoder::new();
		let first = envelope_line(&Value::seq([Value::from("partial")]));
		let second = envelope_line(&Value::seq([Value::from("partial answer")]));

		let got = decoder.push(&format!(")]}}'\n{}\n{}\n", first.len(), first)).unwrap();
		assert_eq!(got.len(), 1);
		assert_eq!(got[0].get(0).unwrap().str().unwrap(), "partial");

		let got = decoder
			.push(&format!("{}\n{}\n{}\n", second.len(), second, trailer_line()))
			.unwrap();
		assert_eq!(got.len(), 1);
		assert!(decoder.finished());
		decoder.finish().unwrap();
	}

	#[test]
	fn frame_split_across_pushes_is_buffered() {
		let mut decoder = StreamDecoder::new();
		let line = envelope_line(&Value::seq([Value::from("split")]));
		let (head, tail) = line.split_at(line.len() / 2);

		assert!(decoder.push(&format!(")]}}'\n{head}")).unwrap().is_empty());
		let got = decoder.push(&format!("{tail}\n{}\n", trailer_line())).unwrap();
		assert_eq!(got.len(), 1);
	}

	#[test]
	fn close_without_trailer_is_incomplete() {
		let mut decoder = StreamDecoder::new();
		let line = envelope_line(&Value::seq([Value::from("only")]));
		decoder.push(&format!(")]}}'\n{line}\n")).unwrap();
		let err = decoder.finish().unwrap_err();
		assert!(matches!(err, ProtocolError::IncompleteStream));
	}

	#[test]
	fn missing_prefix_fails() {
		let mut decoder = StreamDecoder::new();
		let err = decoder.push("[[\"wrb.fr\",null,\"[]\"]]\n").unwrap_err();
		assert!(matches!(err, DecodeError::Protocol(ProtocolError::MissingPrefix)));
	}

	#[test]
	fn count_lines_between_frames_are_skipped() {
		let mut decoder = StreamDecoder::new();
		let line = envelope_line(&Value::seq([Value::from("x")]));
		let got = decoder
			.push(&format!(")]}}'\n12\n{line}\n9\n{}\n", trailer_line()))
			.unwrap();
		assert_eq!(got.len(), 1);
		decoder.finish().unwrap();
	}
}

//! Notebook Q&A over the streaming endpoint.
//!
//! Answers arrive as successive partial fragments: the remote re-sends the
//! growing answer text alongside interim "thinking" fragments. Extraction
//! keeps the longest fragment of each kind and prefers answer-typed text.

use nlm_protocol::{RpcCall, Value};
use tracing::info;

use super::{flat_source_ids, map_not_found};
use crate::error::{Error, Result};
use crate::session::Session;

const QUERY: &str = "LrTqzb";

/// Fragment type code marking final answer text (vs interim thinking).
const FRAGMENT_ANSWER: i64 = 1;

#[derive(Debug, Clone)]
pub struct Answer {
	pub text: String,
	/// True when the text came from an answer-typed fragment rather than
	/// interim thinking output.
	pub is_final: bool,
}

/// Asks the notebook a question, scoped to the given sources.
pub async fn ask(
	session: &mut Session,
	notebook_id: &str,
	question: &str,
	source_ids: &[String],
	conversation_id: Option<&str>,
) -> Result<Answer> {
	if question.trim().is_empty() {
		return Err(Error::InvalidInput("question cannot be empty".to_string()));
	}
	if source_ids.is_empty() {
		return Err(Error::InvalidInput("at least one source id is required".to_string()));
	}

	info!(target = "nlm", notebook_id, sources = source_ids.len(), "querying notebook");
	let params = Value::seq([
		Value::seq([flat_source_ids(source_ids)]),
		Value::from(question),
		Value::from(conversation_id),
		Value::from(notebook_id),
	]);
	let fragments = session
		.call_streaming(&RpcCall::new(QUERY, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;

	Ok(extract_answer(&fragments))
}

/// Picks the best text out of the streamed fragments: the longest
/// answer-typed fragment, falling back to the longest thinking fragment.
pub(crate) fn extract_answer(fragments: &[Value]) -> Answer {
	let mut longest_answer = String::new();
	let mut longest_thinking = String::new();

	for fragment in fragments {
		let Some((text, is_answer)) = fragment_text(fragment) else {
			continue;
		};
		if is_answer && text.len() > longest_answer.len() {
			longest_answer = text;
		} else if !is_answer && text.len() > longest_thinking.len() {
			longest_thinking = text;
		}
	}

	if longest_answer.is_empty() {
		Answer {
			text: longest_thinking,
			is_final: false,
		}
	} else {
		Answer {
			text: longest_answer,
			is_final: true,
		}
	}
}

/// Fragment payload: `[[text, ..., [..., type_code]], ...]`, or a bare
/// string in older protocol versions.
fn fragment_text(fragment: &Value) -> Option<(String, bool)> {
	let first = fragment.get_opt(0)?;
	match first {
		Value::Seq(_) => {
			let text = first.get_opt(0)?.str().ok()?.to_string();
			if text.is_empty() {
				return None;
			}
			let is_answer = first
				.get_opt(4)
				.and_then(|flags| flags.elements().ok())
				.and_then(|flags| flags.last())
				.and_then(|last| last.integer().ok())
				.map(|code| code == FRAGMENT_ANSWER)
				.unwrap_or(false);
			Some((text, is_answer))
		}
		Value::String(text) if !text.is_empty() => Some((text.clone(), false)),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fragment(raw: &str) -> Value {
		Value::from_json_str(raw).unwrap()
	}

	#[test]
	fn longest_answer_fragment_wins() {
		let fragments = vec![
			fragment(r#"[["Short",null,null,null,[1]]]"#),
			fragment(r#"[["A much longer final answer",null,null,null,[0,1]]]"#),
			fragment(r#"[["Even longer thinking text that is not the answer",null,null,null,[2]]]"#),
		];
		let answer = extract_answer(&fragments);
		assert!(answer.is_final);
		assert_eq!(answer.text, "A much longer final answer");
	}

	#[test]
	fn falls_back_to_thinking_when_no_answer_fragment() {
		let fragments = vec![
			fragment(r#"[["Working through the sources...",null,null,null,[2]]]"#),
			fragment(r#"[["Short",null,null,null,[2]]]"#),
		];
		let answer = extract_answer(&fragments);
		assert!(!answer.is_final);
		assert_eq!(answer.text, "Working through the sources...");
	}

	#[test]
	fn bare_string_fragment_reads_as_thinking() {
		let fragments = vec![fragment(r#"["plain text chunk"]"#)];
		let answer = extract_answer(&fragments);
		assert!(!answer.is_final);
		assert_eq!(answer.text, "plain text chunk");
	}

	#[test]
	fn malformed_fragments_are_skipped() {
		let fragments = vec![
			fragment("[]"),
			fragment("[null]"),
			fragment(r#"[[""]]"#),
			fragment(r#"[["real answer",null,null,null,[1]]]"#),
		];
		let answer = extract_answer(&fragments);
		assert_eq!(answer.text, "real answer");
	}

	#[test]
	fn empty_stream_yields_empty_answer() {
		let answer = extract_answer(&[]);
		assert!(answer.text.is_empty());
		assert!(!answer.is_final);
	}
}

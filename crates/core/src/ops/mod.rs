//! Typed wrappers for the remote operation catalog.
//!
//! Every operation here is a thin layer over [`Session::call_rpc`] or the
//! operation tracker: build the positional parameter tree, make the call,
//! parse the positional response. Procedure ids and tree shapes were
//! discovered by observing the web app and may drift; parsers read
//! identity fields strictly (a missing id is a protocol error) and
//! decoration fields leniently (absent title/URL slots degrade to
//! defaults).
//!
//! [`Session::call_rpc`]: crate::session::Session::call_rpc

pub mod chat;
pub mod notebooks;
pub mod research;
pub mod sources;
pub mod studio;

use nlm_protocol::Value;

/// Reads an optional string slot.
pub(crate) fn opt_string(value: &Value, index: usize) -> Option<String> {
	value.get_opt(index).and_then(|v| v.str().ok()).map(str::to_string)
}

/// Reads an optional integer slot.
pub(crate) fn opt_integer(value: &Value, index: usize) -> Option<i64> {
	value.get_opt(index).and_then(|v| v.integer().ok())
}

/// Maps a "not found"-shaped remote failure onto the typed variant.
pub(crate) fn map_not_found(err: crate::Error, what: &'static str, id: &str) -> crate::Error {
	match &err {
		crate::Error::Remote { status, message, .. }
			if *status == Some(404) || message.to_lowercase().contains("not found") =>
		{
			crate::Error::NotFound {
				what,
				id: id.to_string(),
			}
		}
		_ => err,
	}
}

/// Source ids in the doubly-nested shape studio payloads expect:
/// `[[[id1]], [[id2]], ...]`.
pub(crate) fn nested_source_ids(source_ids: &[String]) -> Value {
	Value::seq(
		source_ids
			.iter()
			.map(|id| Value::seq([Value::seq([Value::from(id.as_str())])])),
	)
}

/// Source ids in the flat shape option trees expect: `[[id1], [id2], ...]`.
pub(crate) fn flat_source_ids(source_ids: &[String]) -> Value {
	Value::seq(source_ids.iter().map(|id| Value::seq([Value::from(id.as_str())])))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Error;

	#[test]
	fn not_found_mapping_matches_status_and_message() {
		let by_status = Error::Remote {
			status: Some(404),
			message: "gone".into(),
			body: None,
		};
		assert!(matches!(
			map_not_found(by_status, "notebook", "nb-1"),
			Error::NotFound { what: "notebook", .. }
		));

		let by_message = Error::Remote {
			status: None,
			message: "Notebook Not Found".into(),
			body: None,
		};
		assert!(matches!(map_not_found(by_message, "source", "s-1"), Error::NotFound { .. }));

		let unrelated = Error::Remote {
			status: Some(500),
			message: "boom".into(),
			body: None,
		};
		assert!(matches!(map_not_found(unrelated, "notebook", "nb-1"), Error::Remote { .. }));
	}

	#[test]
	fn source_id_shapes() {
		let ids = vec!["a".to_string(), "b".to_string()];
		assert_eq!(nested_source_ids(&ids).to_json_string(), r#"[[["a"]],[["b"]]]"#);
		assert_eq!(flat_source_ids(&ids).to_json_string(), r#"[["a"],["b"]]"#);
	}
}

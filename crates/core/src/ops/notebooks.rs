//! Notebook CRUD operations.

use nlm_protocol::{RpcCall, Value};
use tracing::debug;

use super::{map_not_found, opt_string};
use crate::error::Result;
use crate::ops::sources::{Source, parse_source};
use crate::session::Session;

const LIST: &str = "wXbhsf";
const CREATE: &str = "CCqFvf";
const GET: &str = "GkrRBf";
const RENAME: &str = "cBavhb";
const DELETE: &str = "oPkhIc";

#[derive(Debug, Clone)]
pub struct Notebook {
	pub id: String,
	pub title: String,
	pub sources: Vec<Source>,
}

impl Notebook {
	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}

pub async fn list(session: &mut Session) -> Result<Vec<Notebook>> {
	debug!(target = "nlm", "listing notebooks");
	let result = session
		.call_rpc(&RpcCall::new(
			LIST,
			Value::seq([Value::Null, Value::from(1), Value::Null, Value::seq([Value::from(2)])]),
		))
		.await?;

	// Response: [[notebook, notebook, ...], ...]; malformed rows are skipped.
	let rows = match result.get_opt(0) {
		Some(rows) => rows.elements()?.to_vec(),
		None => return Ok(Vec::new()),
	};
	Ok(rows.iter().filter_map(|row| parse_notebook(row).ok()).collect())
}

pub async fn create(session: &mut Session, title: &str) -> Result<Notebook> {
	debug!(target = "nlm", title, "creating notebook");
	let params = Value::seq([
		Value::from(title),
		Value::Null,
		Value::Null,
		Value::seq([Value::from(2)]),
		Value::seq([]),
	]);
	let result = session.call_rpc(&RpcCall::new(CREATE, params)).await?;
	parse_notebook(&result)
}

pub async fn get(session: &mut Session, notebook_id: &str) -> Result<Notebook> {
	let params = Value::seq([
		Value::Null,
		Value::seq([Value::seq([Value::from(notebook_id)])]),
		Value::seq([Value::from(2)]),
	]);
	let result = session
		.call_rpc(&RpcCall::new(GET, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	parse_notebook(&result)
}

pub async fn rename(session: &mut Session, notebook_id: &str, new_title: &str) -> Result<()> {
	debug!(target = "nlm", notebook_id, new_title, "renaming notebook");
	let params = Value::seq([Value::from(notebook_id), Value::from(new_title), Value::seq([Value::from(2)])]);
	session
		.call_rpc(&RpcCall::new(RENAME, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	Ok(())
}

pub async fn delete(session: &mut Session, notebook_id: &str) -> Result<()> {
	debug!(target = "nlm", notebook_id, "deleting notebook");
	let params = Value::seq([
		Value::seq([Value::seq([Value::from(notebook_id)])]),
		Value::Null,
		Value::seq([Value::from(2)]),
	]);
	session
		.call_rpc(&RpcCall::new(DELETE, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	Ok(())
}

/// Notebook row: `[id, title, ..., [source, ...], ...]`. The id is
/// mandatory; everything else degrades gracefully.
pub(crate) fn parse_notebook(row: &Value) -> Result<Notebook> {
	let id = row.get(0)?.str()?.to_string();
	let title = opt_string(row, 1).unwrap_or_else(|| "Untitled".to_string());
	let sources = row
		.get_opt(3)
		.and_then(|v| v.elements().ok())
		.map(|rows| rows.iter().filter_map(|r| parse_source(r).ok()).collect())
		.unwrap_or_default();

	Ok(Notebook { id, title, sources })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_notebook_reads_id_title_and_sources() {
		let row = Value::from_json_str(r#"["nb-1","Research",null,[["src-1","Paper",1,"https://x",1]]]"#).unwrap();
		let notebook = parse_notebook(&row).unwrap();
		assert_eq!(notebook.id, "nb-1");
		assert_eq!(notebook.title, "Research");
		assert_eq!(notebook.source_count(), 1);
		assert_eq!(notebook.sources[0].id, "src-1");
	}

	#[test]
	fn parse_notebook_defaults_missing_title() {
		let row = Value::from_json_str(r#"["nb-2",null]"#).unwrap();
		let notebook = parse_notebook(&row).unwrap();
		assert_eq!(notebook.title, "Untitled");
		assert!(notebook.sources.is_empty());
	}

	#[test]
	fn parse_notebook_without_id_fails_loudly() {
		let row = Value::from_json_str("[null]").unwrap();
		assert!(parse_notebook(&row).is_err());
	}

	#[test]
	fn parse_notebook_skips_malformed_source_rows() {
		let row = Value::from_json_str(r#"["nb-3","T",null,[["src-1","Ok"],[null],17]]"#).unwrap();
		let notebook = parse_notebook(&row).unwrap();
		assert_eq!(notebook.source_count(), 1);
	}
}

//! Source ingestion operations.

use nlm_protocol::{RpcCall, Value};
use tracing::debug;

use super::{map_not_found, opt_string};
use crate::error::{Error, Result};
use crate::session::Session;

const ADD: &str = "izAoDd";
const ADD_TEXT: &str = "dqfPBf";
const DELETE: &str = "oPkhIc";
const LIST_DRIVE_DOCS: &str = "KGBelc";

/// Wire type codes for added sources.
const TYPE_URL: i64 = 1;
const TYPE_YOUTUBE: i64 = 2;
const TYPE_DRIVE: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
	Url,
	YouTube,
	Drive,
	Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
	Processing,
	Ready,
	Failed,
}

#[derive(Debug, Clone)]
pub struct Source {
	pub id: String,
	pub title: String,
	pub kind: SourceKind,
	pub url: Option<String>,
	pub status: SourceStatus,
}

pub async fn add_url(session: &mut Session, notebook_id: &str, url: &str) -> Result<Source> {
	debug!(target = "nlm", notebook_id, url, "adding url source");
	add_typed(session, notebook_id, TYPE_URL, url).await
}

pub async fn add_youtube(session: &mut Session, notebook_id: &str, url: &str) -> Result<Source> {
	if youtube_video_id(url).is_none() {
		return Err(Error::InvalidInput(format!("not a YouTube video URL: {url}")));
	}
	debug!(target = "nlm", notebook_id, url, "adding youtube source");
	add_typed(session, notebook_id, TYPE_YOUTUBE, url).await
}

pub async fn add_drive(session: &mut Session, notebook_id: &str, document_id: &str) -> Result<Source> {
	debug!(target = "nlm", notebook_id, document_id, "adding drive source");
	add_typed(session, notebook_id, TYPE_DRIVE, document_id).await
}

async fn add_typed(session: &mut Session, notebook_id: &str, type_code: i64, reference: &str) -> Result<Source> {
	let params = Value::seq([
		Value::seq([Value::seq([Value::from(type_code), Value::from(reference)])]),
		Value::from(notebook_id),
		Value::seq([Value::from(2)]),
	]);
	let result = session
		.call_rpc(&RpcCall::new(ADD, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	parse_added(&result)
}

pub async fn add_text(session: &mut Session, notebook_id: &str, content: &str, title: Option<&str>) -> Result<Source> {
	let title = title.unwrap_or("Untitled Text");
	debug!(target = "nlm", notebook_id, title, bytes = content.len(), "adding text source");
	let params = Value::seq([
		Value::from(notebook_id),
		Value::from(title),
		Value::from(content),
		Value::seq([Value::from(2)]),
	]);
	let result = session
		.call_rpc(&RpcCall::new(ADD_TEXT, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	parse_added(&result)
}

pub async fn delete(session: &mut Session, notebook_id: &str, source_id: &str) -> Result<()> {
	debug!(target = "nlm", notebook_id, source_id, "deleting source");
	let params = Value::seq([
		Value::seq([Value::seq([Value::from(notebook_id), Value::from(source_id)])]),
		Value::Null,
		Value::seq([Value::from(2)]),
	]);
	session
		.call_rpc(&RpcCall::new(DELETE, params))
		.await
		.map_err(|e| map_not_found(e, "source", source_id))?;
	Ok(())
}

/// Titles and ids of Drive documents visible to the account.
pub async fn list_drive_docs(session: &mut Session) -> Result<Vec<(String, String)>> {
	let result = session
		.call_rpc(&RpcCall::new(LIST_DRIVE_DOCS, Value::seq([Value::Null, Value::seq([Value::from(2)])])))
		.await?;
	let rows = match result.elements() {
		Ok(rows) => rows,
		Err(_) => return Ok(Vec::new()),
	};
	Ok(rows
		.iter()
		.filter_map(|row| Some((opt_string(row, 0)?, opt_string(row, 1).unwrap_or_else(|| "Untitled".to_string()))))
		.collect())
}

/// An add-source response nests the new source one level down.
fn parse_added(result: &Value) -> Result<Source> {
	let row = result.get(0)?;
	parse_source(row)
}

/// Source row: `[id, title, type_code, url, status_code, ...]`.
pub(crate) fn parse_source(row: &Value) -> Result<Source> {
	let id = row.get(0)?.str()?.to_string();
	let title = opt_string(row, 1).unwrap_or_else(|| "Untitled".to_string());

	let kind = match super::opt_integer(row, 2) {
		Some(1) => SourceKind::Url,
		Some(2) => SourceKind::YouTube,
		Some(3) => SourceKind::Drive,
		_ => SourceKind::Text,
	};
	let url = opt_string(row, 3);
	let status = match super::opt_integer(row, 4) {
		Some(1) => SourceStatus::Ready,
		Some(2) => SourceStatus::Failed,
		_ => SourceStatus::Processing,
	};

	Ok(Source {
		id,
		title,
		kind,
		url,
		status,
	})
}

/// Pulls the 11-character video id out of the YouTube URL shapes users
/// paste: `watch?v=`, `youtu.be/`, `/embed/`, `/v/`.
pub(crate) fn youtube_video_id(url: &str) -> Option<&str> {
	const PREFIXES: [&str; 4] = ["youtube.com/watch?v=", "youtu.be/", "youtube.com/embed/", "youtube.com/v/"];

	for prefix in PREFIXES {
		if let Some(start) = url.find(prefix) {
			let rest = &url[start + prefix.len()..];
			let id: &str = match rest.char_indices().find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-') {
				Some((end, _)) => &rest[..end],
				None => rest,
			};
			if id.len() == 11 {
				return Some(id);
			}
		}
	}
	None
}

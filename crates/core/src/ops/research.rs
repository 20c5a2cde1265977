//! Research discovery: start a task, poll it, import its findings.
//!
//! Research runs server-side. Starting returns a task id immediately;
//! results arrive over subsequent polls. [`wait`] drives the generic
//! operation tracker over [`poll`] until the task leaves the in-progress
//! state.

use std::cell::RefCell;
use std::time::Duration;

use nlm_protocol::{RpcCall, Value};
use tracing::{debug, info};

use super::{map_not_found, opt_integer, opt_string};
use crate::error::{Error, Result};
use crate::lro::{self, JobStatus, PollSchedule};
use crate::session::Session;

const START_FAST: &str = "Ljjv0c";
const START_DEEP: &str = "QA9ei";
const POLL: &str = "e3bVqc";
const IMPORT: &str = "LBwxtb";

const SOURCE_WEB: i64 = 1;
const SOURCE_DRIVE: i64 = 2;
const MODE_FAST: i64 = 1;
const MODE_DEEP: i64 = 5;

/// Result type codes reported by the poll endpoint.
const RESULT_WEB: i64 = 1;
const RESULT_GOOGLE_DOC: i64 = 2;
const RESULT_GOOGLE_SLIDES: i64 = 3;
const RESULT_DEEP_REPORT: i64 = 5;
const RESULT_GOOGLE_SHEETS: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchMode {
	Fast,
	Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchScope {
	Web,
	Drive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStatus {
	InProgress,
	Completed,
	/// The notebook has no research task at all.
	NoResearch,
}

/// One discovered source.
#[derive(Debug, Clone)]
pub struct Finding {
	pub index: usize,
	pub url: String,
	pub title: String,
	pub description: String,
	pub result_type: i64,
}

impl Finding {
	pub fn kind(&self) -> &'static str {
		match self.result_type {
			RESULT_WEB => "web",
			RESULT_GOOGLE_DOC => "google_doc",
			RESULT_GOOGLE_SLIDES => "google_slides",
			RESULT_DEEP_REPORT => "deep_report",
			RESULT_GOOGLE_SHEETS => "google_sheets",
			_ => "unknown",
		}
	}

	/// Deep-research reports live remote-side only; they cannot be
	/// imported as notebook sources.
	pub fn importable(&self) -> bool {
		self.result_type != RESULT_DEEP_REPORT && !self.url.is_empty()
	}
}

/// State of a research task as of the last poll.
#[derive(Debug, Clone)]
pub struct ResearchTask {
	pub task_id: String,
	pub report_id: Option<String>,
	pub notebook_id: String,
	pub query: String,
	pub mode: ResearchMode,
	pub scope: ResearchScope,
	pub status: ResearchStatus,
	pub findings: Vec<Finding>,
	pub summary: String,
	/// Markdown report, populated by deep research once complete.
	pub report: String,
}

/// A finding imported into the notebook as a source.
#[derive(Debug, Clone)]
pub struct ImportedSource {
	pub id: String,
	pub title: String,
}

pub async fn start(
	session: &mut Session,
	notebook_id: &str,
	query: &str,
	scope: ResearchScope,
	mode: ResearchMode,
) -> Result<ResearchTask> {
	let notebook_id = notebook_id.trim();
	let query = query.trim();
	if notebook_id.is_empty() {
		return Err(Error::InvalidInput("notebook id cannot be empty".to_string()));
	}
	if query.is_empty() {
		return Err(Error::InvalidInput("research query cannot be empty".to_string()));
	}
	if mode == ResearchMode::Deep && scope == ResearchScope::Drive {
		return Err(Error::InvalidInput(
			"deep research only supports web scope; use fast mode for Drive".to_string(),
		));
	}

	let scope_code = match scope {
		ResearchScope::Web => SOURCE_WEB,
		ResearchScope::Drive => SOURCE_DRIVE,
	};
	let call = match mode {
		ResearchMode::Fast => RpcCall::new(
			START_FAST,
			Value::seq([
				Value::seq([Value::from(query), Value::from(scope_code)]),
				Value::Null,
				Value::from(MODE_FAST),
				Value::from(notebook_id),
			]),
		),
		ResearchMode::Deep => RpcCall::new(
			START_DEEP,
			Value::seq([
				Value::Null,
				Value::seq([Value::from(1)]),
				Value::seq([Value::from(query), Value::from(scope_code)]),
				Value::from(MODE_DEEP),
				Value::from(notebook_id),
			]),
		),
	};

	info!(target = "nlm", notebook_id, query, ?mode, ?scope, "starting research");
	let result = session
		.call_rpc(&call)
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;

	let task_id = result.get(0)?.str()?.to_string();
	let report_id = opt_string(&result, 1);
	info!(target = "nlm", task_id, "research started");

	Ok(ResearchTask {
		task_id,
		report_id,
		notebook_id: notebook_id.to_string(),
		query: query.to_string(),
		mode,
		scope,
		status: ResearchStatus::InProgress,
		findings: Vec::new(),
		summary: String::new(),
		report: String::new(),
	})
}

/// Fetches the current state of the notebook's research task.
pub async fn poll(session: &mut Session, notebook_id: &str) -> Result<ResearchTask> {
	debug!(target = "nlm", notebook_id, "polling research");
	let params = Value::seq([Value::Null, Value::Null, Value::from(notebook_id)]);
	let result = session
		.call_rpc(&RpcCall::new(POLL, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	Ok(parse_poll(&result, notebook_id))
}

/// Polls until the research task is no longer in progress, on the given
/// schedule, failing with a timeout when the deadline passes first.
pub async fn wait(
	session: &mut Session,
	notebook_id: &str,
	schedule: &PollSchedule,
	timeout: Duration,
) -> Result<ResearchTask> {
	let cell = RefCell::new(session);
	lro::wait(
		|| async {
			let mut session = cell.borrow_mut();
			let task = poll(&mut session, notebook_id).await?;
			Ok(match task.status {
				ResearchStatus::InProgress => JobStatus::Running,
				_ => JobStatus::Done(task),
			})
		},
		schedule,
		timeout,
	)
	.await
}

/// Imports findings into the notebook as sources.
pub async fn import(
	session: &mut Session,
	notebook_id: &str,
	task_id: &str,
	findings: &[Finding],
) -> Result<Vec<ImportedSource>> {
	if findings.is_empty() {
		return Err(Error::InvalidInput("no findings to import".to_string()));
	}

	let rows: Vec<Value> = findings.iter().filter(|f| f.importable()).map(import_row).collect();
	if rows.is_empty() {
		debug!(target = "nlm", "no importable findings");
		return Ok(Vec::new());
	}

	info!(target = "nlm", notebook_id, task_id, count = rows.len(), "importing research findings");
	let params = Value::seq([
		Value::Null,
		Value::seq([Value::from(1)]),
		Value::from(task_id),
		Value::from(notebook_id),
		Value::seq(rows),
	]);
	let result = session
		.call_rpc(&RpcCall::new(IMPORT, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;
	Ok(parse_import(&result))
}

/// Import row for one finding. Web findings carry `[url, title]` at slot
/// 2; Drive findings carry `[doc_id, mime_type, 1, title]` at slot 0.
fn import_row(finding: &Finding) -> Value {
	let mut row = vec![Value::Null; 10];
	match drive_document_id(&finding.url) {
		Some(doc_id) if finding.result_type != RESULT_WEB => {
			row[0] = Value::seq([
				Value::from(doc_id),
				Value::from(drive_mime_type(finding.result_type)),
				Value::from(1),
				Value::from(finding.title.as_str()),
			]);
		}
		_ => {
			row[2] = Value::seq([Value::from(finding.url.as_str()), Value::from(finding.title.as_str())]);
		}
	}
	row.push(Value::from(2));
	Value::Seq(row)
}

fn drive_mime_type(result_type: i64) -> &'static str {
	match result_type {
		RESULT_GOOGLE_SLIDES => "application/vnd.google-apps.presentation",
		RESULT_GOOGLE_SHEETS => "application/vnd.google-apps.spreadsheet",
		_ => "application/vnd.google-apps.document",
	}
}

/// Document id from a Drive URL: `?id=<id>` or `/d/<id>/`.
pub(crate) fn drive_document_id(url: &str) -> Option<&str> {
	if let Some(start) = url.find("id=") {
		let rest = &url[start + 3..];
		let end = rest.find('&').unwrap_or(rest.len());
		if end > 0 {
			return Some(&rest[..end]);
		}
	}
	if let Some(start) = url.find("/d/") {
		let rest = &url[start + 3..];
		let end = rest
			.char_indices()
			.find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
			.map(|(i, _)| i)
			.unwrap_or(rest.len());
		if end > 0 {
			return Some(&rest[..end]);
		}
	}
	None
}

/// Poll payload: `[[task_id, task_info, ...], [timestamp], ...]`, possibly
/// wrapped one level deeper. Timestamp rows and malformed rows are
/// skipped; the first plausible task row wins.
fn parse_poll(result: &Value, notebook_id: &str) -> ResearchTask {
	let none = || ResearchTask {
		task_id: String::new(),
		report_id: None,
		notebook_id: notebook_id.to_string(),
		query: String::new(),
		mode: ResearchMode::Fast,
		scope: ResearchScope::Web,
		status: ResearchStatus::NoResearch,
		findings: Vec::new(),
		summary: String::new(),
		report: String::new(),
	};

	let rows = match result.elements() {
		Ok(rows) if !rows.is_empty() => rows,
		_ => return none(),
	};
	// Unwrap `[[task, ...], ...]` when the first row is itself a row list.
	let rows = match rows[0].get_opt(0) {
		Some(Value::Seq(_)) => match rows[0].elements() {
			Ok(inner) => inner,
			Err(_) => rows,
		},
		_ => rows,
	};

	for row in rows {
		let Some(task_id) = opt_string(row, 0) else {
			continue;
		};
		let Some(info) = row.get_opt(1) else {
			continue;
		};
		if info.elements().is_err() {
			continue;
		}

		let query_info = info.get_opt(1);
		let query = query_info.and_then(|q| opt_string(q, 0)).unwrap_or_default();
		let scope = match query_info.and_then(|q| opt_integer(q, 1)) {
			Some(SOURCE_DRIVE) => ResearchScope::Drive,
			_ => ResearchScope::Web,
		};
		let mode = match opt_integer(info, 2) {
			Some(MODE_DEEP) => ResearchMode::Deep,
			_ => ResearchMode::Fast,
		};
		let status = match opt_integer(info, 4) {
			Some(2) => ResearchStatus::Completed,
			_ => ResearchStatus::InProgress,
		};

		let mut findings = Vec::new();
		let mut summary = String::new();
		let mut report = String::new();
		if let Some(sources_and_summary) = info.get_opt(3) {
			summary = opt_string(sources_and_summary, 1).unwrap_or_default();
			if let Some(source_rows) = sources_and_summary.get_opt(0).and_then(|v| v.elements().ok()) {
				for (index, source) in source_rows.iter().enumerate() {
					if let Some(finding) = parse_finding(index, source, &mut report) {
						findings.push(finding);
					}
				}
			}
		}

		return ResearchTask {
			task_id,
			report_id: None,
			notebook_id: notebook_id.to_string(),
			query,
			mode,
			scope,
			status,
			findings,
			summary,
			report,
		};
	}

	none()
}

fn parse_finding(index: usize, source: &Value, report: &mut String) -> Option<Finding> {
	let row = source.elements().ok()?;
	if row.len() < 2 {
		return None;
	}

	// Deep-research rows pad slot 0 with null and carry the title at slot 1
	// and the report text at slot 6.
	if row[0].is_null() {
		let title = source.get_opt(1)?.str().ok()?.to_string();
		if let Some(text) = source.get_opt(6).and_then(|v| opt_string(v, 0)) {
			*report = text;
		}
		return Some(Finding {
			index,
			url: String::new(),
			title,
			description: String::new(),
			result_type: opt_integer(source, 3).unwrap_or(RESULT_DEEP_REPORT),
		});
	}

	// Fast-research rows: [url, title, description, type, ...].
	Some(Finding {
		index,
		url: opt_string(source, 0)?,
		title: opt_string(source, 1).unwrap_or_default(),
		description: opt_string(source, 2).unwrap_or_default(),
		result_type: opt_integer(source, 3).unwrap_or(RESULT_WEB),
	})
}

/// Import payload: `[[[id, ...], title], ...]`, possibly wrapped.
fn parse_import(result: &Value) -> Vec<ImportedSource> {
	let rows = match result.elements() {
		Ok(rows) if !rows.is_empty() => rows,
		_ => return Vec::new(),
	};
	let rows = match rows[0].get_opt(0) {
		Some(Value::Seq(_)) if rows[0].get_opt(0).and_then(|v| v.get_opt(0)).is_some() => match rows[0].elements() {
			Ok(inner) => inner,
			Err(_) => rows,
		},
		_ => rows,
	};

	rows.iter()
		.filter_map(|row| {
			let id = row.get_opt(0).and_then(|v| opt_string(v, 0))?;
			let title = opt_string(row, 1).unwrap_or_else(|| "Untitled".to_string());
			Some(ImportedSource { id, title })
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_poll_reads_completed_fast_task() {
		let raw = r#"[[
			["task-1",[null,["rust async",1],1,[[["https://a","Title A","Desc",1],["https://b","Title B","Desc",1]],"two findings"],2]],
			[1736000000]
		]]"#;
		let task = parse_poll(&Value::from_json_str(raw).unwrap(), "nb-1");

		assert_eq!(task.task_id, "task-1");
		assert_eq!(task.status, ResearchStatus::Completed);
		assert_eq!(task.query, "rust async");
		assert_eq!(task.mode, ResearchMode::Fast);
		assert_eq!(task.findings.len(), 2);
		assert_eq!(task.summary, "two findings");
		assert_eq!(task.findings[0].url, "https://a");
		assert!(task.findings[0].importable());
	}

	#[test]
	fn parse_poll_reads_running_deep_task_with_report() {
		let raw = r##"[
			["task-2",[null,["quantum",1],5,[[[null,"Deep Report",null,5,null,null,["# Report body"]]]],1]]
		]"##;
		let task = parse_poll(&Value::from_json_str(raw).unwrap(), "nb-1");

		assert_eq!(task.status, ResearchStatus::InProgress);
		assert_eq!(task.mode, ResearchMode::Deep);
		assert_eq!(task.report, "# Report body");
		assert_eq!(task.findings.len(), 1);
		assert!(!task.findings[0].importable());
	}

	#[test]
	fn parse_poll_without_task_is_no_research() {
		let task = parse_poll(&Value::from_json_str("[]").unwrap(), "nb-1");
		assert_eq!(task.status, ResearchStatus::NoResearch);
		assert!(task.task_id.is_empty());
	}

	#[test]
	fn parse_poll_skips_timestamp_rows() {
		let raw = r#"[[[1736000000],["task-3",[null,["q",1],1,[[],""],1]]]]"#;
		let task = parse_poll(&Value::from_json_str(raw).unwrap(), "nb-1");
		assert_eq!(task.task_id, "task-3");
	}

	#[test]
	fn import_row_shapes_web_and_drive() {
		let web = Finding {
			index: 0,
			url: "https://example.com".to_string(),
			title: "Example".to_string(),
			description: String::new(),
			result_type: RESULT_WEB,
		};
		assert_eq!(
			import_row(&web).to_json_string(),
			r#"[null,null,["https://example.com","Example"],null,null,null,null,null,null,null,2]"#
		);

		let doc = Finding {
			index: 1,
			url: "https://docs.google.com/document/d/abc_123/edit".to_string(),
			title: "Doc".to_string(),
			description: String::new(),
			result_type: RESULT_GOOGLE_DOC,
		};
		assert_eq!(
			import_row(&doc).to_json_string(),
			r#"[["abc_123","application/vnd.google-apps.document",1,"Doc"],null,null,null,null,null,null,null,null,null,2]"#
		);
	}

	#[test]
	fn drive_document_id_handles_both_url_shapes() {
		assert_eq!(drive_document_id("https://drive.google.com/open?id=abc123&usp=x"), Some("abc123"));
		assert_eq!(drive_document_id("https://docs.google.com/document/d/a_b-c/edit"), Some("a_b-c"));
		assert_eq!(drive_document_id("https://example.com/"), None);
	}

	#[test]
	fn parse_import_reads_wrapped_rows() {
		let raw = r#"[[[["src-9"],"Imported Title"]]]"#;
		let imported = parse_import(&Value::from_json_str(raw).unwrap());
		assert_eq!(imported.len(), 1);
		assert_eq!(imported[0].id, "src-9");
		assert_eq!(imported[0].title, "Imported Title");
	}
}

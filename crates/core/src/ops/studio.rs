//! Studio content generation: audio/video overviews, infographics, slide
//! decks, flashcards, and quizzes.
//!
//! Creation returns an artifact id with the job still running server-side;
//! [`wait_for_artifact`] drives the generic operation tracker over
//! [`poll_artifacts`] until that artifact leaves the in-progress state and
//! a download URL (where the type has one) is available.

use std::cell::RefCell;
use std::time::Duration;

use nlm_protocol::{RpcCall, Value};
use tracing::{debug, info};

use super::{map_not_found, nested_source_ids, flat_source_ids, opt_integer, opt_string};
use crate::error::{Error, Result};
use crate::lro::{self, JobStatus, PollSchedule};
use crate::session::Session;

const CREATE: &str = "R7cb6c";
const POLL: &str = "gArtLc";
const DELETE: &str = "V5N4be";

/// Wire type codes for studio artifacts.
const TYPE_AUDIO: i64 = 1;
const TYPE_VIDEO: i64 = 3;
const TYPE_STUDY: i64 = 4;
const TYPE_INFOGRAPHIC: i64 = 7;
const TYPE_SLIDE_DECK: i64 = 8;

/// Poll filter excluding the app's own suggested artifacts.
const POLL_FILTER: &str = "NOT artifact.status = \"ARTIFACT_STATUS_SUGGESTED\"";

const FLASHCARD_COUNT_DEFAULT: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
	Audio,
	Video,
	Study,
	Infographic,
	SlideDeck,
	Unknown,
}

impl ArtifactKind {
	fn from_code(code: i64) -> Self {
		match code {
			TYPE_AUDIO => ArtifactKind::Audio,
			TYPE_VIDEO => ArtifactKind::Video,
			TYPE_STUDY => ArtifactKind::Study,
			TYPE_INFOGRAPHIC => ArtifactKind::Infographic,
			TYPE_SLIDE_DECK => ArtifactKind::SlideDeck,
			_ => ArtifactKind::Unknown,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
	InProgress,
	Completed,
	Unknown,
}

impl ArtifactStatus {
	fn from_code(code: i64) -> Self {
		match code {
			1 => ArtifactStatus::InProgress,
			2 | 3 => ArtifactStatus::Completed,
			_ => ArtifactStatus::Unknown,
		}
	}
}

/// One studio artifact as of the last poll.
#[derive(Debug, Clone)]
pub struct Artifact {
	pub id: String,
	pub notebook_id: String,
	pub title: String,
	pub kind: ArtifactKind,
	pub status: ArtifactStatus,
	/// Download URL, present once generation completes (type-dependent).
	pub url: Option<String>,
	pub duration_seconds: Option<i64>,
}

/// Audio overview conversation formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
	DeepDive,
	Brief,
	Critique,
	Debate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLength {
	Short,
	Default,
	Long,
}

#[derive(Debug, Clone)]
pub struct AudioOptions {
	pub format: AudioFormat,
	pub length: AudioLength,
	pub language: String,
	pub focus: String,
}

impl Default for AudioOptions {
	fn default() -> Self {
		Self {
			format: AudioFormat::DeepDive,
			length: AudioLength::Default,
			language: "en".to_string(),
			focus: String::new(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
	Explainer,
	Brief,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStyle {
	AutoSelect,
	Custom,
	Classic,
	Whiteboard,
	Kawaii,
	Anime,
	Watercolor,
	RetroPrint,
	Heritage,
	PaperCraft,
}

#[derive(Debug, Clone)]
pub struct VideoOptions {
	pub format: VideoFormat,
	pub style: VideoStyle,
	pub language: String,
	pub focus: String,
}

impl Default for VideoOptions {
	fn default() -> Self {
		Self {
			format: VideoFormat::Explainer,
			style: VideoStyle::AutoSelect,
			language: "en".to_string(),
			focus: String::new(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
	Landscape,
	Portrait,
	Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
	Concise,
	Standard,
	Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
	DetailedDeck,
	PresenterSlides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideLength {
	Short,
	Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
	Easy,
	Medium,
	Hard,
}

fn audio_format_code(format: AudioFormat) -> i64 {
	match format {
		AudioFormat::DeepDive => 1,
		AudioFormat::Brief => 2,
		AudioFormat::Critique => 3,
		AudioFormat::Debate => 4,
	}
}

fn audio_length_code(length: AudioLength) -> i64 {
	match length {
		AudioLength::Short => 1,
		AudioLength::Default => 2,
		AudioLength::Long => 3,
	}
}

fn video_format_code(format: VideoFormat) -> i64 {
	match format {
		VideoFormat::Explainer => 1,
		VideoFormat::Brief => 2,
	}
}

fn video_style_code(style: VideoStyle) -> i64 {
	match style {
		VideoStyle::AutoSelect => 1,
		VideoStyle::Custom => 2,
		VideoStyle::Classic => 3,
		VideoStyle::Whiteboard => 4,
		VideoStyle::Kawaii => 5,
		VideoStyle::Anime => 6,
		VideoStyle::Watercolor => 7,
		VideoStyle::RetroPrint => 8,
		VideoStyle::Heritage => 9,
		VideoStyle::PaperCraft => 10,
	}
}

fn orientation_code(orientation: Orientation) -> i64 {
	match orientation {
		Orientation::Landscape => 1,
		Orientation::Portrait => 2,
		Orientation::Square => 3,
	}
}

fn detail_code(detail: DetailLevel) -> i64 {
	match detail {
		DetailLevel::Concise => 1,
		DetailLevel::Standard => 2,
		DetailLevel::Detailed => 3,
	}
}

fn slide_format_code(format: SlideFormat) -> i64 {
	match format {
		SlideFormat::DetailedDeck => 1,
		SlideFormat::PresenterSlides => 2,
	}
}

fn slide_length_code(length: SlideLength) -> i64 {
	match length {
		SlideLength::Short => 1,
		SlideLength::Default => 3,
	}
}

fn difficulty_code(difficulty: Difficulty) -> i64 {
	match difficulty {
		Difficulty::Easy => 1,
		Difficulty::Medium => 2,
		Difficulty::Hard => 3,
	}
}

/// A freshly created artifact; generation continues server-side.
#[derive(Debug, Clone)]
pub struct CreatedArtifact {
	pub id: String,
	pub notebook_id: String,
	pub status: ArtifactStatus,
}

pub async fn create_audio(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	options: &AudioOptions,
) -> Result<CreatedArtifact> {
	require_sources(source_ids)?;

	// Audio options tree: focus, length, sources, language, format.
	let audio_options = Value::seq([
		Value::Null,
		Value::seq([
			Value::from(options.focus.as_str()),
			Value::from(audio_length_code(options.length)),
			Value::Null,
			flat_source_ids(source_ids),
			Value::from(options.language.as_str()),
			Value::Null,
			Value::from(audio_format_code(options.format)),
		]),
	]);
	let content = Value::seq([
		Value::Null,
		Value::Null,
		Value::from(TYPE_AUDIO),
		nested_source_ids(source_ids),
		Value::Null,
		Value::Null,
		audio_options,
	]);

	create(session, notebook_id, content, "audio").await
}

pub async fn create_video(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	options: &VideoOptions,
) -> Result<CreatedArtifact> {
	require_sources(source_ids)?;

	let video_options = Value::seq([
		Value::Null,
		Value::Null,
		Value::seq([
			flat_source_ids(source_ids),
			Value::from(options.language.as_str()),
			Value::from(options.focus.as_str()),
			Value::Null,
			Value::from(video_format_code(options.format)),
			Value::from(video_style_code(options.style)),
		]),
	]);
	let mut content = vec![
		Value::Null,
		Value::Null,
		Value::from(TYPE_VIDEO),
		nested_source_ids(source_ids),
	];
	content.extend(std::iter::repeat_n(Value::Null, 4));
	content.push(video_options);

	create(session, notebook_id, Value::Seq(content), "video").await
}

pub async fn create_infographic(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	orientation: Orientation,
	detail: DetailLevel,
	language: &str,
	focus: Option<&str>,
) -> Result<CreatedArtifact> {
	require_sources(source_ids)?;

	let infographic_options = Value::seq([Value::seq([
		Value::from(focus),
		Value::from(language),
		Value::Null,
		Value::from(orientation_code(orientation)),
		Value::from(detail_code(detail)),
	])]);
	// Options live at slot 14.
	let mut content = vec![
		Value::Null,
		Value::Null,
		Value::from(TYPE_INFOGRAPHIC),
		nested_source_ids(source_ids),
	];
	content.extend(std::iter::repeat_n(Value::Null, 10));
	content.push(infographic_options);

	create(session, notebook_id, Value::Seq(content), "infographic").await
}

pub async fn create_slides(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	format: SlideFormat,
	length: SlideLength,
	language: &str,
	focus: Option<&str>,
) -> Result<CreatedArtifact> {
	require_sources(source_ids)?;

	let slide_options = Value::seq([Value::seq([
		Value::from(focus),
		Value::from(language),
		Value::from(slide_format_code(format)),
		Value::from(slide_length_code(length)),
	])]);
	// Options live at slot 16.
	let mut content = vec![
		Value::Null,
		Value::Null,
		Value::from(TYPE_SLIDE_DECK),
		nested_source_ids(source_ids),
	];
	content.extend(std::iter::repeat_n(Value::Null, 12));
	content.push(slide_options);

	create(session, notebook_id, Value::Seq(content), "slide deck").await
}

pub async fn create_flashcards(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	difficulty: Difficulty,
) -> Result<CreatedArtifact> {
	require_sources(source_ids)?;
	// Format code 1 selects flashcards within the shared study type.
	let deck = Value::seq([Value::from(difficulty_code(difficulty)), Value::from(FLASHCARD_COUNT_DEFAULT)]);
	let study_options = Value::seq([
		Value::Null,
		Value::seq([
			Value::from(1),
			Value::Null,
			Value::Null,
			Value::Null,
			Value::Null,
			Value::Null,
			deck,
		]),
	]);
	create_study(session, notebook_id, source_ids, study_options, "flashcards").await
}

pub async fn create_quiz(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	question_count: i64,
	difficulty: Difficulty,
) -> Result<CreatedArtifact> {
	require_sources(source_ids)?;
	// Format code 2 selects a quiz; its tuning sits one slot further out
	// than the flashcard deck.
	let quiz = Value::seq([Value::from(question_count), Value::from(difficulty_code(difficulty))]);
	let study_options = Value::seq([
		Value::Null,
		Value::seq([
			Value::from(2),
			Value::Null,
			Value::Null,
			Value::Null,
			Value::Null,
			Value::Null,
			Value::Null,
			quiz,
		]),
	]);
	create_study(session, notebook_id, source_ids, study_options, "quiz").await
}

async fn create_study(
	session: &mut Session,
	notebook_id: &str,
	source_ids: &[String],
	study_options: Value,
	label: &'static str,
) -> Result<CreatedArtifact> {
	// Study options live at slot 9.
	let mut content = vec![
		Value::Null,
		Value::Null,
		Value::from(TYPE_STUDY),
		nested_source_ids(source_ids),
	];
	content.extend(std::iter::repeat_n(Value::Null, 5));
	content.push(study_options);

	create(session, notebook_id, Value::Seq(content), label).await
}

async fn create(session: &mut Session, notebook_id: &str, content: Value, label: &'static str) -> Result<CreatedArtifact> {
	info!(target = "nlm", notebook_id, kind = label, "creating studio artifact");
	let params = Value::seq([Value::seq([Value::from(2)]), Value::from(notebook_id), content]);
	let result = session
		.call_rpc(&RpcCall::new(CREATE, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;

	let row = result.get(0)?;
	let id = row.get(0)?.str()?.to_string();
	let status = opt_integer(row, 4).map(ArtifactStatus::from_code).unwrap_or(ArtifactStatus::InProgress);
	info!(target = "nlm", artifact = id, "studio artifact created");

	Ok(CreatedArtifact {
		id,
		notebook_id: notebook_id.to_string(),
		status,
	})
}

/// Lists the notebook's artifacts with their current status and, where
/// complete, download URLs.
pub async fn poll_artifacts(session: &mut Session, notebook_id: &str) -> Result<Vec<Artifact>> {
	debug!(target = "nlm", notebook_id, "polling studio artifacts");
	let params = Value::seq([Value::seq([Value::from(2)]), Value::from(notebook_id), Value::from(POLL_FILTER)]);
	let result = session
		.call_rpc(&RpcCall::new(POLL, params))
		.await
		.map_err(|e| map_not_found(e, "notebook", notebook_id))?;

	let rows = match result.get_opt(0) {
		Some(Value::Seq(_)) => result.get(0)?.elements()?.to_vec(),
		_ => match result.elements() {
			Ok(rows) => rows.to_vec(),
			Err(_) => return Ok(Vec::new()),
		},
	};
	Ok(rows.iter().filter_map(|row| parse_artifact(row, notebook_id).ok()).collect())
}

/// Deletes an artifact. Irreversible.
pub async fn delete(session: &mut Session, artifact_id: &str) -> Result<()> {
	info!(target = "nlm", artifact_id, "deleting studio artifact");
	let params = Value::seq([Value::seq([Value::from(2)]), Value::from(artifact_id)]);
	session
		.call_rpc(&RpcCall::new(DELETE, params))
		.await
		.map_err(|e| map_not_found(e, "artifact", artifact_id))?;
	Ok(())
}

/// Polls until the artifact completes, on the given schedule. A deadline
/// pass resolves to a timeout error — the artifact may still finish
/// server-side afterwards.
pub async fn wait_for_artifact(
	session: &mut Session,
	notebook_id: &str,
	artifact_id: &str,
	schedule: &PollSchedule,
	timeout: Duration,
) -> Result<Artifact> {
	let cell = RefCell::new(session);
	lro::wait(
		|| async {
			let mut session = cell.borrow_mut();
			let artifacts = poll_artifacts(&mut session, notebook_id).await?;
			Ok(match artifacts.into_iter().find(|a| a.id == artifact_id) {
				Some(artifact) if artifact.status == ArtifactStatus::Completed => JobStatus::Done(artifact),
				// Not listed yet or still generating: keep polling.
				_ => JobStatus::Running,
			})
		},
		schedule,
		timeout,
	)
	.await
}

/// Artifact row: `[id, title, type_code, _, status_code, ...]` with
/// type-specific URL locations further out.
fn parse_artifact(row: &Value, notebook_id: &str) -> Result<Artifact> {
	let id = row.get(0)?.str()?.to_string();
	let title = opt_string(row, 1).unwrap_or_default();
	let type_code = opt_integer(row, 2).unwrap_or(0);
	let kind = ArtifactKind::from_code(type_code);
	let status = opt_integer(row, 4).map(ArtifactStatus::from_code).unwrap_or(ArtifactStatus::Unknown);

	let mut url = None;
	let mut duration_seconds = None;
	match kind {
		ArtifactKind::Audio => {
			if let Some(options) = row.get_opt(6) {
				url = opt_string(options, 3);
				duration_seconds = options.get_opt(9).and_then(|d| opt_integer(d, 0));
			}
		}
		ArtifactKind::Video => {
			if let Some(options) = row.get_opt(8) {
				url = opt_string(options, 3);
			}
		}
		ArtifactKind::Infographic => {
			// Image URL nested at [14][2][0][1][0].
			url = row
				.get_opt(14)
				.and_then(|o| o.get_opt(2))
				.and_then(|images| images.get_opt(0))
				.and_then(|first| first.get_opt(1))
				.and_then(|details| opt_string(details, 0))
				.filter(|u| u.starts_with("http"));
		}
		ArtifactKind::SlideDeck => {
			if let Some(options) = row.get_opt(16) {
				url = opt_string(options, 0)
					.filter(|u| u.starts_with("http"))
					.or_else(|| opt_string(options, 3));
			}
		}
		ArtifactKind::Study | ArtifactKind::Unknown => {}
	}

	Ok(Artifact {
		id,
		notebook_id: notebook_id.to_string(),
		title,
		kind,
		status,
		url,
		duration_seconds,
	})
}

fn require_sources(source_ids: &[String]) -> Result<()> {
	if source_ids.is_empty() {
		Err(Error::InvalidInput("at least one source id is required".to_string()))
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_artifact_reads_audio_url_and_duration() {
		let raw = r#"["art-1","Overview",1,null,3,null,[null,null,null,"https://x/artifact.mp3",null,null,null,null,null,[185]]]"#;
		let artifact = parse_artifact(&Value::from_json_str(raw).unwrap(), "nb-1").unwrap();

		assert_eq!(artifact.kind, ArtifactKind::Audio);
		assert_eq!(artifact.status, ArtifactStatus::Completed);
		assert_eq!(artifact.url.as_deref(), Some("https://x/artifact.mp3"));
		assert_eq!(artifact.duration_seconds, Some(185));
	}

	#[test]
	fn parse_artifact_reads_video_url() {
		let raw = r#"["art-2","Video",3,null,3,null,null,null,[null,null,null,"https://x/v.mp4"]]"#;
		let artifact = parse_artifact(&Value::from_json_str(raw).unwrap(), "nb-1").unwrap();
		assert_eq!(artifact.kind, ArtifactKind::Video);
		assert_eq!(artifact.url.as_deref(), Some("https://x/v.mp4"));
	}

	#[test]
	fn parse_artifact_in_progress_has_no_url() {
		let raw = r#"["art-3","Pending",1,null,1]"#;
		let artifact = parse_artifact(&Value::from_json_str(raw).unwrap(), "nb-1").unwrap();
		assert_eq!(artifact.status, ArtifactStatus::InProgress);
		assert!(artifact.url.is_none());
	}

	#[test]
	fn parse_artifact_unknown_status_code() {
		let raw = r#"["art-4","Odd",2,null,99]"#;
		let artifact = parse_artifact(&Value::from_json_str(raw).unwrap(), "nb-1").unwrap();
		assert_eq!(artifact.status, ArtifactStatus::Unknown);
	}

	#[test]
	fn status_codes_map_like_the_wire() {
		assert_eq!(ArtifactStatus::from_code(1), ArtifactStatus::InProgress);
		assert_eq!(ArtifactStatus::from_code(2), ArtifactStatus::Completed);
		assert_eq!(ArtifactStatus::from_code(3), ArtifactStatus::Completed);
		assert_eq!(ArtifactStatus::from_code(99), ArtifactStatus::Unknown);
	}

	#[test]
	fn require_sources_rejects_empty() {
		assert!(matches!(require_sources(&[]), Err(Error::InvalidInput(_))));
		assert!(require_sources(&["s".to_string()]).is_ok());
	}
}

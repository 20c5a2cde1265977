use std::time::Duration;

use colored::Colorize;
use nlm::Client;
use nlm::ops::studio::{
	ArtifactStatus, AudioFormat, AudioLength, AudioOptions, VideoFormat, VideoOptions, VideoStyle,
};

use crate::cli::StudioCommand;

pub async fn run(client: &mut Client, command: StudioCommand) -> anyhow::Result<()> {
	match command {
		StudioCommand::Audio {
			notebook_id,
			source,
			format,
			length,
			language,
			timeout,
		} => {
			let options = AudioOptions {
				format: parse_audio_format(&format)?,
				length: parse_audio_length(&length)?,
				language,
				focus: String::new(),
			};
			let source_ids = resolve_sources(client, &notebook_id, source).await?;
			client.options_mut().operation_timeout = Duration::from_secs(timeout);

			let created = client.create_audio(&notebook_id, &source_ids, &options).await?;
			println!("generation started (artifact {})", created.id.dimmed());

			let artifact = client.wait_for_artifact(&notebook_id, &created.id).await?;
			report_done(&artifact.title, artifact.url.as_deref());
			if let Some(seconds) = artifact.duration_seconds {
				println!("  duration: {}m{:02}s", seconds / 60, seconds % 60);
			}
			Ok(())
		}
		StudioCommand::Video {
			notebook_id,
			source,
			format,
			style,
			language,
			timeout,
		} => {
			let options = VideoOptions {
				format: parse_video_format(&format)?,
				style: parse_video_style(&style)?,
				language,
				focus: String::new(),
			};
			let source_ids = resolve_sources(client, &notebook_id, source).await?;
			client.options_mut().operation_timeout = Duration::from_secs(timeout);

			let created = client.create_video(&notebook_id, &source_ids, &options).await?;
			println!("generation started (artifact {})", created.id.dimmed());

			let artifact = client.wait_for_artifact(&notebook_id, &created.id).await?;
			report_done(&artifact.title, artifact.url.as_deref());
			Ok(())
		}
		StudioCommand::Status { notebook_id } => {
			let artifacts = client.poll_artifacts(&notebook_id).await?;
			if artifacts.is_empty() {
				println!("no artifacts");
				return Ok(());
			}
			for artifact in artifacts {
				let status = match artifact.status {
					ArtifactStatus::Completed => "completed".green(),
					ArtifactStatus::InProgress => "in progress".yellow(),
					ArtifactStatus::Unknown => "unknown".dimmed(),
				};
				let url = artifact.url.as_deref().unwrap_or("-");
				println!("{}  {:?}  {}  {}  {}", artifact.id.dimmed(), artifact.kind, status, artifact.title, url.dimmed());
			}
			Ok(())
		}
		StudioCommand::Rm { artifact_id } => {
			client.delete_artifact(&artifact_id).await?;
			println!("{} deleted {artifact_id}", "ok:".green().bold());
			Ok(())
		}
	}
}

/// Explicit `--source` ids, or every source in the notebook.
async fn resolve_sources(client: &mut Client, notebook_id: &str, explicit: Vec<String>) -> anyhow::Result<Vec<String>> {
	if !explicit.is_empty() {
		return Ok(explicit);
	}
	let notebook = client.get_notebook(notebook_id).await?;
	let ids: Vec<String> = notebook.sources.into_iter().map(|s| s.id).collect();
	if ids.is_empty() {
		anyhow::bail!("notebook {notebook_id} has no sources; add some first");
	}
	Ok(ids)
}

fn report_done(title: &str, url: Option<&str>) {
	println!("{} generated {}", "ok:".green().bold(), title.bold());
	match url {
		Some(url) => println!("  url: {url}"),
		None => println!("  no download url exposed for this artifact type"),
	}
}

fn parse_audio_format(raw: &str) -> anyhow::Result<AudioFormat> {
	Ok(match raw {
		"deep-dive" => AudioFormat::DeepDive,
		"brief" => AudioFormat::Brief,
		"critique" => AudioFormat::Critique,
		"debate" => AudioFormat::Debate,
		other => anyhow::bail!("unknown audio format '{other}' (deep-dive, brief, critique, debate)"),
	})
}

fn parse_audio_length(raw: &str) -> anyhow::Result<AudioLength> {
	Ok(match raw {
		"short" => AudioLength::Short,
		"default" => AudioLength::Default,
		"long" => AudioLength::Long,
		other => anyhow::bail!("unknown audio length '{other}' (short, default, long)"),
	})
}

fn parse_video_format(raw: &str) -> anyhow::Result<VideoFormat> {
	Ok(match raw {
		"explainer" => VideoFormat::Explainer,
		"brief" => VideoFormat::Brief,
		other => anyhow::bail!("unknown video format '{other}' (explainer, brief)"),
	})
}

fn parse_video_style(raw: &str) -> anyhow::Result<VideoStyle> {
	Ok(match raw {
		"auto-select" => VideoStyle::AutoSelect,
		"custom" => VideoStyle::Custom,
		"classic" => VideoStyle::Classic,
		"whiteboard" => VideoStyle::Whiteboard,
		"kawaii" => VideoStyle::Kawaii,
		"anime" => VideoStyle::Anime,
		"watercolor" => VideoStyle::Watercolor,
		"retro-print" => VideoStyle::RetroPrint,
		"heritage" => VideoStyle::Heritage,
		"paper-craft" => VideoStyle::PaperCraft,
		other => anyhow::bail!("unknown video style '{other}'"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn audio_format_strings_round_trip() {
		assert_eq!(parse_audio_format("deep-dive").unwrap(), AudioFormat::DeepDive);
		assert_eq!(parse_audio_format("debate").unwrap(), AudioFormat::Debate);
		assert!(parse_audio_format("polka").is_err());
	}

	#[test]
	fn video_style_strings_round_trip() {
		assert_eq!(parse_video_style("whiteboard").unwrap(), VideoStyle::Whiteboard);
		assert_eq!(parse_video_style("paper-craft").unwrap(), VideoStyle::PaperCraft);
		assert!(parse_video_style("cubist").is_err());
	}
}

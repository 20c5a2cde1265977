use colored::Colorize;
use nlm::Client;

use crate::cli::SourceCommand;

pub async fn run(client: &mut Client, command: SourceCommand) -> anyhow::Result<()> {
	match command {
		SourceCommand::AddUrl { notebook_id, url } => {
			let source = client.add_url_source(&notebook_id, &url).await?;
			report_added(&source);
			Ok(())
		}
		SourceCommand::AddYoutube { notebook_id, url } => {
			let source = client.add_youtube_source(&notebook_id, &url).await?;
			report_added(&source);
			Ok(())
		}
		SourceCommand::AddText {
			notebook_id,
			content,
			title,
		} => {
			let source = client.add_text_source(&notebook_id, &content, title.as_deref()).await?;
			report_added(&source);
			Ok(())
		}
		SourceCommand::AddDrive { notebook_id, document_id } => {
			let source = client.add_drive_source(&notebook_id, &document_id).await?;
			report_added(&source);
			Ok(())
		}
		SourceCommand::Rm { notebook_id, source_id } => {
			client.delete_source(&notebook_id, &source_id).await?;
			println!("{} deleted {source_id}", "ok:".green().bold());
			Ok(())
		}
	}
}

fn report_added(source: &nlm::ops::sources::Source) {
	println!(
		"{} added {} ({}, {:?})",
		"ok:".green().bold(),
		source.title.bold(),
		source.id,
		source.status
	);
}

use colored::Colorize;
use nlm::Client;

use crate::cli::NotebookCommand;

pub async fn run(client: &mut Client, command: NotebookCommand) -> anyhow::Result<()> {
	match command {
		NotebookCommand::List => {
			let notebooks = client.list_notebooks().await?;
			if notebooks.is_empty() {
				println!("no notebooks");
				return Ok(());
			}
			for notebook in notebooks {
				println!("{}  {} ({} sources)", notebook.id.dimmed(), notebook.title.bold(), notebook.source_count());
			}
			Ok(())
		}
		NotebookCommand::Create { title } => {
			let notebook = client.create_notebook(&title).await?;
			println!("{} created {} ({})", "ok:".green().bold(), notebook.title.bold(), notebook.id);
			Ok(())
		}
		NotebookCommand::Show { notebook_id } => {
			let notebook = client.get_notebook(&notebook_id).await?;
			println!("{} ({})", notebook.title.bold(), notebook.id);
			if notebook.sources.is_empty() {
				println!("  no sources");
			}
			for source in &notebook.sources {
				let url = source.url.as_deref().unwrap_or("-");
				println!("  {}  {:?}  {}  {}", source.id.dimmed(), source.status, source.title, url.dimmed());
			}
			Ok(())
		}
		NotebookCommand::Rename { notebook_id, new_title } => {
			client.rename_notebook(&notebook_id, &new_title).await?;
			println!("{} renamed {notebook_id} to {new_title}", "ok:".green().bold());
			Ok(())
		}
		NotebookCommand::Rm { notebook_id } => {
			client.delete_notebook(&notebook_id).await?;
			println!("{} deleted {notebook_id}", "ok:".green().bold());
			Ok(())
		}
	}
}

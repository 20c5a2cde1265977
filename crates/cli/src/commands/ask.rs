use colored::Colorize;
use nlm::Client;

pub async fn run(client: &mut Client, notebook_id: &str, question: &str) -> anyhow::Result<()> {
	let notebook = client.get_notebook(notebook_id).await?;
	let source_ids: Vec<String> = notebook.sources.iter().map(|s| s.id.clone()).collect();
	if source_ids.is_empty() {
		anyhow::bail!("notebook {notebook_id} has no sources to answer from");
	}

	let answer = client.ask(notebook_id, question, &source_ids).await?;
	if answer.text.is_empty() {
		println!("{} the notebook returned no answer", "--".yellow().bold());
		return Ok(());
	}
	if !answer.is_final {
		println!("{}", "(interim output; the final answer did not arrive)".dimmed());
	}
	println!("{}", answer.text);
	Ok(())
}

use std::time::Duration;

use colored::Colorize;
use nlm::Client;
use nlm::ops::research::{ResearchMode, ResearchScope, ResearchStatus};

pub async fn run(
	client: &mut Client,
	notebook_id: &str,
	query: &str,
	deep: bool,
	drive: bool,
	import: Option<usize>,
	timeout: u64,
) -> anyhow::Result<()> {
	let mode = if deep { ResearchMode::Deep } else { ResearchMode::Fast };
	let scope = if drive { ResearchScope::Drive } else { ResearchScope::Web };
	client.options_mut().operation_timeout = Duration::from_secs(timeout);

	let started = client.start_research(notebook_id, query, scope, mode).await?;
	println!("research started (task {})", started.task_id.dimmed());

	let task = client.wait_for_research(notebook_id).await?;

	match task.status {
		ResearchStatus::NoResearch => {
			println!("{} no research task found for this notebook", "--".yellow().bold());
			return Ok(());
		}
		ResearchStatus::InProgress | ResearchStatus::Completed => {}
	}

	if !task.summary.is_empty() {
		println!("\n{}\n{}", "summary".bold(), task.summary);
	}
	if !task.report.is_empty() {
		println!("\n{}\n{}", "report".bold(), task.report);
	}
	println!("\n{} ({})", "findings".bold(), task.findings.len());
	for finding in &task.findings {
		println!("  {:>2}. {} {}", finding.index + 1, finding.title.bold(), finding.url.dimmed());
	}

	if let Some(count) = import {
		let chosen: Vec<_> = task.findings.iter().filter(|f| f.importable()).take(count).cloned().collect();
		if chosen.is_empty() {
			println!("\n{} nothing importable among the findings", "--".yellow().bold());
			return Ok(());
		}
		let imported = client.import_research(notebook_id, &task.task_id, &chosen).await?;
		println!("\n{} imported {} sources", "ok:".green().bold(), imported.len());
		for source in imported {
			println!("  {}  {}", source.id.dimmed(), source.title);
		}
	}

	Ok(())
}

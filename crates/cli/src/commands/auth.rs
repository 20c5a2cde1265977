use std::time::Duration;

use colored::Colorize;
use nlm::Client;

use crate::cli::AuthCommand;

pub async fn run(client: &mut Client, command: AuthCommand) -> anyhow::Result<()> {
	match command {
		AuthCommand::Login { timeout } => {
			let set = client.login(Duration::from_secs(timeout)).await?;
			println!("{} signed in ({} cookies captured)", "ok:".green().bold(), set.cookies.len());
			println!("  credentials: {}", client.store().path().display());
			Ok(())
		}
		AuthCommand::Status => {
			match client.store().load() {
				Ok(set) => {
					println!("{} authenticated", "ok:".green().bold());
					println!("  credentials: {}", client.store().path().display());
					println!("  saved: {} ({} days ago)", set.saved_at.format("%Y-%m-%d %H:%M UTC"), set.age().num_days());
					if set.is_stale(chrono_days(14)) {
						println!("  {}", "credentials are stale; consider `nlm auth login`".yellow());
					}
				}
				Err(err) => {
					println!("{} not authenticated ({err})", "--".yellow().bold());
					println!("  run `nlm auth login` to sign in");
				}
			}
			Ok(())
		}
		AuthCommand::Logout => {
			client.logout()?;
			println!("{} signed out", "ok:".green().bold());
			Ok(())
		}
	}
}

fn chrono_days(days: i64) -> chrono::Duration {
	chrono::Duration::days(days)
}

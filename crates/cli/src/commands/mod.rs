//! Command dispatch: one module per domain, all driving the same client.

mod ask;
mod auth;
mod notebooks;
mod research;
mod sources;
mod studio;

use nlm::{Client, ClientOptions};

use crate::cli::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	let mut options = ClientOptions::default();
	options.store_path = cli.auth_file;
	options.session.auto_refresh = cli.auto_refresh;
	options.launch.headless = !cli.headful;

	let mut client = Client::with_options(options);
	let result = run(&mut client, cli.command).await;
	// Release the browser on success and failure alike.
	let _ = client.close().await;
	result
}

async fn run(client: &mut Client, command: Command) -> anyhow::Result<()> {
	match command {
		Command::Auth(cmd) => auth::run(client, cmd).await,
		Command::Notebooks(cmd) => notebooks::run(client, cmd).await,
		Command::Sources(cmd) => sources::run(client, cmd).await,
		Command::Research {
			notebook_id,
			query,
			deep,
			drive,
			import,
			timeout,
		} => research::run(client, &notebook_id, &query, deep, drive, import, timeout).await,
		Command::Studio(cmd) => studio::run(client, cmd).await,
		Command::Ask { notebook_id, question } => ask::run(client, &notebook_id, &question).await,
	}
}

use clap::Parser;
use colored::Colorize;
use nlm_cli::{cli::Cli, commands, logging};
use nlm::Error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		print_error(&err);
		std::process::exit(1);
	}
}

fn print_error(err: &anyhow::Error) {
	eprintln!("{} {}", "error:".red().bold(), err);

	// Actionable guidance for the failure classes a user can do something
	// about; everything else stands on its structured message.
	match err.downcast_ref::<Error>() {
		Some(Error::Authentication(_)) => {
			eprintln!("{}", "run `nlm auth login` to re-authenticate".yellow());
		}
		Some(Error::OperationTimeout { .. }) => {
			eprintln!(
				"{}",
				"the remote job may still be running; check again later with the poll command".yellow()
			);
		}
		Some(Error::RateLimited { .. }) => {
			eprintln!("{}", "the service is throttling requests; wait before retrying".yellow());
		}
		_ => {}
	}
}

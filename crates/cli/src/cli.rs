//! Argument surface for the `nlm` binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "nlm", version, about = "Drive NotebookLM from the command line")]
pub struct Cli {
	/// Increase log verbosity (-v info, -vv debug).
	#[arg(short, long, action = ArgAction::Count, global = true)]
	pub verbose: u8,

	/// Credential file (default: ~/.nlm/auth.json).
	#[arg(long, global = true, value_name = "FILE")]
	pub auth_file: Option<PathBuf>,

	/// Re-login transparently when the session is rejected mid-call.
	#[arg(long, global = true)]
	pub auto_refresh: bool,

	/// Run the browser with a visible window.
	#[arg(long, global = true)]
	pub headful: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Manage authentication state.
	#[command(subcommand)]
	Auth(AuthCommand),

	/// Notebook operations.
	#[command(subcommand)]
	Notebooks(NotebookCommand),

	/// Source operations.
	#[command(subcommand)]
	Sources(SourceCommand),

	/// Run research and optionally import the findings.
	Research {
		notebook_id: String,
		query: String,
		/// Comprehensive (slow) research instead of the fast pass.
		#[arg(long)]
		deep: bool,
		/// Search Google Drive instead of the web.
		#[arg(long)]
		drive: bool,
		/// Import the top N findings into the notebook when done.
		#[arg(long, value_name = "N")]
		import: Option<usize>,
		/// Overall deadline in seconds.
		#[arg(long, default_value_t = 300)]
		timeout: u64,
	},

	/// Generate studio content.
	#[command(subcommand)]
	Studio(StudioCommand),

	/// Ask the notebook a question.
	Ask { notebook_id: String, question: String },
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
	/// Sign in interactively and save credentials.
	Login {
		/// Seconds to wait for the sign-in to complete.
		#[arg(long, default_value_t = 300)]
		timeout: u64,
	},
	/// Show authentication status.
	Status,
	/// Remove saved credentials.
	Logout,
}

#[derive(Debug, Subcommand)]
pub enum NotebookCommand {
	/// List notebooks.
	List,
	/// Create a notebook.
	Create { title: String },
	/// Show a notebook and its sources.
	Show { notebook_id: String },
	/// Rename a notebook.
	Rename { notebook_id: String, new_title: String },
	/// Delete a notebook.
	Rm { notebook_id: String },
}

#[derive(Debug, Subcommand)]
pub enum SourceCommand {
	/// Add a web page source.
	AddUrl { notebook_id: String, url: String },
	/// Add a YouTube video source.
	AddYoutube { notebook_id: String, url: String },
	/// Add a plain-text source.
	AddText {
		notebook_id: String,
		content: String,
		#[arg(long)]
		title: Option<String>,
	},
	/// Add a Google Drive document source.
	AddDrive { notebook_id: String, document_id: String },
	/// Delete a source.
	Rm { notebook_id: String, source_id: String },
}

#[derive(Debug, Subcommand)]
pub enum StudioCommand {
	/// Generate an audio overview and wait for the download URL.
	Audio {
		notebook_id: String,
		/// Source ids to include (defaults to every source).
		#[arg(long, value_name = "ID")]
		source: Vec<String>,
		#[arg(long, default_value = "deep-dive")]
		format: String,
		#[arg(long, default_value = "default")]
		length: String,
		#[arg(long, default_value = "en")]
		language: String,
		#[arg(long, default_value_t = 600)]
		timeout: u64,
	},
	/// Generate a video overview and wait for the download URL.
	Video {
		notebook_id: String,
		#[arg(long, value_name = "ID")]
		source: Vec<String>,
		#[arg(long, default_value = "explainer")]
		format: String,
		#[arg(long, default_value = "auto-select")]
		style: String,
		#[arg(long, default_value = "en")]
		language: String,
		#[arg(long, default_value_t = 600)]
		timeout: u64,
	},
	/// List artifacts and their status.
	Status { notebook_id: String },
	/// Delete an artifact.
	Rm { artifact_id: String },
}

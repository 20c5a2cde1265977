//! High-level client facade.
//!
//! [`Client`] ties the pieces together: it loads credentials from the
//! store, opens a session lazily on first use (launching a browser or
//! drawing one from a pool), and exposes the operation catalog as plain
//! methods. One client owns at most one session; pooled deployments share
//! a [`DriverPool`] across clients.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use nlm_protocol::Value;
use tracing::debug;

use crate::auth::{CredentialSet, CredentialStore};
use crate::browser::{ChromiumDriver, Driver, DriverPool, LaunchOptions};
use crate::config::SessionOptions;
use crate::error::{Error, Result};
use crate::login;
use crate::lro::PollSchedule;
use crate::ops::{chat, notebooks, research, sources, studio};
use crate::session::{Reauthenticate, Session};

/// Everything a client needs, as plain values.
#[derive(Debug, Clone)]
pub struct ClientOptions {
	/// Credential file location; defaults to `~/.nlm/auth.json`.
	pub store_path: Option<PathBuf>,
	pub session: SessionOptions,
	pub launch: LaunchOptions,
	/// Poll backoff for long-running operations.
	pub poll: PollSchedule,
	/// Overall deadline for long-running operations.
	pub operation_timeout: Duration,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			store_path: None,
			session: SessionOptions::default(),
			launch: LaunchOptions::default(),
			poll: PollSchedule::default(),
			operation_timeout: Duration::from_secs(300),
		}
	}
}

/// Re-login hook backed by the credential store: refresh cookies in a
/// throwaway headless browser and persist the replacement set.
struct StoreRefresh {
	store: CredentialStore,
	launch: LaunchOptions,
}

#[async_trait]
impl Reauthenticate for StoreRefresh {
	async fn reauthenticate(&self) -> Result<CredentialSet> {
		let current = self.store.load()?;
		let driver = ChromiumDriver::launch(&self.launch).await?;
		let refreshed = login::refresh_credentials(&driver, &current).await;
		let _ = driver.close().await;

		let fresh = refreshed?;
		self.store.save(&fresh)?;
		Ok(fresh)
	}
}

pub struct Client {
	store: CredentialStore,
	options: ClientOptions,
	pool: Option<DriverPool>,
	session: Option<Session>,
}

impl Client {
	pub fn new() -> Self {
		Self::with_options(ClientOptions::default())
	}

	pub fn with_options(options: ClientOptions) -> Self {
		let store = CredentialStore::new(
			options.store_path.clone().unwrap_or_else(CredentialStore::default_path),
		);
		Self {
			store,
			options,
			pool: None,
			session: None,
		}
	}

	/// Draws browser drivers from `pool` instead of launching per client.
	pub fn with_pool(mut self, pool: DriverPool) -> Self {
		self.pool = Some(pool);
		self
	}

	pub fn store(&self) -> &CredentialStore {
		&self.store
	}

	/// Tuning knobs, adjustable until the session is opened (session
	/// options are captured at open time; poll/timeout apply per call).
	pub fn options_mut(&mut self) -> &mut ClientOptions {
		&mut self.options
	}

	pub fn is_authenticated(&self) -> bool {
		self.store.load().is_ok()
	}

	/// The live session, opened on first use.
	pub async fn session(&mut self) -> Result<&mut Session> {
		if self.session.is_none() {
			let credentials = self.store.load()?;
			let driver: Box<dyn Driver> = match &self.pool {
				Some(pool) => Box::new(pool.acquire().await?),
				None => Box::new(ChromiumDriver::launch(&self.options.launch).await?),
			};
			let reauth: Option<Box<dyn Reauthenticate>> = if self.options.session.auto_refresh {
				Some(Box::new(StoreRefresh {
					store: self.store.clone(),
					launch: self.options.launch.clone(),
				}))
			} else {
				None
			};
			let session =
				Session::open_with_reauth(driver, credentials, self.options.session.clone(), reauth).await?;
			self.session = Some(session);
		}
		match self.session.as_mut() {
			Some(session) => Ok(session),
			None => Err(Error::Session("session unavailable".to_string())),
		}
	}

	/// Closes the session, releasing its driver (back to the pool when
	/// pooled).
	pub async fn close(&mut self) -> Result<()> {
		if let Some(session) = self.session.take() {
			session.close().await?;
		}
		Ok(())
	}

	/// Interactive sign-in in a headful browser; persists the captured
	/// credentials.
	pub async fn login(&mut self, timeout: Duration) -> Result<CredentialSet> {
		let mut launch = self.options.launch.clone();
		launch.headless = false;
		let driver = ChromiumDriver::launch(&launch).await?;
		let captured = login::interactive_login(&driver, timeout).await;
		let _ = driver.close().await;

		let set = captured?;
		self.store.save(&set)?;
		Ok(set)
	}

	pub fn logout(&self) -> Result<()> {
		self.store.clear()
	}

	// Notebooks

	pub async fn list_notebooks(&mut self) -> Result<Vec<notebooks::Notebook>> {
		notebooks::list(self.session().await?).await
	}

	pub async fn create_notebook(&mut self, title: &str) -> Result<notebooks::Notebook> {
		notebooks::create(self.session().await?, title).await
	}

	pub async fn get_notebook(&mut self, notebook_id: &str) -> Result<notebooks::Notebook> {
		notebooks::get(self.session().await?, notebook_id).await
	}

	pub async fn rename_notebook(&mut self, notebook_id: &str, new_title: &str) -> Result<()> {
		notebooks::rename(self.session().await?, notebook_id, new_title).await
	}

	pub async fn delete_notebook(&mut self, notebook_id: &str) -> Result<()> {
		notebooks::delete(self.session().await?, notebook_id).await
	}

	// Sources

	pub async fn add_url_source(&mut self, notebook_id: &str, url: &str) -> Result<sources::Source> {
		sources::add_url(self.session().await?, notebook_id, url).await
	}

	pub async fn add_youtube_source(&mut self, notebook_id: &str, url: &str) -> Result<sources::Source> {
		sources::add_youtube(self.session().await?, notebook_id, url).await
	}

	pub async fn add_text_source(
		&mut self,
		notebook_id: &str,
		content: &str,
		title: Option<&str>,
	) -> Result<sources::Source> {
		sources::add_text(self.session().await?, notebook_id, content, title).await
	}

	pub async fn add_drive_source(&mut self, notebook_id: &str, document_id: &str) -> Result<sources::Source> {
		sources::add_drive(self.session().await?, notebook_id, document_id).await
	}

	pub async fn delete_source(&mut self, notebook_id: &str, source_id: &str) -> Result<()> {
		sources::delete(self.session().await?, notebook_id, source_id).await
	}

	// Research

	pub async fn start_research(
		&mut self,
		notebook_id: &str,
		query: &str,
		scope: research::ResearchScope,
		mode: research::ResearchMode,
	) -> Result<research::ResearchTask> {
		research::start(self.session().await?, notebook_id, query, scope, mode).await
	}

	pub async fn poll_research(&mut self, notebook_id: &str) -> Result<research::ResearchTask> {
		research::poll(self.session().await?, notebook_id).await
	}

	/// Polls the research task to completion under the client's poll
	/// schedule and operation deadline.
	pub async fn wait_for_research(&mut self, notebook_id: &str) -> Result<research::ResearchTask> {
		let poll = self.options.poll.clone();
		let timeout = self.options.operation_timeout;
		research::wait(self.session().await?, notebook_id, &poll, timeout).await
	}

	pub async fn import_research(
		&mut self,
		notebook_id: &str,
		task_id: &str,
		findings: &[research::Finding],
	) -> Result<Vec<research::ImportedSource>> {
		research::import(self.session().await?, notebook_id, task_id, findings).await
	}

	// Studio

	pub async fn create_audio(
		&mut self,
		notebook_id: &str,
		source_ids: &[String],
		options: &studio::AudioOptions,
	) -> Result<studio::CreatedArtifact> {
		studio::create_audio(self.session().await?, notebook_id, source_ids, options).await
	}

	pub async fn create_video(
		&mut self,
		notebook_id: &str,
		source_ids: &[String],
		options: &studio::VideoOptions,
	) -> Result<studio::CreatedArtifact> {
		studio::create_video(self.session().await?, notebook_id, source_ids, options).await
	}

	pub async fn poll_artifacts(&mut self, notebook_id: &str) -> Result<Vec<studio::Artifact>> {
		studio::poll_artifacts(self.session().await?, notebook_id).await
	}

	pub async fn delete_artifact(&mut self, artifact_id: &str) -> Result<()> {
		studio::delete(self.session().await?, artifact_id).await
	}

	/// Polls artifact generation to completion under the client's poll
	/// schedule and operation deadline.
	pub async fn wait_for_artifact(&mut self, notebook_id: &str, artifact_id: &str) -> Result<studio::Artifact> {
		let poll = self.options.poll.clone();
		let timeout = self.options.operation_timeout;
		studio::wait_for_artifact(self.session().await?, notebook_id, artifact_id, &poll, timeout).await
	}

	// Chat

	pub async fn ask(
		&mut self,
		notebook_id: &str,
		question: &str,
		source_ids: &[String],
	) -> Result<chat::Answer> {
		chat::ask(self.session().await?, notebook_id, question, source_ids, None).await
	}

	/// Raw escape hatch for procedures the typed catalog does not cover.
	pub async fn call_rpc(&mut self, call: &nlm_protocol::RpcCall) -> Result<Value> {
		self.session().await?.call_rpc(call).await
	}
}

impl Default for Client {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Client {
	fn drop(&mut self) {
		if self.session.is_some() {
			debug!(target = "nlm", "client dropped with open session; browser cleanup is best-effort");
		}
	}
}

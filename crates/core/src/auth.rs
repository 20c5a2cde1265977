//! Credential storage and validation.
//!
//! Authentication against the remote service is cookie-based: a session is
//! only usable when every cookie the web app requires is present. The
//! credential file holds the cookie set, the last extracted anti-forgery
//! token, and a save timestamp used for staleness warnings. Credential
//! sets are replaced whole by a re-login; there are no partial updates.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Cookie names the session manager requires before it will open a
/// session. A set missing any of these is incomplete and rejected outright.
pub const REQUIRED_COOKIES: [&str; 5] = ["SID", "HSID", "SSID", "APISID", "SAPISID"];

/// One browser cookie, in storage-state field naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	#[serde(default = "default_path")]
	pub path: String,
	#[serde(default)]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default = "default_same_site")]
	pub same_site: String,
}

fn default_path() -> String {
	"/".to_string()
}

fn default_same_site() -> String {
	"Lax".to_string()
}

impl Cookie {
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: default_path(),
			expires: None,
			http_only: false,
			secure: false,
			same_site: default_same_site(),
		}
	}
}

/// A full authentication state: cookies plus the optional anti-forgery
/// token captured from an authenticated page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
	pub cookies: Vec<Cookie>,
	#[serde(default)]
	pub csrf_token: Option<String>,
	pub saved_at: DateTime<Utc>,
}

impl CredentialSet {
	pub fn new(cookies: Vec<Cookie>, csrf_token: Option<String>) -> Self {
		Self {
			cookies,
			csrf_token,
			saved_at: Utc::now(),
		}
	}

	/// Structural check against the required cookie names. Incomplete sets
	/// must never reach a session.
	pub fn is_complete(&self) -> bool {
		self.missing_cookies().is_empty()
	}

	pub fn missing_cookies(&self) -> Vec<&'static str> {
		REQUIRED_COOKIES
			.iter()
			.copied()
			.filter(|required| !self.cookies.iter().any(|c| c.name == *required))
			.collect()
	}

	pub fn age(&self) -> chrono::Duration {
		Utc::now() - self.saved_at
	}

	/// Age-based advisory check. Stale credentials trigger a warning, not
	/// a hard failure; the remote is the only authority on validity.
	pub fn is_stale(&self, threshold: chrono::Duration) -> bool {
		self.age() > threshold
	}
}

/// Persisted credential storage with atomic replace semantics.
#[derive(Debug, Clone)]
pub struct CredentialStore {
	path: PathBuf,
}

impl CredentialStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Default location: `~/.nlm/auth.json`.
	pub fn default_path() -> PathBuf {
		dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".nlm").join("auth.json")
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn exists(&self) -> bool {
		self.path.exists()
	}

	/// Loads and validates the persisted credential set.
	pub fn load(&self) -> Result<CredentialSet> {
		let raw = std::fs::read_to_string(&self.path).map_err(|_| {
			Error::Authentication(format!("no credentials at {}; run login first", self.path.display()))
		})?;
		let set: CredentialSet = serde_json::from_str(&raw)
			.map_err(|e| Error::Authentication(format!("credential file is unreadable: {e}")))?;
		if !set.is_complete() {
			return Err(Error::Authentication(format!(
				"credential set is missing required cookies: {}",
				set.missing_cookies().join(", ")
			)));
		}
		debug!(target = "nlm", path = %self.path.display(), cookies = set.cookies.len(), "loaded credentials");
		Ok(set)
	}

	/// Persists the set atomically: write to a temp file in the same
	/// directory, then rename over the destination, so a crash never
	/// leaves a truncated file for other readers.
	pub fn save(&self, set: &CredentialSet) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
		let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
		tmp.write_all(serde_json::to_string_pretty(set)?.as_bytes())?;
		tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
		}

		info!(target = "nlm", path = %self.path.display(), cookies = set.cookies.len(), "saved credentials");
		Ok(())
	}

	/// Removes the persisted credentials, if any.
	pub fn clear(&self) -> Result<()> {
		if self.path.exists() {
			std::fs::remove_file(&self.path)?;
			info!(target = "nlm", path = %self.path.display(), "removed credential file");
		}
		Ok(())
	}
}

#[cfg(test)]
pub(crate) fn complete_cookie_set() -> Vec<Cookie> {
	REQUIRED_COOKIES
		.iter()
		.map(|name| Cookie::new(*name, format!("{name}-value"), ".google.com"))
		.collect()
}

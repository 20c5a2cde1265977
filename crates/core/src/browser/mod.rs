//! Browser driver seam.
//!
//! The session manager needs a handful of page-level capabilities:
//! navigate, read the current URL, evaluate JavaScript, and manage
//! cookies. [`Driver`] is the trait boundary for those; the production
//! implementation drives Chromium over CDP, and tests substitute
//! in-memory fakes so session logic runs without a browser.

mod chromium;
mod pool;

use async_trait::async_trait;
pub use chromium::{ChromiumDriver, LaunchOptions};
pub use pool::{DriverPool, PooledDriver};

use crate::auth::Cookie;
use crate::error::Result;

/// One controllable browser page with its own cookie jar.
///
/// A driver is owned exclusively by one session at a time; no two sessions
/// share a driver concurrently.
#[async_trait]
pub trait Driver: Send + Sync {
	/// Navigates the page and waits for the load to settle.
	async fn navigate(&self, url: &str) -> Result<()>;

	/// Current page URL, after any redirects.
	async fn current_url(&self) -> Result<String>;

	/// Evaluates a JavaScript expression in the page, awaiting promises,
	/// and returns the JSON-serialized result.
	async fn evaluate(&self, expression: &str) -> Result<serde_json::Value>;

	/// Cookies currently held by the page's context.
	async fn cookies(&self) -> Result<Vec<Cookie>>;

	async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()>;

	async fn clear_cookies(&self) -> Result<()>;

	/// Releases the underlying browser resources. Pooled drivers return to
	/// their pool instead of shutting the browser down.
	async fn close(&self) -> Result<()>;
}

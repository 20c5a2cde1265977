//! CDP-backed driver implementation.
//!
//! Launches a hardened Chromium, drains its event stream on a background
//! task, and drives a single page. One driver owns one page; pooled setups
//! hold several drivers over separate browser processes.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
	ClearBrowserCookiesParams, CookieParam, CookieSameSite, SetBlockedUrLsParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Driver;
use crate::auth::Cookie;
use crate::error::{Error, Result};

/// Launch args that keep headless Chromium fast and container-friendly.
const LAUNCH_ARGS: [&str; 5] = [
	"--no-sandbox",
	"--disable-setuid-sandbox",
	"--disable-dev-shm-usage",
	"--disable-extensions",
	"--disable-gpu",
];

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
	AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// URL patterns blocked when resource blocking is on. The RPC surface only
/// needs the page's scripts, not its pixels.
const BLOCKED_PATTERNS: [&str; 6] = ["*.png", "*.jpg", "*.jpeg", "*.gif", "*.woff*", "*.mp4"];

/// Browser launch configuration.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub headless: bool,
	pub block_resources: bool,
	pub request_timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			headless: true,
			block_resources: true,
			request_timeout: Duration::from_secs(60),
		}
	}
}

/// A Chromium process with one driven page.
pub struct ChromiumDriver {
	browser: Mutex<Browser>,
	page: Page,
	handler_task: JoinHandle<()>,
}

impl ChromiumDriver {
	/// Launches a browser process and opens its driving page.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let mut config = BrowserConfig::builder()
			.args(LAUNCH_ARGS)
			.request_timeout(options.request_timeout);
		if !options.headless {
			config = config.with_head();
		}
		let config = config.build().map_err(Error::Browser)?;

		debug!(target = "nlm", headless = options.headless, "launching browser...");
		let (browser, mut handler) = Browser::launch(config).await.map_err(|e| Error::Browser(e.to_string()))?;

		// The CDP event stream must be drained for the connection to make
		// progress; it ends when the browser shuts down.
		let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

		let page = browser.new_page("about:blank").await.map_err(|e| Error::Browser(e.to_string()))?;
		page.set_user_agent(USER_AGENT.to_string()).await.map_err(|e| Error::Browser(e.to_string()))?;

		if options.block_resources {
			page.execute(SetBlockedUrLsParams {
				urls: BLOCKED_PATTERNS.iter().map(|p| p.to_string()).collect(),
			})
			.await
			.map_err(|e| Error::Browser(e.to_string()))?;
		}

		Ok(Self {
			browser: Mutex::new(browser),
			page,
			handler_task,
		})
	}
}

#[async_trait]
impl Driver for ChromiumDriver {
	async fn navigate(&self, url: &str) -> Result<()> {
		self.page.goto(url).await.map_err(|e| Error::Browser(format!("navigation to {url} failed: {e}")))?;
		self.page
			.wait_for_navigation()
			.await
			.map_err(|e| Error::Browser(format!("navigation to {url} did not settle: {e}")))?;
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		self.page
			.url()
			.await
			.map_err(|e| Error::Browser(e.to_string()))?
			.ok_or_else(|| Error::Browser("page has no URL".to_string()))
	}

	async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
		let params = EvaluateParams::builder()
			.expression(expression)
			.await_promise(true)
			.return_by_value(true)
			.build()
			.map_err(Error::Browser)?;
		let evaluation = self.page.evaluate(params).await.map_err(|e| Error::Browser(e.to_string()))?;
		evaluation
			.into_value()
			.map_err(|e| Error::Browser(format!("evaluation result not serializable: {e}")))
	}

	async fn cookies(&self) -> Result<Vec<Cookie>> {
		let cookies = self.page.get_cookies().await.map_err(|e| Error::Browser(e.to_string()))?;
		Ok(cookies
			.into_iter()
			.map(|c| Cookie {
				name: c.name,
				value: c.value,
				domain: c.domain,
				path: c.path,
				expires: Some(c.expires),
				http_only: c.http_only,
				secure: c.secure,
				same_site: match c.same_site {
					Some(CookieSameSite::Strict) => "Strict".to_string(),
					Some(CookieSameSite::None) => "None".to_string(),
					_ => "Lax".to_string(),
				},
			})
			.collect())
	}

	async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
		let params: Vec<CookieParam> = cookies
			.iter()
			.map(|c| {
				let mut builder = CookieParam::builder()
					.name(&c.name)
					.value(&c.value)
					.domain(&c.domain)
					.path(&c.path)
					.secure(c.secure)
					.http_only(c.http_only)
					.same_site(match c.same_site.as_str() {
						"Strict" => CookieSameSite::Strict,
						"None" => CookieSameSite::None,
						_ => CookieSameSite::Lax,
					});
				if let Some(expires) = c.expires {
					builder = builder.expires(TimeSinceEpoch::new(expires));
				}
				builder.build().map_err(Error::Browser)
			})
			.collect::<Result<_>>()?;

		self.page.set_cookies(params).await.map_err(|e| Error::Browser(e.to_string()))?;
		Ok(())
	}

	async fn clear_cookies(&self) -> Result<()> {
		self.page
			.execute(ClearBrowserCookiesParams::default())
			.await
			.map_err(|e| Error::Browser(e.to_string()))?;
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		let mut browser = self.browser.lock().await;
		let _ = browser.close().await;
		let _ = browser.wait().await;
		self.handler_task.abort();
		Ok(())
	}
}

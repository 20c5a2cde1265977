//! Browser session management and RPC execution.
//!
//! A [`Session`] binds one credential set to one live browser driver:
//! open injects cookies, navigates the landing page, verifies the page is
//! authenticated, and captures the anti-forgery token; calls are executed
//! from inside the page via `fetch` so cookies and headers travel exactly
//! as the web app sends them; close releases the driver on every path.
//!
//! The session recovers locally from exactly one failure class: an
//! authentication redirect while auto-refresh is enabled triggers a single
//! transparent re-login and one retry of the original call. Everything
//! else propagates unchanged, subject to the uniform retry policy for
//! transient failures.

use async_trait::async_trait;
use nlm_protocol::{RpcCall, StreamDecoder, Value, encode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::CredentialSet;
use crate::browser::Driver;
use crate::config::SessionOptions;
use crate::error::{Error, Result};
use crate::retry::Decision;

pub const NOTEBOOKLM_URL: &str = "https://notebooklm.google.com";
pub const BATCH_EXECUTE_URL: &str = "https://notebooklm.google.com/_/LabsTailwindUi/data/batchexecute";

/// Query string selecting the chunked (streaming) response mode.
const STREAM_MODE: &str = "rt=c";

/// URL/body fragments that mean the remote bounced us to a login page.
const AUTH_REDIRECT_MARKERS: [&str; 2] = ["accounts.google.com", "ServiceLogin"];

/// Extracts the `SNlM0e` anti-forgery token from the landing page scripts.
pub(crate) const CSRF_TOKEN_JS: &str = r#"(() => {
	const scripts = document.querySelectorAll('script');
	for (const script of scripts) {
		const match = script.textContent?.match(/SNlM0e":"([^"]+)/);
		if (match) return match[1];
	}
	return null;
})()"#;

/// Re-acquires credentials when the current set is rejected mid-session.
///
/// Implementations own persistence: a successful re-login should save the
/// fresh set before returning it.
#[async_trait]
pub trait Reauthenticate: Send + Sync {
	async fn reauthenticate(&self) -> Result<CredentialSet>;
}

/// Result shape of the in-page `fetch` bridge.
#[derive(Debug, Deserialize)]
struct FetchResponse {
	ok: bool,
	status: u16,
	#[serde(rename = "statusText")]
	status_text: String,
	#[serde(default)]
	text: String,
}

struct CachedToken {
	token: String,
	extracted_at: tokio::time::Instant,
}

/// One authenticated binding between a credential set and a live driver.
pub struct Session {
	driver: Box<dyn Driver>,
	credentials: CredentialSet,
	options: SessionOptions,
	reauth: Option<Box<dyn Reauthenticate>>,
	csrf: Option<CachedToken>,
	open: bool,
	rpc_calls: u64,
	rpc_failures: u64,
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("credentials", &self.credentials)
			.field("options", &self.options)
			.field("open", &self.open)
			.field("rpc_calls", &self.rpc_calls)
			.field("rpc_failures", &self.rpc_failures)
			.finish_non_exhaustive()
	}
}

impl Session {
	/// Opens a session: inject credentials, navigate, verify, capture the
	/// anti-forgery token.
	pub async fn open(driver: Box<dyn Driver>, credentials: CredentialSet, options: SessionOptions) -> Result<Self> {
		Self::open_with_reauth(driver, credentials, options, None).await
	}

	/// Opens a session with a re-login hook for auto-refresh.
	pub async fn open_with_reauth(
		driver: Box<dyn Driver>,
		credentials: CredentialSet,
		options: SessionOptions,
		reauth: Option<Box<dyn Reauthenticate>>,
	) -> Result<Self> {
		let mut session = Self {
			driver,
			credentials,
			options,
			reauth,
			csrf: None,
			open: false,
			rpc_calls: 0,
			rpc_failures: 0,
		};
		session.initialize().await?;
		Ok(session)
	}

	async fn initialize(&mut self) -> Result<()> {
		if !self.credentials.is_complete() {
			return Err(Error::Authentication(format!(
				"credential set is missing required cookies: {}",
				self.credentials.missing_cookies().join(", ")
			)));
		}
		if self.credentials.is_stale(self.options.credential_stale_after) {
			warn!(
				target = "nlm",
				age_days = self.credentials.age().num_days(),
				"credentials are older than the staleness threshold; consider re-authenticating"
			);
		}

		self.driver.set_cookies(&self.credentials.cookies).await?;
		self.driver.navigate(NOTEBOOKLM_URL).await?;

		let url = self.driver.current_url().await?;
		if is_auth_redirect(&url) {
			return Err(Error::Authentication(
				"cookies expired or invalid; please log in again".to_string(),
			));
		}

		match self.extract_csrf().await {
			Some(token) => {
				self.csrf = Some(CachedToken {
					token,
					extracted_at: tokio::time::Instant::now(),
				});
			}
			None => {
				self.csrf = None;
				warn!(target = "nlm", "no anti-forgery token on landing page; state-changing calls may fail");
			}
		}

		self.open = true;
		debug!(target = "nlm", csrf = self.csrf.is_some(), "session ready");
		Ok(())
	}

	pub fn csrf_token(&self) -> Option<&str> {
		self.csrf.as_ref().map(|c| c.token.as_str())
	}

	pub fn credentials(&self) -> &CredentialSet {
		&self.credentials
	}

	/// Calls a procedure and decodes its payload. Transient failures are
	/// retried per the session's policy; an authentication redirect is
	/// recovered once via re-login when auto-refresh is on.
	pub async fn call_rpc(&mut self, call: &RpcCall) -> Result<Value> {
		let policy = self.options.retry.clone();
		let mut attempt = 0;
		loop {
			match self.call_attempt(call).await {
				Ok(value) => return Ok(value),
				Err(err) => match policy.classify(&err, attempt) {
					Decision::Retry { delay } => {
						warn!(
							target = "nlm",
							rpc = call.id(),
							attempt = attempt + 1,
							delay_ms = delay.as_millis() as u64,
							error = %err,
							"retrying rpc after transient failure"
						);
						tokio::time::sleep(delay).await;
						attempt += 1;
					}
					Decision::Stop => return Err(err),
				},
			}
		}
	}

	/// One attempt, including the single built-in re-auth recovery.
	async fn call_attempt(&mut self, call: &RpcCall) -> Result<Value> {
		match self.execute_call(call).await {
			Err(Error::Authentication(reason)) if self.options.auto_refresh && self.reauth.is_some() => {
				info!(target = "nlm", %reason, "authentication rejected; attempting transparent re-login");
				self.refresh_session().await?;
				self.execute_call(call).await
			}
			other => other,
		}
	}

	async fn execute_call(&mut self, call: &RpcCall) -> Result<Value> {
		let response = self.post_form(call, BATCH_EXECUTE_URL, None).await?;
		match nlm_protocol::decode_response(&response.text) {
			Ok(value) => Ok(value),
			Err(err) => {
				self.rpc_failures += 1;
				Err(err.into())
			}
		}
	}

	/// Calls a procedure whose response arrives as chunked partial frames
	/// (free-form generation). Returns the decoded fragments in order.
	pub async fn call_streaming(&mut self, call: &RpcCall) -> Result<Vec<Value>> {
		let url = format!("{BATCH_EXECUTE_URL}?{STREAM_MODE}");
		let timeout_ms = self.options.streaming_timeout.as_millis() as u64;
		let response = self.post_form(call, &url, Some(timeout_ms)).await?;

		let mut decoder = StreamDecoder::new();
		let fragments = decoder.push(&response.text).map_err(|e| {
			self.rpc_failures += 1;
			Error::from(e)
		})?;
		decoder.finish().map_err(|e| {
			self.rpc_failures += 1;
			Error::from(e)
		})?;
		Ok(fragments)
	}

	/// Encodes, executes inside the page, and classifies the HTTP outcome.
	async fn post_form(&mut self, call: &RpcCall, url: &str, timeout_ms: Option<u64>) -> Result<FetchResponse> {
		self.ensure_open()?;
		self.ensure_csrf().await;

		let body = encode(call, self.csrf_token());
		debug!(target = "nlm", rpc = call.id(), body = %sanitize_form(&body), "rpc request");

		let script = fetch_script(url, &body, timeout_ms);
		self.rpc_calls += 1;
		let started = std::time::Instant::now();
		let raw = self.driver.evaluate(&script).await.inspect_err(|_| self.rpc_failures += 1)?;
		let response: FetchResponse = serde_json::from_value(raw)
			.map_err(|e| Error::Browser(format!("fetch bridge returned unexpected shape: {e}")))?;
		debug!(
			target = "nlm",
			rpc = call.id(),
			status = response.status,
			duration_ms = started.elapsed().as_millis() as u64,
			calls = self.rpc_calls,
			"rpc response"
		);

		if is_auth_redirect(&response.text) {
			self.rpc_failures += 1;
			return Err(Error::Authentication("authentication expired during call".to_string()));
		}
		if response.status == 429 {
			self.rpc_failures += 1;
			return Err(Error::RateLimited {
				retry_after: Some(std::time::Duration::from_secs(60)),
			});
		}
		if !response.ok {
			self.rpc_failures += 1;
			let status = if response.status == 0 { None } else { Some(response.status) };
			return Err(Error::Remote {
				status,
				message: response.status_text.clone(),
				body: Some(response.text),
			});
		}
		Ok(response)
	}

	fn ensure_open(&self) -> Result<()> {
		if self.open {
			Ok(())
		} else {
			Err(Error::Session("session is not open".to_string()))
		}
	}

	/// Re-extracts the anti-forgery token once its cache window lapses.
	/// Expiry costs one page evaluation, not a re-login.
	async fn ensure_csrf(&mut self) {
		let expired = match &self.csrf {
			Some(cached) => cached.extracted_at.elapsed() > self.options.csrf_ttl,
			None => true,
		};
		if !expired {
			return;
		}
		match self.extract_csrf().await {
			Some(token) => {
				self.csrf = Some(CachedToken {
					token,
					extracted_at: tokio::time::Instant::now(),
				});
			}
			None => self.csrf = None,
		}
	}

	async fn extract_csrf(&self) -> Option<String> {
		match self.driver.evaluate(CSRF_TOKEN_JS).await {
			Ok(serde_json::Value::String(token)) if !token.is_empty() => Some(token),
			Ok(_) => None,
			Err(err) => {
				warn!(target = "nlm", error = %err, "anti-forgery token extraction failed");
				None
			}
		}
	}

	/// Replaces the credential set via the re-login hook and rebuilds the
	/// page state: clear cookies, re-inject, navigate, re-verify.
	async fn refresh_session(&mut self) -> Result<()> {
		let reauth = self
			.reauth
			.as_ref()
			.ok_or_else(|| Error::Authentication("no re-login hook configured".to_string()))?;
		let fresh = reauth.reauthenticate().await?;

		self.credentials = fresh;
		self.csrf = None;
		self.open = false;
		self.driver.clear_cookies().await?;
		self.initialize().await
	}

	/// Releases the driver. Pooled drivers return to their pool; owned
	/// drivers shut the browser down.
	pub async fn close(self) -> Result<()> {
		debug!(
			target = "nlm",
			calls = self.rpc_calls,
			failures = self.rpc_failures,
			"closing session"
		);
		self.driver.close().await
	}
}

pub(crate) fn is_auth_redirect(text: &str) -> bool {
	AUTH_REDIRECT_MARKERS.iter().any(|marker| text.contains(marker))
}

/// In-page fetch bridge. Runs in the page so the browser attaches cookies
/// and origin headers itself; an out-of-band HTTP client would have to
/// forge them.
fn fetch_script(url: &str, body: &str, timeout_ms: Option<u64>) -> String {
	let args = serde_json::json!({ "url": url, "body": body, "timeoutMs": timeout_ms });
	format!(
		r#"(async () => {{
	const args = {args};
	const controller = new AbortController();
	const timer = args.timeoutMs ? setTimeout(() => controller.abort(), args.timeoutMs) : null;
	try {{
		const response = await fetch(args.url, {{
			method: 'POST',
			headers: {{ 'Content-Type': 'application/x-www-form-urlencoded;charset=UTF-8' }},
			body: args.body,
			credentials: 'include',
			signal: controller.signal,
		}});
		return {{
			ok: response.ok,
			status: response.status,
			statusText: response.statusText,
			text: await response.text().catch(() => ''),
		}};
	}} catch (error) {{
		return {{ ok: false, status: 0, statusText: error && error.name ? error.name : 'FetchError', text: '' }};
	}} finally {{
		if (timer) clearTimeout(timer);
	}}
}})()"#
	)
}

/// Redacts the anti-forgery token from a form body before logging.
fn sanitize_form(body: &str) -> String {
	match body.find("at=") {
		Some(start) => {
			let value_start = start + 3;
			let value_end = body[value_start..].find('&').map(|i| value_start + i).unwrap_or(body.len());
			format!("{}[REDACTED]{}", &body[..value_start], &body[value_end..])
		}
		None => body.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	use super::*;
	use crate::auth::{Cookie, complete_cookie_set};
	use crate::browser::Driver;

	#[derive(Default)]
	struct FakeState {
		token: Mutex<Option<String>>,
		fetches: Mutex<VecDeque<serde_json::Value>>,
		url: Mutex<String>,
		navigations: Mutex<Vec<String>>,
		cookie_injections: AtomicU32,
		cookie_clears: AtomicU32,
		token_extractions: AtomicU32,
		closes: AtomicU32,
	}

	/// Scripted driver: answers token extractions from `token` and fetch
	/// bridges from the `fetches` queue, recording everything it is told.
	#[derive(Clone, Default)]
	struct FakeDriver {
		state: Arc<FakeState>,
	}

	impl FakeDriver {
		fn with_token(token: &str) -> Self {
			let driver = Self::default();
			*driver.state.token.lock().unwrap() = Some(token.to_string());
			*driver.state.url.lock().unwrap() = NOTEBOOKLM_URL.to_string();
			driver
		}

		fn queue_fetch(&self, response: serde_json::Value) {
			self.state.fetches.lock().unwrap().push_back(response);
		}

		fn queue_ok_text(&self, text: &str) {
			self.queue_fetch(serde_json::json!({
				"ok": true, "status": 200, "statusText": "OK", "text": text,
			}));
		}
	}

	#[async_trait]
	impl Driver for FakeDriver {
		async fn navigate(&self, url: &str) -> Result<()> {
			self.state.navigations.lock().unwrap().push(url.to_string());
			Ok(())
		}

		async fn current_url(&self) -> Result<String> {
			Ok(self.state.url.lock().unwrap().clone())
		}

		async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
			if expression.contains("SNlM0e") {
				self.state.token_extractions.fetch_add(1, Ordering::SeqCst);
				return Ok(match self.state.token.lock().unwrap().clone() {
					Some(token) => serde_json::Value::String(token),
					None => serde_json::Value::Null,
				});
			}
			self.state
				.fetches
				.lock()
				.unwrap()
				.pop_front()
				.ok_or_else(|| Error::Browser("no scripted fetch response".to_string()))
		}

		async fn cookies(&self) -> Result<Vec<Cookie>> {
			Ok(Vec::new())
		}

		async fn set_cookies(&self, _cookies: &[Cookie]) -> Result<()> {
			self.state.cookie_injections.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}

		async fn clear_cookies(&self) -> Result<()> {
			self.state.cookie_clears.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}

		async fn close(&self) -> Result<()> {
			self.state.closes.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	fn rpc_frame(payload: &str) -> String {
		format!(")]}}'\n[[\"wrb.fr\",null,{}]]\n", serde_json::Value::String(payload.to_string()))
	}

	fn credentials() -> CredentialSet {
		CredentialSet::new(complete_cookie_set(), None)
	}

	fn no_retry_options() -> SessionOptions {
		let mut options = SessionOptions::new();
		options.retry.max_attempts = 1;
		options.retry.jitter = false;
		options
	}

	#[tokio::test]
	async fn open_rejects_incomplete_credentials_before_browser_use() {
		let driver = FakeDriver::with_token("tok");
		let incomplete = CredentialSet::new(vec![Cookie::new("SID", "v", ".google.com")], None);

		let err = Session::open(Box::new(driver.clone()), incomplete, SessionOptions::new())
			.await
			.unwrap_err();

		assert!(matches!(err, Error::Authentication(_)));
		assert!(driver.state.navigations.lock().unwrap().is_empty());
		assert_eq!(driver.state.cookie_injections.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn open_fails_on_auth_redirect_landing() {
		let driver = FakeDriver::with_token("tok");
		*driver.state.url.lock().unwrap() = "https://accounts.google.com/ServiceLogin?hl=en".to_string();

		let err = Session::open(Box::new(driver), credentials(), SessionOptions::new())
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	#[tokio::test]
	async fn open_without_token_still_succeeds() {
		let driver = FakeDriver::default();
		*driver.state.url.lock().unwrap() = NOTEBOOKLM_URL.to_string();

		let session = Session::open(Box::new(driver), credentials(), SessionOptions::new())
			.await
			.unwrap();
		assert!(session.csrf_token().is_none());
	}

	#[tokio::test]
	async fn call_rpc_decodes_payload() {
		let driver = FakeDriver::with_token("tok");
		driver.queue_ok_text(&rpc_frame("[[1,2]]"));
		let mut session = Session::open(Box::new(driver.clone()), credentials(), no_retry_options())
			.await
			.unwrap();

		let call = RpcCall::new("wXbhsf", Value::seq([Value::Null]));
		let value = session.call_rpc(&call).await.unwrap();
		assert_eq!(value, Value::seq([Value::seq([Value::from(1), Value::from(2)])]));
	}

	#[tokio::test]
	async fn rate_limit_status_maps_to_rate_limited() {
		let driver = FakeDriver::with_token("tok");
		driver.queue_fetch(serde_json::json!({
			"ok": false, "status": 429, "statusText": "Too Many Requests", "text": "",
		}));
		let mut session = Session::open(Box::new(driver), credentials(), no_retry_options())
			.await
			.unwrap();

		let err = session.call_rpc(&RpcCall::new("wXbhsf", Value::Null)).await.unwrap_err();
		assert!(matches!(err, Error::RateLimited { retry_after: Some(_) }));
	}

	#[tokio::test(start_paused = true)]
	async fn transient_server_error_is_retried_then_succeeds() {
		let driver = FakeDriver::with_token("tok");
		driver.queue_fetch(serde_json::json!({
			"ok": false, "status": 503, "statusText": "Service Unavailable", "text": "",
		}));
		driver.queue_ok_text(&rpc_frame("[\"recovered\"]"));

		let mut options = SessionOptions::new();
		options.retry.max_attempts = 3;
		options.retry.jitter = false;
		options.retry.base_delay = Duration::from_millis(10);
		let mut session = Session::open(Box::new(driver), credentials(), options).await.unwrap();

		let value = session.call_rpc(&RpcCall::new("GkrRBf", Value::Null)).await.unwrap();
		assert_eq!(value, Value::seq([Value::from("recovered")]));
	}

	#[tokio::test]
	async fn auth_redirect_without_auto_refresh_is_terminal() {
		let driver = FakeDriver::with_token("tok");
		driver.queue_ok_text("<html>https://accounts.google.com/ServiceLogin</html>");
		let mut session = Session::open(Box::new(driver), credentials(), no_retry_options())
			.await
			.unwrap();

		let err = session.call_rpc(&RpcCall::new("wXbhsf", Value::Null)).await.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	struct StubReauth {
		invocations: Arc<AtomicU32>,
	}

	#[async_trait]
	impl Reauthenticate for StubReauth {
		async fn reauthenticate(&self) -> Result<CredentialSet> {
			self.invocations.fetch_add(1, Ordering::SeqCst);
			Ok(credentials())
		}
	}

	#[tokio::test]
	async fn auth_redirect_with_auto_refresh_retries_once_and_succeeds() {
		let driver = FakeDriver::with_token("tok");
		// First call bounces to login; after the transparent re-login the
		// original call succeeds.
		driver.queue_ok_text("redirect to accounts.google.com");
		driver.queue_ok_text(&rpc_frame("[\"intended result\"]"));

		let invocations = Arc::new(AtomicU32::new(0));
		let mut options = no_retry_options();
		options.auto_refresh = true;
		let mut session = Session::open_with_reauth(
			Box::new(driver.clone()),
			credentials(),
			options,
			Some(Box::new(StubReauth {
				invocations: Arc::clone(&invocations),
			})),
		)
		.await
		.unwrap();

		let value = session.call_rpc(&RpcCall::new("wXbhsf", Value::Null)).await.unwrap();
		assert_eq!(value, Value::seq([Value::from("intended result")]));
		assert_eq!(invocations.load(Ordering::SeqCst), 1);
		// Re-login rebuilt the page state: cleared cookies, re-injected,
		// re-navigated.
		assert_eq!(driver.state.cookie_clears.load(Ordering::SeqCst), 1);
		assert_eq!(driver.state.cookie_injections.load(Ordering::SeqCst), 2);
		assert_eq!(driver.state.navigations.lock().unwrap().len(), 2);
	}

	#[tokio::test]
	async fn auth_redirect_with_failing_relogin_surfaces_auth_error() {
		struct FailingReauth;

		#[async_trait]
		impl Reauthenticate for FailingReauth {
			async fn reauthenticate(&self) -> Result<CredentialSet> {
				Err(Error::Authentication("login window closed".to_string()))
			}
		}

		let driver = FakeDriver::with_token("tok");
		driver.queue_ok_text("redirect to accounts.google.com");

		let mut options = no_retry_options();
		options.auto_refresh = true;
		let mut session =
			Session::open_with_reauth(Box::new(driver), credentials(), options, Some(Box::new(FailingReauth)))
				.await
				.unwrap();

		let err = session.call_rpc(&RpcCall::new("wXbhsf", Value::Null)).await.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn csrf_token_is_cached_within_ttl_and_refreshed_after() {
		let driver = FakeDriver::with_token("tok");
		driver.queue_ok_text(&rpc_frame("[1]"));
		driver.queue_ok_text(&rpc_frame("[2]"));
		driver.queue_ok_text(&rpc_frame("[3]"));
		let mut session = Session::open(Box::new(driver.clone()), credentials(), no_retry_options())
			.await
			.unwrap();
		assert_eq!(driver.state.token_extractions.load(Ordering::SeqCst), 1);

		let call = RpcCall::new("wXbhsf", Value::Null);
		session.call_rpc(&call).await.unwrap();
		session.call_rpc(&call).await.unwrap();
		// Calls inside the window reuse the cached token.
		assert_eq!(driver.state.token_extractions.load(Ordering::SeqCst), 1);

		tokio::time::advance(Duration::from_secs(301)).await;
		session.call_rpc(&call).await.unwrap();
		assert_eq!(driver.state.token_extractions.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn streaming_call_collects_fragments() {
		let driver = FakeDriver::with_token("tok");
		let body = format!(
			")]}}'\n[[\"wrb.fr\",null,{}]]\n[[\"af.httprm\",1]]\n",
			serde_json::Value::String("[\"chunk one\"]".to_string())
		);
		driver.queue_ok_text(&body);
		let mut session = Session::open(Box::new(driver), credentials(), no_retry_options())
			.await
			.unwrap();

		let fragments = session.call_streaming(&RpcCall::new("stream", Value::Null)).await.unwrap();
		assert_eq!(fragments, vec![Value::seq([Value::from("chunk one")])]);
	}

	#[tokio::test]
	async fn streaming_call_without_trailer_is_protocol_error() {
		let driver = FakeDriver::with_token("tok");
		let body = format!(
			")]}}'\n[[\"wrb.fr\",null,{}]]\n",
			serde_json::Value::String("[\"cut short\"]".to_string())
		);
		driver.queue_ok_text(&body);
		let mut session = Session::open(Box::new(driver), credentials(), no_retry_options())
			.await
			.unwrap();

		let err = session.call_streaming(&RpcCall::new("stream", Value::Null)).await.unwrap_err();
		assert!(matches!(
			err,
			Error::Protocol(nlm_protocol::ProtocolError::IncompleteStream)
		));
	}

	#[tokio::test]
	async fn close_releases_driver() {
		let driver = FakeDriver::with_token("tok");
		let session = Session::open(Box::new(driver.clone()), credentials(), no_retry_options())
			.await
			.unwrap();
		session.close().await.unwrap();
		assert_eq!(driver.state.closes.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn sanitize_form_redacts_token() {
		let body = "f.req=%5B%5D&at=SECRET-TOKEN";
		assert_eq!(sanitize_form(body), "f.req=%5B%5D&at=[REDACTED]");
		assert_eq!(sanitize_form("f.req=%5B%5D"), "f.req=%5B%5D");
	}
}

//! Login flows that produce credential sets.
//!
//! Interactive login drives a headful browser and waits for the user to
//! finish signing in; cookie refresh re-derives a fresh set from a still
//! valid one without user involvement. Both filter captured cookies to the
//! service domain and return a full replacement set.

use std::time::Duration;

use tracing::{debug, info};

use crate::auth::{Cookie, CredentialSet};
use crate::browser::Driver;
use crate::error::{Error, Result};
use crate::session::{CSRF_TOKEN_JS, NOTEBOOKLM_URL, is_auth_redirect};

const LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Waits for the user to complete a sign-in in the driven (headful)
/// browser, then captures cookies and the anti-forgery token.
///
/// Returns once the page has landed back on the service with every
/// required cookie present, or fails with an authentication error when
/// `timeout` passes first.
pub async fn interactive_login(driver: &dyn Driver, timeout: Duration) -> Result<CredentialSet> {
	driver.navigate(NOTEBOOKLM_URL).await?;
	info!(
		target = "nlm",
		timeout_s = timeout.as_secs(),
		"waiting for sign-in to complete in the browser window"
	);

	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		let url = driver.current_url().await?;
		if url.contains("notebooklm.google.com") && !is_auth_redirect(&url) {
			let cookies = service_cookies(driver.cookies().await?);
			let set = CredentialSet::new(cookies, extract_token(driver).await);
			if set.is_complete() {
				info!(target = "nlm", cookies = set.cookies.len(), "sign-in detected");
				return Ok(set);
			}
			debug!(target = "nlm", missing = ?set.missing_cookies(), "signed-in page but cookie set incomplete");
		}

		if tokio::time::Instant::now() >= deadline {
			return Err(Error::Authentication(format!(
				"login timed out after {}s; please try again",
				timeout.as_secs()
			)));
		}
		tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
	}
}

/// Re-derives fresh credentials from a currently valid set: inject, load
/// the landing page, and re-capture what the browser now holds. Fails when
/// the existing cookies no longer authenticate — that case needs a full
/// interactive login.
pub async fn refresh_credentials(driver: &dyn Driver, current: &CredentialSet) -> Result<CredentialSet> {
	driver.set_cookies(&current.cookies).await?;
	driver.navigate(NOTEBOOKLM_URL).await?;

	let url = driver.current_url().await?;
	if is_auth_redirect(&url) {
		return Err(Error::Authentication(
			"cookies no longer authenticate; full login required".to_string(),
		));
	}

	let cookies = service_cookies(driver.cookies().await?);
	let set = CredentialSet::new(cookies, extract_token(driver).await);
	if !set.is_complete() {
		return Err(Error::Authentication(format!(
			"refreshed cookie set is missing required cookies: {}",
			set.missing_cookies().join(", ")
		)));
	}
	info!(target = "nlm", cookies = set.cookies.len(), "credentials refreshed");
	Ok(set)
}

async fn extract_token(driver: &dyn Driver) -> Option<String> {
	match driver.evaluate(CSRF_TOKEN_JS).await {
		Ok(serde_json::Value::String(token)) if !token.is_empty() => Some(token),
		_ => None,
	}
}

fn service_cookies(cookies: Vec<Cookie>) -> Vec<Cookie> {
	cookies.into_iter().filter(|c| c.domain.ends_with("google.com")).collect()
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{Arc, Mutex};

	use async_trait::async_trait;

	use super::*;
	use crate::auth::REQUIRED_COOKIES;

	/// Driver whose URL and cookie jar change as the "user" signs in.
	#[derive(Clone, Default)]
	struct LoginDriver {
		state: Arc<LoginState>,
	}

	#[derive(Default)]
	struct LoginState {
		url_checks: AtomicU32,
		/// Number of URL checks after which the page lands authenticated.
		ready_after: u32,
		cookies: Mutex<Vec<Cookie>>,
	}

	impl LoginDriver {
		fn ready_after(checks: u32) -> Self {
			let mut state = LoginState::default();
			state.ready_after = checks;
			Self { state: Arc::new(state) }
		}

		fn with_full_jar(self) -> Self {
			*self.state.cookies.lock().unwrap() = REQUIRED_COOKIES
				.iter()
				.map(|name| Cookie::new(*name, "v", ".google.com"))
				.collect();
			self
		}
	}

	#[async_trait]
	impl Driver for LoginDriver {
		async fn navigate(&self, _url: &str) -> Result<()> {
			Ok(())
		}

		async fn current_url(&self) -> Result<String> {
			let checks = self.state.url_checks.fetch_add(1, Ordering::SeqCst);
			if checks < self.state.ready_after {
				Ok("https://accounts.google.com/ServiceLogin".to_string())
			} else {
				Ok("https://notebooklm.google.com/".to_string())
			}
		}

		async fn evaluate(&self, _expression: &str) -> Result<serde_json::Value> {
			Ok(serde_json::Value::String("SN-token".to_string()))
		}

		async fn cookies(&self) -> Result<Vec<Cookie>> {
			Ok(self.state.cookies.lock().unwrap().clone())
		}

		async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
			*self.state.cookies.lock().unwrap() = cookies.to_vec();
			Ok(())
		}

		async fn clear_cookies(&self) -> Result<()> {
			self.state.cookies.lock().unwrap().clear();
			Ok(())
		}

		async fn close(&self) -> Result<()> {
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn login_waits_until_authenticated_page_and_cookies() {
		let driver = LoginDriver::ready_after(3).with_full_jar();
		let set = interactive_login(&driver, Duration::from_secs(300)).await.unwrap();

		assert!(set.is_complete());
		assert_eq!(set.csrf_token.as_deref(), Some("SN-token"));
		assert!(driver.state.url_checks.load(Ordering::SeqCst) >= 4);
	}

	#[tokio::test(start_paused = true)]
	async fn login_times_out_with_auth_error() {
		// Never leaves the login page.
		let driver = LoginDriver::ready_after(u32::MAX).with_full_jar();
		let err = interactive_login(&driver, Duration::from_secs(10)).await.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn login_keeps_waiting_while_jar_incomplete() {
		let driver = LoginDriver::ready_after(0);
		// Authenticated page but empty jar: must time out, not return an
		// incomplete set.
		let err = interactive_login(&driver, Duration::from_secs(6)).await.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	#[tokio::test]
	async fn refresh_rejects_bounced_cookies() {
		let driver = LoginDriver::ready_after(u32::MAX).with_full_jar();
		let current = CredentialSet::new(driver.cookies().await.unwrap(), None);

		let err = refresh_credentials(&driver, &current).await.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	#[tokio::test]
	async fn refresh_returns_fresh_complete_set() {
		let driver = LoginDriver::ready_after(0).with_full_jar();
		let current = CredentialSet::new(driver.cookies().await.unwrap(), None);

		let fresh = refresh_credentials(&driver, &current).await.unwrap();
		assert!(fresh.is_complete());
		assert_eq!(fresh.csrf_token.as_deref(), Some("SN-token"));
	}

	#[test]
	fn service_cookie_filter_drops_foreign_domains() {
		let cookies = vec![
			Cookie::new("SID", "v", ".google.com"),
			Cookie::new("tracker", "v", ".example.com"),
		];
		let kept = service_cookies(cookies);
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].name, "SID");
	}
}

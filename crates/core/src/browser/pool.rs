//! Bounded driver pool.
//!
//! Launching a browser dominates per-call latency, so repeated call groups
//! can draw pre-warmed drivers from a pool instead. The pool hands out a
//! checkout guard; the guard returns its driver on drop, which makes
//! release happen exactly once on every exit path — normal return, error,
//! or a cancelled future.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::Notify;
use tracing::debug;

use super::Driver;
use crate::auth::Cookie;
use crate::error::{Error, Result};

type DriverFactory = Box<dyn Fn() -> BoxFuture<'static, Result<Box<dyn Driver>>> + Send + Sync>;

struct PoolInner {
	idle: Mutex<Vec<Box<dyn Driver>>>,
	created: Mutex<usize>,
	capacity: usize,
	returned: Notify,
	factory: DriverFactory,
}

/// Bounded set of reusable drivers.
#[derive(Clone)]
pub struct DriverPool {
	inner: Arc<PoolInner>,
}

impl DriverPool {
	pub fn new<F, Fut>(capacity: usize, factory: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: std::future::Future<Output = Result<Box<dyn Driver>>> + Send + 'static,
	{
		Self {
			inner: Arc::new(PoolInner {
				idle: Mutex::new(Vec::new()),
				created: Mutex::new(0),
				capacity: capacity.max(1),
				returned: Notify::new(),
				factory: Box::new(move || Box::pin(factory())),
			}),
		}
	}

	/// Checks out a driver: the next idle one, a freshly created one while
	/// under capacity, or — when all are busy — the next one returned.
	pub async fn acquire(&self) -> Result<PooledDriver> {
		loop {
			let notified = self.inner.returned.notified();

			if let Some(driver) = self.inner.idle.lock().unwrap().pop() {
				return Ok(PooledDriver {
					driver: Some(driver),
					pool: Arc::clone(&self.inner),
				});
			}

			let may_create = {
				let mut created = self.inner.created.lock().unwrap();
				if *created < self.inner.capacity {
					*created += 1;
					true
				} else {
					false
				}
			};

			if may_create {
				debug!(target = "nlm", "pool creating driver");
				match (self.inner.factory)().await {
					Ok(driver) => {
						return Ok(PooledDriver {
							driver: Some(driver),
							pool: Arc::clone(&self.inner),
						});
					}
					Err(err) => {
						*self.inner.created.lock().unwrap() -= 1;
						return Err(err);
					}
				}
			}

			notified.await;
		}
	}

	/// Like [`acquire`](Self::acquire), but gives up after `wait`.
	pub async fn acquire_timeout(&self, wait: Duration) -> Result<PooledDriver> {
		tokio::time::timeout(wait, self.acquire())
			.await
			.map_err(|_| Error::Session(format!("no pooled driver became free within {}s", wait.as_secs())))?
	}

	pub fn idle_count(&self) -> usize {
		self.inner.idle.lock().unwrap().len()
	}

	/// Closes every idle driver. Drivers still checked out are untouched;
	/// call again after their guards return them.
	pub async fn shutdown(&self) {
		let drivers: Vec<Box<dyn Driver>> = self.inner.idle.lock().unwrap().drain(..).collect();
		for driver in &drivers {
			let _ = driver.close().await;
			*self.inner.created.lock().unwrap() -= 1;
		}
	}
}

/// Checkout guard. Dereferences to the driver; returns it to the pool on
/// drop.
pub struct PooledDriver {
	driver: Option<Box<dyn Driver>>,
	pool: Arc<PoolInner>,
}

impl std::fmt::Debug for PooledDriver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PooledDriver")
			.field("released", &self.driver.is_none())
			.finish_non_exhaustive()
	}
}

impl PooledDriver {
	fn driver(&self) -> &dyn Driver {
		// Present until drop by construction.
		self.driver.as_deref().expect("pooled driver already released")
	}
}

impl Drop for PooledDriver {
	fn drop(&mut self) {
		if let Some(driver) = self.driver.take() {
			self.pool.idle.lock().unwrap().push(driver);
			self.pool.returned.notify_one();
		}
	}
}

#[async_trait]
impl Driver for PooledDriver {
	async fn navigate(&self, url: &str) -> Result<()> {
		self.driver().navigate(url).await
	}

	async fn current_url(&self) -> Result<String> {
		self.driver().current_url().await
	}

	async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
		self.driver().evaluate(expression).await
	}

	async fn cookies(&self) -> Result<Vec<Cookie>> {
		self.driver().cookies().await
	}

	async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
		self.driver().set_cookies(cookies).await
	}

	async fn clear_cookies(&self) -> Result<()> {
		self.driver().clear_cookies().await
	}

	/// Release is the pool's job: the guard hands the driver back on drop,
	/// keeping the underlying browser alive for the next checkout.
	async fn close(&self) -> Result<()> {
		Ok(())
	}
}

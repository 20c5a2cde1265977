//! Client library for NotebookLM's internal batched-RPC API, driven through
//! a real automated browser session.
//!
//! The remote API is private and reverse-engineered; every call is executed
//! from inside an authenticated browser page so cookies and headers travel
//! exactly as the web app sends them. The crate is layered leaf-first:
//!
//! * [`auth`] — cookie credential set, persistence, completeness checks
//! * [`browser`] — driver seam over a CDP-controlled Chromium, plus a
//!   bounded driver pool
//! * [`session`] — the session manager: open/inject/call/close, anti-forgery
//!   token caching, one-shot transparent re-authentication
//! * [`retry`] — pure retry/backoff policy consulted on every remote call
//! * [`lro`] — generic poll-until-terminal tracker for asynchronous jobs
//! * [`ops`] — typed wrappers for the catalog of remote operations
//! * [`client`] — facade tying the above together
//!
//! Wire-level encoding and decoding live in the `nlm-protocol` crate.

pub mod auth;
pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod login;
pub mod lro;
pub mod ops;
pub mod retry;
pub mod session;

pub use auth::{Cookie, CredentialSet, CredentialStore};
pub use client::{Client, ClientOptions};
pub use config::SessionOptions;
pub use error::{Error, Result};
pub use lro::{JobStatus, PollSchedule};
pub use nlm_protocol::{RpcCall, Value};
pub use retry::RetryPolicy;
pub use session::Session;

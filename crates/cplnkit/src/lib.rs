//! # Cplnkit
//!
//! A small blocking client for the Control Plane management API.
//!
//! ## Features
//!
//! - **Org-rooted paths**: `/org/{org}/{kind}/{name}` and gvc-scoped
//!   `/org/{org}/gvc/{gvc}/{kind}/{name}`
//! - **Read-after-write**: create and update return the stored object
//! - **Retry**: rate limits are retried with exponential backoff; deletes also
//!   retry conflicts
//! - **Error categories**: not-found and conflict are distinguishable
//!
//! ## Example
//!
//! ```ignore
//! use cplnkit::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig::new("acme", token));
//! let gvc = client.get("gvc", None, "prod")?;
//! ```

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::Client;
pub use error::{Error, ErrorCategory, Result};
pub use retry::{LogCallback, NoCallback, RetryCallback, with_retry, with_retry_if};
pub use types::{ClientConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, RetryConfig};

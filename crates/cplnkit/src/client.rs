//! Blocking client for the management API.
//!
//! Paths are rooted at `/org/{org}`; kinds scoped to a gvc live under
//! `/org/{org}/gvc/{gvc}/{kind}`. Writes are followed by a read so callers
//! always get the server's view of the object back.

use crate::error::{Error, Result};
use crate::retry::{LogCallback, with_retry_if};
use crate::types::{ClientConfig, RetryConfig};
use serde_json::Value;

/// User-Agent sent with every request.
const USER_AGENT: &str = concat!("cplnform/", env!("CARGO_PKG_VERSION"));

/// Kinds whose GET must go through `/-reveal` to include secret data.
const REVEALED_KINDS: &[&str] = &["secret"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Management API client.
pub struct Client {
    agent: ureq::Agent,
    config: ClientConfig,
    retry: RetryConfig,
}

impl Client {
    /// Create a client with the default retry policy.
    pub fn new(config: ClientConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            config,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn org(&self) -> &str {
        &self.config.org
    }

    /// URL of a kind's collection.
    pub fn collection_url(&self, kind: &str, scope: Option<&str>) -> String {
        let org = &self.config.org;
        match scope {
            Some(gvc) => format!("{}/org/{org}/gvc/{gvc}/{kind}", self.config.endpoint),
            None => format!("{}/org/{org}/{kind}", self.config.endpoint),
        }
    }

    /// URL of one object.
    pub fn resource_url(&self, kind: &str, scope: Option<&str>, name: &str) -> String {
        format!("{}/{name}", self.collection_url(kind, scope))
    }

    fn read_url(&self, kind: &str, scope: Option<&str>, name: &str) -> String {
        let url = self.resource_url(kind, scope, name);
        if REVEALED_KINDS.contains(&kind) {
            format!("{url}/-reveal")
        } else {
            url
        }
    }

    /// Read one object.
    pub fn get(&self, kind: &str, scope: Option<&str>, name: &str) -> Result<Value> {
        let url = self.read_url(kind, scope, name);
        let body = self.send_with_retry(Method::Get, &url, None)?;
        parse_body(&body)
    }

    /// Create an object, then read it back.
    pub fn create(&self, kind: &str, scope: Option<&str>, object: &Value) -> Result<Value> {
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Other(format!("{kind} object has no name")))?;
        let url = self.collection_url(kind, scope);
        self.send_with_retry(Method::Post, &url, Some(object))?;
        self.get(kind, scope, name)
    }

    /// Apply a merge patch, then read the object back.
    pub fn update(&self, kind: &str, scope: Option<&str>, name: &str, patch: &Value) -> Result<Value> {
        let url = self.resource_url(kind, scope, name);
        self.send_with_retry(Method::Patch, &url, Some(patch))?;
        self.get(kind, scope, name)
    }

    /// Delete an object.
    ///
    /// Conflicts are retried too: a parent stays in use until the deletion of
    /// its children has settled.
    pub fn delete(&self, kind: &str, scope: Option<&str>, name: &str) -> Result<()> {
        let url = self.resource_url(kind, scope, name);
        with_retry_if(
            &self.retry,
            Some(&LogCallback),
            |e| e.is_retryable() || e.is_conflict(),
            || self.send(Method::Delete, &url, None),
        )?;
        Ok(())
    }

    fn send_with_retry(&self, method: Method, url: &str, body: Option<&Value>) -> Result<String> {
        with_retry_if(&self.retry, Some(&LogCallback), Error::is_retryable, || {
            self.send(method, url, body)
        })
    }

    /// One request. Non-2xx answers become [`Error::Status`] with the raw body.
    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<String> {
        log::debug!("{} {url}", method.as_str());
        let token = self.config.token.as_str();

        let response = match (method, body) {
            (Method::Get, _) => self
                .agent
                .get(url)
                .header("Authorization", token)
                .header("User-Agent", USER_AGENT)
                .call(),
            (Method::Delete, _) => self
                .agent
                .delete(url)
                .header("Authorization", token)
                .header("User-Agent", USER_AGENT)
                .call(),
            (Method::Post, Some(body)) => self
                .agent
                .post(url)
                .header("Authorization", token)
                .header("User-Agent", USER_AGENT)
                .send_json(body),
            (Method::Patch, Some(body)) => self
                .agent
                .patch(url)
                .header("Authorization", token)
                .header("User-Agent", USER_AGENT)
                .send_json(body),
            (Method::Post | Method::Patch, None) => {
                return Err(Error::Other(format!("{} {url} requires a body", method.as_str())));
            }
        };

        let mut response = response?;
        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        log::trace!("{} {url} -> {status}", method.as_str());

        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(Error::Status { status, body: text })
        }
    }
}

fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Err(Error::InvalidResponse("empty body".to_string()));
    }
    Ok(serde_json::from_str(body)?)
}

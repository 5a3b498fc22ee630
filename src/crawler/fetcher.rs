//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests for list, detail and region pages
//! - Error classification (transport, status, body)
//!
//! The orchestrator talks to a [`Fetcher`] trait object so tiers can be
//! exercised against fixture pages without a network.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::url::is_allowed_host;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of body characters kept in a failure snapshot
const SNAPSHOT_CHARS: usize = 200;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// A fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Page body content
    pub body: String,
}

/// Reasons a fetch contributes no page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status_code}")]
    Status {
        url: String,
        status_code: u16,
        /// Leading part of the response body
        snapshot: String,
    },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Status code of the failed response, if one arrived
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            Self::Transport { source, .. } | Self::Body { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
        }
    }

    /// Short description of whatever response was received
    pub fn response_snapshot(&self) -> &str {
        match self {
            Self::Status { snapshot, .. } => snapshot,
            Self::Transport { .. } => "<no response>",
            Self::Body { .. } => "<unreadable body>",
        }
    }

    /// True if the request timed out
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport { source, .. } | Self::Body { source, .. } => source.is_timeout(),
            Self::Status { .. } => false,
        }
    }
}

/// Fetches pages for the crawler tiers
///
/// Implementations issue a fresh request on every call; nothing is cached.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Redirect policy that only follows hops on `allowed_host`
///
/// An off-host hop is not followed; the redirect response itself is
/// returned and surfaces as a non-success status.
fn same_host_redirects(allowed_host: &str) -> Policy {
    let allowed_host = allowed_host.to_string();
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if is_allowed_host(attempt.url(), &allowed_host) {
            attempt.follow()
        } else {
            tracing::warn!(target_url = %attempt.url(), "Refusing off-host redirect");
            attempt.stop()
        }
    })
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use geo_harvest::config::{HttpConfig, UserAgentConfig};
/// use geo_harvest::crawler::build_http_client;
///
/// let client = build_http_client(
///     &UserAgentConfig::default(),
///     &HttpConfig::default(),
///     "www.worldcitiesdb.com",
/// )
/// .unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
    allowed_host: &str,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.value.clone())
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .redirect(same_host_redirects(allowed_host))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(
        user_agent: &UserAgentConfig,
        http: &HttpConfig,
        allowed_host: &str,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, http, allowed_host)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        tracing::debug!(url = %url, "sending request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        tracing::debug!(url = %final_url, status = status.as_u16(), "response received");

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
                snapshot: snapshot(&body),
            });
        }

        Ok(Page {
            url: final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Trims a response body down to a loggable snippet
fn snapshot(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= SNAPSHOT_CHARS {
        trimmed.to_string()
    } else {
        let mut cut: String = trimmed.chars().take(SNAPSHOT_CHARS).collect();
        cut.push('…');
        cut
    }
}

//! Connectivity resolver
//!
//! Before anything is handed to the fetch agent, this module:
//! - normalizes the caller's host into an origin
//! - probes the origin (following redirects) to see whether it answers
//! - reads robots.txt to raise the wait between requests if asked to

use crate::config::NetworkConfig;
use crate::robots::resolve_wait;
use crate::url::{normalize_origin, trim_trailing_slash};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirects followed by the reachability probe
const MAX_REDIRECTS: usize = 10;

/// Outcome of the reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachability {
    pub reachable: bool,
    /// Final URL after redirects, without trailing slash; only meaningful
    /// when `reachable` is true
    pub resolved_url: String,
}

/// Fully resolved crawl target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub reachable: bool,
    pub origin: String,
    pub wait_seconds: Option<u64>,
}

/// Builds the resolver's HTTP client
///
/// # Example
///
/// ```no_run
/// use warc_harvest::config::NetworkConfig;
/// use warc_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&NetworkConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &NetworkConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.probe_timeout_secs))
        .connect_timeout(Duration::from_secs(config.probe_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Probes an origin with a GET request
///
/// Any HTTP response, whatever its status, means the host is reachable.
/// Transport failures (DNS, refused connection, TLS, timeout) mean it is not.
pub async fn check_connection(client: &Client, origin: &str, timeout: Duration) -> Reachability {
    match client.get(origin).timeout(timeout).send().await {
        Ok(response) => {
            let resolved_url = trim_trailing_slash(response.url().as_str());
            tracing::debug!(
                "{} answered with HTTP {} (resolved to {})",
                origin,
                response.status().as_u16(),
                resolved_url
            );
            Reachability {
                reachable: true,
                resolved_url,
            }
        }
        Err(e) => {
            let kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection failed"
            } else if e.is_redirect() {
                "redirect error"
            } else {
                "request failed"
            };
            tracing::warn!("{} is not reachable ({}): {}", origin, kind, e);
            Reachability {
                reachable: false,
                resolved_url: origin.to_string(),
            }
        }
    }
}

/// Resolves a raw host into a crawl target
///
/// Normalizes the host, probes it, and for reachable origins resolves the
/// effective wait from robots.txt. An origin that cannot even be parsed is
/// treated as unreachable.
pub async fn resolve(
    client: &Client,
    raw_host: &str,
    caller_wait: Option<u64>,
    config: &NetworkConfig,
) -> Resolution {
    let origin = match normalize_origin(raw_host) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!("Cannot use '{}' as a crawl origin: {}", raw_host, e);
            return Resolution {
                reachable: false,
                origin: raw_host.to_string(),
                wait_seconds: caller_wait,
            };
        }
    };

    let probe = check_connection(
        client,
        &origin,
        Duration::from_secs(config.probe_timeout_secs),
    )
    .await;

    if !probe.reachable {
        return Resolution {
            reachable: false,
            origin,
            wait_seconds: caller_wait,
        };
    }

    let wait_seconds = resolve_wait(
        client,
        &probe.resolved_url,
        caller_wait,
        Duration::from_secs(config.robots_timeout_secs),
    )
    .await;

    Resolution {
        reachable: true,
        origin: probe.resolved_url,
        wait_seconds,
    }
}

//! Robots.txt handling module
//!
//! Fetches an origin's robots.txt and derives the wait between requests the
//! fetch agent should honor. Every failure here is recoverable: the crawl
//! proceeds with the wait the caller asked for.

mod parser;

pub use parser::ParsedRobots;

use crate::url::robots_url;
use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;

/// Fetches robots.txt for an origin
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - The resolved origin, e.g. `http://example.com`
/// * `timeout` - Upper bound for the whole request
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - Successfully fetched robots.txt
/// * `Err(HarvestError)` - Transport failure or non-success status
pub async fn fetch_robots(
    client: &Client,
    origin: &str,
    timeout: Duration,
) -> Result<ParsedRobots, HarvestError> {
    let url = robots_url(origin);
    tracing::debug!("Fetching {}", url);

    let body = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(ParsedRobots::from_content(&body))
}

/// Resolves the effective wait for an origin
///
/// Returns the larger of `caller_wait` and the robots.txt crawl delay. If
/// robots.txt cannot be fetched, a warning is logged and `caller_wait` is
/// returned unchanged.
pub async fn resolve_wait(
    client: &Client,
    origin: &str,
    caller_wait: Option<u64>,
    timeout: Duration,
) -> Option<u64> {
    match fetch_robots(client, origin, timeout).await {
        Ok(robots) => {
            let wait = robots.effective_wait(caller_wait);
            if wait != caller_wait {
                tracing::info!(
                    "robots.txt Crawl-delay raises wait from {:?} to {:?} seconds",
                    caller_wait,
                    wait
                );
            }
            wait
        }
        Err(e) => {
            tracing::warn!("error downloading robots.txt: {}", e);
            caller_wait
        }
    }
}

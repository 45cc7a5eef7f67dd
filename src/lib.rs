//! warc-harvest: single-host crawl-and-archive pipeline
//!
//! This crate resolves a target host, delegates the actual mirroring to an
//! external fetch agent (wget) under a time guard, and rewrites the raw web
//! archive the agent leaves behind into a filtered, gzip-compressed WARC that
//! downstream text pipelines can consume safely.

pub mod config;
pub mod crawler;
pub mod robots;
pub mod state;
pub mod url;
pub mod warc;

use thiserror::Error;

/// Main error type for warc-harvest operations
///
/// Only conditions that stop a request from producing its final archive end
/// up here. Recoverable conditions (unreachable origin, robots failures,
/// partial crawls, corrupt trailing records) are logged and absorbed.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelineState,
        to: state::PipelineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Archive name must end in .warc.gz, got '{0}'")]
    InvalidArchiveName(String),

    #[error("Invalid time limit '{0}': expected an integer with an optional s/m/h/d suffix")]
    InvalidTimeLimit(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for warc-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::{CrawlRequest, Settings};
pub use crawler::{run_pipeline, CrawlOutcome, CrawlReport, ExitStatus, FetchAgent};
pub use state::PipelineState;
pub use url::normalize_origin;
pub use warc::{rewrite_archive, RewriteStats};

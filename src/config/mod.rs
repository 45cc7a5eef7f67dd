//! Configuration module for warc-harvest
//!
//! This module handles the optional TOML settings file (fetch agent and
//! network settings) and the construction of validated crawl requests.
//!
//! # Example
//!
//! ```no_run
//! use warc_harvest::config::{load_settings, CrawlRequest};
//! use std::path::Path;
//!
//! let settings = load_settings(Path::new("harvest.toml")).unwrap();
//! let request = CrawlRequest::builder("example.com", "mirror", "example.warc.gz")
//!     .time_limit("1h")
//!     .build()
//!     .unwrap();
//! println!("{} -> {}", settings.fetch_agent.program, request.final_archive_path().display());
//! ```

mod parser;
mod request;
mod types;
mod validation;

// Re-export types
pub use request::{CrawlRequest, CrawlRequestBuilder, TimeLimit, ARCHIVE_SUFFIX};
pub use types::{
    FetchAgentConfig, NetworkConfig, Settings, DEFAULT_METADATA_PREFIX,
    DEFAULT_TIMEOUT_EXIT_CODE,
};

// Re-export parser functions
pub use parser::{compute_settings_hash, load_settings, load_settings_with_hash, parse_settings};

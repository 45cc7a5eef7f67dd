//! Crawler module: everything between a crawl request and its final archive
//!
//! - Connectivity resolution and robots.txt crawl delay
//! - Fetch agent capability probing
//! - Building and executing the fetch agent invocation
//! - Overall pipeline coordination

mod capability;
mod command;
mod coordinator;
mod executor;
mod resolver;

pub use capability::{AgentCapabilities, FetchAgent, NO_WARC_COMPRESSION};
pub use command::{build_command, CrawlCommand};
pub use coordinator::{run_pipeline, CrawlReport, Pipeline};
pub use executor::{classify_exit, execute, CrawlOutcome, ExitStatus};
pub use resolver::{build_http_client, check_connection, resolve, Reachability, Resolution};

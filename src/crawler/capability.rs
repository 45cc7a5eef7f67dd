//! Fetch agent capability detection
//!
//! wget only accepts `--no-warc-compression` when built with zlib support,
//! and older builds lack the flag altogether. Support is detected by scanning
//! the agent's `--help` output once; the answer is cached on the
//! [`FetchAgent`] for the rest of the process.

use crate::config::FetchAgentConfig;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Flag that asks the agent for an uncompressed archive
pub const NO_WARC_COMPRESSION: &str = "--no-warc-compression";

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// What the installed fetch agent supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentCapabilities {
    pub no_warc_compression: bool,
}

/// The external fetch agent plus its lazily probed capabilities
#[derive(Debug)]
pub struct FetchAgent {
    config: FetchAgentConfig,
    capabilities: OnceCell<AgentCapabilities>,
}

impl FetchAgent {
    pub fn new(config: FetchAgentConfig) -> Self {
        Self {
            config,
            capabilities: OnceCell::new(),
        }
    }

    /// Creates an agent whose capabilities are already known
    pub fn with_capabilities(config: FetchAgentConfig, capabilities: AgentCapabilities) -> Self {
        Self {
            config,
            capabilities: OnceCell::new_with(Some(capabilities)),
        }
    }

    pub fn config(&self) -> &FetchAgentConfig {
        &self.config
    }

    /// Returns the agent's capabilities, probing on first use only
    pub async fn capabilities(&self) -> AgentCapabilities {
        *self
            .capabilities
            .get_or_init(|| async {
                let no_warc_compression =
                    help_mentions(&self.config.program, NO_WARC_COMPRESSION).await;
                tracing::debug!(
                    "{} supports {}: {}",
                    self.config.program,
                    NO_WARC_COMPRESSION,
                    no_warc_compression
                );
                AgentCapabilities {
                    no_warc_compression,
                }
            })
            .await
    }
}

/// Runs `<program> --help` and checks whether its output mentions `needle`
///
/// A missing program, a hung probe or a failing exit status all count as
/// "not supported".
async fn help_mentions(program: &str, needle: &str) -> bool {
    let needle = needle.trim_start_matches('-');
    let probe = Command::new(program)
        .arg("--help")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(output)) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).contains(needle)
        }
        Ok(Ok(output)) => {
            tracing::debug!("{} --help exited with {}", program, output.status);
            false
        }
        Ok(Err(e)) => {
            tracing::debug!("Could not run {} --help: {}", program, e);
            false
        }
        Err(_) => {
            tracing::debug!("{} --help did not finish within {:?}", program, PROBE_TIMEOUT);
            false
        }
    }
}

//! Crawl executor
//!
//! Runs the fetch agent as a child process and classifies how it ended.
//! Only a failure to start the agent is fatal; the agent mirrors on a
//! best-effort basis, so any other non-zero exit still leaves a usable
//! (possibly partial) raw archive behind.

use crate::config::FetchAgentConfig;
use crate::crawler::command::CrawlCommand;
use crate::HarvestError;
use std::fmt;
use std::time::Instant;

/// Guard exit code: the guarded program could not be executed
const GUARD_CANNOT_EXECUTE: i32 = 126;

/// Guard exit code: the guarded program was not found
const GUARD_NOT_FOUND: i32 = 127;

/// How a crawl attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    /// Agent exited with code 0
    Success,
    /// Agent exited non-zero or was killed by a signal; some resources failed
    PartialFailure,
    /// Time guard stopped the agent
    TimedOut,
    /// Agent could not be started at all
    HardFailure,
}

impl ExitStatus {
    /// True if the pipeline should go on to rewrite the raw archive
    pub fn proceeds_to_rewrite(&self) -> bool {
        !matches!(self, Self::HardFailure)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
            Self::TimedOut => "timed_out",
            Self::HardFailure => "hard_failure",
        };
        write!(f, "{}", name)
    }
}

/// Result of one crawl attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrawlOutcome {
    pub status: ExitStatus,
    /// Raw exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub elapsed_secs: f64,
}

/// Classifies an exit code
///
/// # Rules
///
/// | Condition | Status |
/// |-----------|--------|
/// | code 0 | Success |
/// | guarded and code == guard timeout code | TimedOut |
/// | guarded and code 126/127 | HardFailure |
/// | any other code, or killed by a signal | PartialFailure |
pub fn classify_exit(code: Option<i32>, guarded: bool, timeout_exit_code: i32) -> ExitStatus {
    match code {
        Some(0) => ExitStatus::Success,
        Some(c) if guarded && c == timeout_exit_code => ExitStatus::TimedOut,
        Some(GUARD_CANNOT_EXECUTE | GUARD_NOT_FOUND) if guarded => ExitStatus::HardFailure,
        _ => ExitStatus::PartialFailure,
    }
}

/// Runs a crawl command to completion
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The process ran; see `status` for how it ended
/// * `Err(HarvestError::Launch)` - The process could not be spawned
pub async fn execute(
    command: &CrawlCommand,
    agent: &FetchAgentConfig,
) -> Result<CrawlOutcome, HarvestError> {
    tracing::info!("Executing: {}", command);

    let start = Instant::now();
    let status = command
        .to_command()
        .status()
        .await
        .map_err(|source| HarvestError::Launch {
            program: command.program.clone(),
            source,
        })?;
    let elapsed_secs = start.elapsed().as_secs_f64();

    let exit_code = status.code();
    let outcome = CrawlOutcome {
        status: classify_exit(exit_code, command.guarded, agent.timeout_exit_code),
        exit_code,
        elapsed_secs,
    };

    match outcome.status {
        ExitStatus::Success => {}
        ExitStatus::TimedOut => {
            tracing::warn!("some files could not be downloaded with the fetch agent (timeout)")
        }
        ExitStatus::PartialFailure => match exit_code {
            Some(code) => tracing::warn!(
                "some files could not be downloaded with the fetch agent (return code: {})",
                code
            ),
            None => tracing::warn!(
                "some files could not be downloaded with the fetch agent (terminated by signal)"
            ),
        },
        ExitStatus::HardFailure => tracing::error!(
            "{} could not start {} (return code: {:?})",
            command.program,
            command.agent_program(),
            exit_code
        ),
    }

    tracing::info!("The crawling took {:.0} seconds", elapsed_secs);

    Ok(outcome)
}

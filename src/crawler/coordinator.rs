//! Pipeline coordinator - runs one crawl request end to end
//!
//! The stages run strictly in order, each blocking until the previous one's
//! files are on disk:
//! - resolve the origin (reachability + robots.txt crawl delay)
//! - build and execute the fetch agent invocation
//! - rewrite the raw archive into the final archive and delete the raw one
//!
//! An unreachable origin short-circuits to an empty final archive.

use crate::config::{CrawlRequest, Settings};
use crate::crawler::capability::FetchAgent;
use crate::crawler::command::build_command;
use crate::crawler::executor::{execute, CrawlOutcome, ExitStatus};
use crate::crawler::resolver::{build_http_client, resolve};
use crate::state::PipelineState;
use crate::warc::{rewrite_archive, write_empty_archive, RewriteStats};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::io;
use std::path::Path;

/// Summary of one processed crawl request
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub final_state: PipelineState,
    /// Origin after normalization and redirects
    pub origin: String,
    pub effective_wait: Option<u64>,
    /// `None` when the agent never ran
    pub outcome: Option<CrawlOutcome>,
    /// `None` when no rewrite took place
    pub rewrite: Option<RewriteStats>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs crawl requests with one settings set and one fetch agent
pub struct Pipeline {
    settings: Settings,
    agent: FetchAgent,
    client: Client,
}

impl Pipeline {
    /// Creates a pipeline; the agent's capabilities are probed lazily
    pub fn new(settings: Settings) -> Result<Self, HarvestError> {
        let agent = FetchAgent::new(settings.fetch_agent.clone());
        Self::with_agent(settings, agent)
    }

    /// Creates a pipeline around an existing fetch agent
    pub fn with_agent(settings: Settings, agent: FetchAgent) -> Result<Self, HarvestError> {
        let client = build_http_client(&settings.network)?;
        Ok(Self {
            settings,
            agent,
            client,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Processes one crawl request
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Final archive written (empty if the origin was unreachable)
    /// * `Err(HarvestError)` - Fetch agent could not be launched, or the
    ///   final archive could not be written
    pub async fn run(&self, request: &CrawlRequest) -> Result<CrawlReport, HarvestError> {
        let started_at = Utc::now();
        let mut tracker = StateTracker::new(request.origin());

        ensure_parent_dir(&request.final_archive_path())?;

        let resolution = resolve(
            &self.client,
            request.origin(),
            request.wait_seconds(),
            &self.settings.network,
        )
        .await;

        if !resolution.reachable {
            tracker.advance(PipelineState::Unreachable)?;
            tracker.advance(PipelineState::EmptyArchive)?;

            let output = request.final_archive_path();
            write_empty_archive(&output)?;
            tracing::info!("Wrote empty archive {}", output.display());

            tracker.advance(PipelineState::Done)?;
            return Ok(CrawlReport {
                final_state: tracker.state(),
                origin: resolution.origin,
                effective_wait: resolution.wait_seconds,
                outcome: None,
                rewrite: None,
                started_at,
                finished_at: Utc::now(),
            });
        }

        tracker.advance(PipelineState::Reachable)?;
        let request = request.resolved(resolution.origin, resolution.wait_seconds);

        tracker.advance(PipelineState::Build)?;
        let capabilities = self.agent.capabilities().await;
        let command = build_command(&request, self.agent.config(), capabilities);

        // An agent that compresses writes straight to the final name; a
        // leftover from an earlier run must not pass for this crawl's output
        let agent_compresses = !capabilities.no_warc_compression;
        if agent_compresses {
            remove_stale(&request.final_archive_path())?;
        }

        tracker.advance(PipelineState::Execute)?;
        let outcome = match execute(&command, self.agent.config()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracker.advance(PipelineState::Aborted)?;
                return Err(e);
            }
        };

        if !outcome.status.proceeds_to_rewrite() {
            tracker.advance(PipelineState::Aborted)?;
            return Err(HarvestError::Launch {
                program: command.agent_program().to_string(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("guard exited with code {:?}", outcome.exit_code),
                ),
            });
        }

        tracker.advance(PipelineState::Rewrite)?;
        let rewrite = self.rewrite(&request, outcome.status, agent_compresses).await?;

        tracker.advance(PipelineState::Done)?;
        Ok(CrawlReport {
            final_state: tracker.state(),
            origin: request.origin().to_string(),
            effective_wait: request.wait_seconds(),
            outcome: Some(outcome),
            rewrite: Some(rewrite),
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Rewrites the raw archive and removes it afterwards
    ///
    /// When the agent compressed its own output, that file sits at the final
    /// archive path; it is moved to the raw path and rewritten from there.
    /// A missing raw archive (agent stopped before writing one) yields an
    /// empty final archive.
    async fn rewrite(
        &self,
        request: &CrawlRequest,
        status: ExitStatus,
        agent_compresses: bool,
    ) -> Result<RewriteStats, HarvestError> {
        let raw = request.raw_archive_path();
        let output = request.final_archive_path();

        if agent_compresses && !raw.exists() && output.exists() {
            tracing::debug!(
                "Fetch agent wrote compressed archive {}, moving it to {}",
                output.display(),
                raw.display()
            );
            std::fs::rename(&output, &raw)?;
        }

        if !raw.exists() {
            tracing::warn!(
                "No raw archive at {} after {} crawl, writing empty archive",
                raw.display(),
                status
            );
            write_empty_archive(&output)?;
            return Ok(RewriteStats::default());
        }

        let prefix = self.settings.fetch_agent.metadata_prefix.clone();
        let (raw_path, output_path) = (raw.clone(), output.clone());
        let stats = tokio::task::spawn_blocking(move || {
            rewrite_archive(&raw_path, &output_path, &prefix)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        if let Err(e) = std::fs::remove_file(&raw) {
            tracing::warn!("Could not remove raw archive {}: {}", raw.display(), e);
        }

        Ok(stats)
    }
}

/// Runs a single crawl request with a fresh pipeline
///
/// This is the main library entry point. Fleets that crawl many hosts should
/// build one [`Pipeline`] and reuse it, so the fetch agent is probed once,
/// giving each request its own output directory and archive name.
pub async fn run_pipeline(
    settings: Settings,
    request: &CrawlRequest,
) -> Result<CrawlReport, HarvestError> {
    Pipeline::new(settings)?.run(request).await
}

/// Enforces legal pipeline state transitions
struct StateTracker<'a> {
    origin: &'a str,
    state: PipelineState,
}

impl<'a> StateTracker<'a> {
    fn new(origin: &'a str) -> Self {
        Self {
            origin,
            state: PipelineState::Init,
        }
    }

    fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("{}: {} -> {}", self.origin, self.state, next);
        self.state = next;
        Ok(())
    }
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed stale archive {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

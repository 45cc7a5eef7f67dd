/// Pipeline state definitions for one crawl request
///
/// A request moves through these states strictly in order; `Done` and
/// `Aborted` are terminal.
use std::fmt;

/// Represents the current state of a crawl request's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    // ===== Active States =====
    /// Request accepted, origin not yet probed
    Init,

    /// Origin answered the reachability probe
    Reachable,

    /// Origin did not answer; no crawl will run
    Unreachable,

    /// Fetch agent invocation is being built
    Build,

    /// Fetch agent is running
    Execute,

    /// Raw archive is being rewritten into the final archive
    Rewrite,

    /// Empty final archive is being written for an unreachable origin
    EmptyArchive,

    // ===== Terminal States =====
    /// Final archive is on disk
    Done,

    /// Fetch agent could not be launched; no archive produced
    Aborted,
}

impl PipelineState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if the state leads to a final archive on disk
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` may follow this state
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Reachable)
                | (Self::Init, Self::Unreachable)
                | (Self::Unreachable, Self::EmptyArchive)
                | (Self::EmptyArchive, Self::Done)
                | (Self::Reachable, Self::Build)
                | (Self::Build, Self::Execute)
                | (Self::Execute, Self::Rewrite)
                | (Self::Execute, Self::Aborted)
                | (Self::Rewrite, Self::Done)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
            Self::Build => "build",
            Self::Execute => "execute",
            Self::Rewrite => "rewrite",
            Self::EmptyArchive => "empty_archive",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

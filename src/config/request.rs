//! Crawl request construction
//!
//! A [`CrawlRequest`] describes one host crawl. It is validated once, when it
//! is built, and is immutable afterwards; the only derived variant is the one
//! carrying the effective wait after robots.txt has been consulted.

use crate::ConfigError;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Suffix every caller-supplied archive name must carry
pub const ARCHIVE_SUFFIX: &str = ".warc.gz";

/// A crawl time limit in the guard program's duration syntax
///
/// Accepts a positive integer with an optional single unit letter
/// (`s`, `m`, `h` or `d`), e.g. `90`, `30s`, `10m`, `2h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimit {
    amount: u64,
    unit: Option<char>,
}

impl TimeLimit {
    /// Returns the limit as a `Duration`
    pub fn as_duration(&self) -> Duration {
        let factor = match self.unit {
            None | Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some(_) => 24 * 60 * 60,
        };
        Duration::from_secs(self.amount.saturating_mul(factor))
    }
}

impl FromStr for TimeLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidTimeLimit(s.to_string());
        let trimmed = s.trim();

        let (digits, unit) = match trimmed.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => (&trimmed[..trimmed.len() - 1], Some(c)),
            Some(_) => (trimmed, None),
            None => return Err(invalid()),
        };

        if let Some(c) = unit {
            if !matches!(c, 's' | 'm' | 'h' | 'd') {
                return Err(invalid());
            }
        }

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let amount: u64 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }

        Ok(Self { amount, unit })
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{}{}", self.amount, unit),
            None => write!(f, "{}", self.amount),
        }
    }
}

/// One host crawl, as requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    origin: String,
    output_dir: PathBuf,
    time_limit: Option<TimeLimit>,
    user_agent: Option<String>,
    file_types: Option<Vec<String>>,
    archive_base: PathBuf,
    wait_seconds: Option<u64>,
}

impl CrawlRequest {
    /// Starts building a request for `origin`, mirroring into `output_dir`
    /// and archiving to `archive_name` (which must end in `.warc.gz`)
    pub fn builder(
        origin: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        archive_name: impl Into<PathBuf>,
    ) -> CrawlRequestBuilder {
        CrawlRequestBuilder {
            origin: origin.into(),
            output_dir: output_dir.into(),
            archive_name: archive_name.into(),
            time_limit: None,
            user_agent: None,
            file_types: None,
            wait_seconds: None,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn time_limit(&self) -> Option<TimeLimit> {
        self.time_limit
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn file_types(&self) -> Option<&[String]> {
        self.file_types.as_deref()
    }

    pub fn wait_seconds(&self) -> Option<u64> {
        self.wait_seconds
    }

    /// Archive path without the `.warc.gz` suffix, as handed to the agent
    pub fn archive_base(&self) -> &Path {
        &self.archive_base
    }

    /// Uncompressed archive the fetch agent writes
    pub fn raw_archive_path(&self) -> PathBuf {
        with_suffix(&self.archive_base, ".warc")
    }

    /// Compressed, filtered archive this pipeline guarantees to produce
    pub fn final_archive_path(&self) -> PathBuf {
        with_suffix(&self.archive_base, ARCHIVE_SUFFIX)
    }

    /// Returns a copy resolved against a reachable origin and an effective wait
    pub fn resolved(&self, origin: impl Into<String>, wait_seconds: Option<u64>) -> Self {
        Self {
            origin: origin.into(),
            wait_seconds,
            ..self.clone()
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Builder for [`CrawlRequest`]; all validation happens in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct CrawlRequestBuilder {
    origin: String,
    output_dir: PathBuf,
    archive_name: PathBuf,
    time_limit: Option<String>,
    user_agent: Option<String>,
    file_types: Option<String>,
    wait_seconds: Option<u64>,
}

impl CrawlRequestBuilder {
    /// Time limit in guard syntax, e.g. `"1h"`
    pub fn time_limit(mut self, limit: impl Into<String>) -> Self {
        self.time_limit = Some(limit.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Comma-separated extension list, e.g. `"html,pdf"`
    pub fn file_types(mut self, types: impl Into<String>) -> Self {
        self.file_types = Some(types.into());
        self
    }

    pub fn wait_seconds(mut self, wait: u64) -> Self {
        self.wait_seconds = Some(wait);
        self
    }

    pub fn build(self) -> Result<CrawlRequest, ConfigError> {
        if self.origin.trim().is_empty() {
            return Err(ConfigError::InvalidUrl("origin cannot be empty".to_string()));
        }

        let archive_base = archive_base_from(&self.archive_name)?;

        let time_limit = self
            .time_limit
            .as_deref()
            .map(TimeLimit::from_str)
            .transpose()?;

        if let Some(agent) = &self.user_agent {
            if agent.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "user agent cannot be empty".to_string(),
                ));
            }
        }

        let file_types = self.file_types.as_deref().map(parse_file_types).transpose()?;

        Ok(CrawlRequest {
            origin: self.origin,
            output_dir: self.output_dir,
            time_limit,
            user_agent: self.user_agent,
            file_types,
            archive_base,
            wait_seconds: self.wait_seconds,
        })
    }
}

/// Strips `.warc.gz` from a caller-supplied archive name
fn archive_base_from(archive_name: &Path) -> Result<PathBuf, ConfigError> {
    let display = archive_name.to_string_lossy().into_owned();
    let name = archive_name
        .to_str()
        .ok_or_else(|| ConfigError::InvalidArchiveName(display.clone()))?;

    match name.strip_suffix(ARCHIVE_SUFFIX) {
        Some(base) if !base.is_empty() && !base.ends_with('/') => Ok(PathBuf::from(base)),
        _ => Err(ConfigError::InvalidArchiveName(display)),
    }
}

fn parse_file_types(raw: &str) -> Result<Vec<String>, ConfigError> {
    let types: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().trim_start_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if types.is_empty() {
        return Err(ConfigError::Validation(format!(
            "file type list '{}' contains no extensions",
            raw
        )));
    }

    Ok(types)
}

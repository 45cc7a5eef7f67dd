//! Crawl command builder
//!
//! Translates a [`CrawlRequest`] into an explicit argument list for the
//! fetch agent. Nothing passes through a shell, so origins and user agents
//! are never interpreted.

use crate::config::{CrawlRequest, FetchAgentConfig};
use crate::crawler::capability::{AgentCapabilities, NO_WARC_COMPRESSION};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

/// A fully built program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCommand {
    pub program: String,
    pub args: Vec<String>,
    /// True when `program` is the time guard wrapping the agent
    pub guarded: bool,
}

impl CrawlCommand {
    /// Converts into a runnable process with a closed stdin
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        cmd
    }

    /// The fetch agent's program name, whether or not it is guarded
    pub fn agent_program(&self) -> &str {
        if self.guarded {
            self.args.get(1).map(String::as_str).unwrap_or(&self.program)
        } else {
            &self.program
        }
    }
}

impl fmt::Display for CrawlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Builds the fetch agent invocation for a request
///
/// # Argument layout
///
/// ```text
/// [<guard> <limit>] <agent> --mirror [--wait N] [-A types] -q -o /dev/null
///     <origin> -P <output-dir> [--user-agent UA] --warc-file <base> [--no-warc-compression]
/// ```
///
/// Pure: the same request, config and capabilities always give the same command.
pub fn build_command(
    request: &CrawlRequest,
    agent: &FetchAgentConfig,
    capabilities: AgentCapabilities,
) -> CrawlCommand {
    let mut args: Vec<String> = vec!["--mirror".to_string()];

    if let Some(wait) = request.wait_seconds() {
        args.push("--wait".to_string());
        args.push(wait.to_string());
    }

    if let Some(types) = request.file_types() {
        args.push("-A".to_string());
        args.push(types.join(","));
    }

    args.extend(["-q", "-o", "/dev/null"].map(String::from));
    args.push(request.origin().to_string());
    args.push("-P".to_string());
    args.push(request.output_dir().to_string_lossy().into_owned());

    if let Some(agent_name) = request.user_agent() {
        args.push("--user-agent".to_string());
        args.push(agent_name.to_string());
    }

    args.push("--warc-file".to_string());
    args.push(request.archive_base().to_string_lossy().into_owned());

    if capabilities.no_warc_compression {
        args.push(NO_WARC_COMPRESSION.to_string());
    }

    match request.time_limit() {
        Some(limit) => {
            let mut guarded = vec![limit.to_string(), agent.program.clone()];
            guarded.extend(args);
            CrawlCommand {
                program: agent.guard_program.clone(),
                args: guarded,
                guarded: true,
            }
        }
        None => CrawlCommand {
            program: agent.program.clone(),
            args,
            guarded: false,
        },
    }
}

/// Quotes an argument for display only; commands are never run through a shell
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

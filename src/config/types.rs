use serde::Deserialize;

/// Canonical exit code of coreutils `timeout` when the guarded command ran out of time
pub const DEFAULT_TIMEOUT_EXIT_CODE: i32 = 124;

/// URI prefix wget uses for its own bookkeeping records
pub const DEFAULT_METADATA_PREFIX: &str = "metadata://gnu.org/software/wget/warc/";

/// Main settings structure for warc-harvest
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(rename = "fetch-agent", default)]
    pub fetch_agent: FetchAgentConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// External fetch agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchAgentConfig {
    /// Fetch agent binary (resolved through PATH)
    #[serde(default = "default_program")]
    pub program: String,

    /// Bounded-duration guard binary used when a time limit is set
    #[serde(rename = "guard-program", default = "default_guard_program")]
    pub guard_program: String,

    /// Exit code the guard reports when it had to kill the agent
    #[serde(rename = "timeout-exit-code", default = "default_timeout_exit_code")]
    pub timeout_exit_code: i32,

    /// Target-URI prefix of records the agent writes for its own bookkeeping
    #[serde(rename = "metadata-prefix", default = "default_metadata_prefix")]
    pub metadata_prefix: String,
}

/// Network settings for the connectivity resolver
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Reachability probe timeout (seconds)
    #[serde(rename = "probe-timeout-secs", default = "default_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// robots.txt fetch timeout (seconds)
    #[serde(rename = "robots-timeout-secs", default = "default_timeout_secs")]
    pub robots_timeout_secs: u64,

    /// User agent of the resolver's own HTTP client
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchAgentConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            guard_program: default_guard_program(),
            timeout_exit_code: default_timeout_exit_code(),
            metadata_prefix: default_metadata_prefix(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_timeout_secs(),
            robots_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_program() -> String {
    "wget".to_string()
}

fn default_guard_program() -> String {
    "timeout".to_string()
}

fn default_timeout_exit_code() -> i32 {
    DEFAULT_TIMEOUT_EXIT_CODE
}

fn default_metadata_prefix() -> String {
    DEFAULT_METADATA_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("warc-harvest/{}", env!("CARGO_PKG_VERSION"))
}

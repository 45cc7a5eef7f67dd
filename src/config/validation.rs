use crate::config::types::{FetchAgentConfig, NetworkConfig, Settings};
use crate::ConfigError;

const MAX_TIMEOUT_SECS: u64 = 300;

/// Validates the entire settings structure
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_fetch_agent_config(&settings.fetch_agent)?;
    validate_network_config(&settings.network)?;
    Ok(())
}

/// Validates fetch agent configuration
fn validate_fetch_agent_config(config: &FetchAgentConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "fetch-agent program cannot be empty".to_string(),
        ));
    }

    if config.guard_program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "guard-program cannot be empty".to_string(),
        ));
    }

    if !(1..=255).contains(&config.timeout_exit_code) {
        return Err(ConfigError::Validation(format!(
            "timeout-exit-code must be between 1 and 255, got {}",
            config.timeout_exit_code
        )));
    }

    if !config.metadata_prefix.contains("://") {
        return Err(ConfigError::InvalidUrl(format!(
            "metadata-prefix must be a URI prefix, got '{}'",
            config.metadata_prefix
        )));
    }

    Ok(())
}

/// Validates network configuration
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    validate_timeout("probe-timeout-secs", config.probe_timeout_secs)?;
    validate_timeout("robots-timeout-secs", config.robots_timeout_secs)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "network user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_timeout(name: &str, secs: u64) -> Result<(), ConfigError> {
    if secs < 1 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_TIMEOUT_SECS, secs
        )));
    }
    Ok(())
}

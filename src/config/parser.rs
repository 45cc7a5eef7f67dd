use crate::config::types::Settings;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a settings file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML settings file
///
/// # Returns
///
/// * `Ok(Settings)` - Successfully loaded and validated settings
/// * `Err(ConfigError)` - Failed to load, parse, or validate the settings
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use warc_harvest::config::load_settings;
///
/// let settings = load_settings(Path::new("harvest.toml")).unwrap();
/// println!("Fetch agent: {}", settings.fetch_agent.program);
/// ```
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Parses and validates settings from TOML text
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(content)?;
    validate(&settings)?;
    Ok(settings)
}

/// Computes a SHA-256 hash of the settings file content
///
/// Logged at startup so that runs with different settings can be told apart.
pub fn compute_settings_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads settings and returns both the settings and their hash
pub fn load_settings_with_hash(path: &Path) -> Result<(Settings, String), ConfigError> {
    let settings = load_settings(path)?;
    let hash = compute_settings_hash(path)?;
    Ok((settings, hash))
}

//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `TH_*`
//! environment variables, and merging them with proper precedence rules.
//! The harvesting core itself only ever sees a [`HarvestConfig`].

use crate::error::HarvestError;
use crate::types::{HarvestConfig, Strategy};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound accepted for the optional concurrency cap.
pub const MAX_CONCURRENCY: usize = 10_000;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Aggregation strategy ("locked" or "channel")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Concurrency cap; unset means unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Request timeout (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// How many times to repeat the URL list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<usize>,

    /// Record pages without a title under an empty title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_untitled: Option<bool>,

    /// User-Agent override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Default JSON output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl DefaultsConfig {
    /// Overlay these defaults onto `config`. Values already validated by
    /// [`ConfigManager::load_file`]; unparsable ones are rejected again here.
    pub fn apply(&self, mut config: HarvestConfig) -> Result<HarvestConfig, HarvestError> {
        if let Some(strategy) = &self.strategy {
            config.strategy = strategy.parse::<Strategy>()?;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = Some(concurrency);
        }
        if let Some(timeout) = &self.timeout {
            let duration = parse_duration(timeout).ok_or_else(|| {
                HarvestError::config(format!("Invalid timeout format '{}'", timeout))
            })?;
            config.timeout = Some(duration);
        }
        if let Some(record_untitled) = self.record_untitled {
            config.record_untitled = record_untitled;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = Some(user_agent.clone());
        }
        Ok(config)
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, HarvestError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HarvestError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HarvestError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            HarvestError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config < global (`$HOME`) config < local (current directory) config.
    /// Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, HarvestError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                debug!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./title-harvest.toml", "./.title-harvest.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".title-harvest.toml", "title-harvest.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("title-harvest").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations. Values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    strategy: higher_defaults.strategy.or(lower_defaults.strategy),
                    concurrency: higher_defaults.concurrency.or(lower_defaults.concurrency),
                    timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                    repeat: higher_defaults.repeat.or(lower_defaults.repeat),
                    record_untitled: higher_defaults
                        .record_untitled
                        .or(lower_defaults.record_untitled),
                    user_agent: higher_defaults.user_agent.or(lower_defaults.user_agent),
                    json: higher_defaults.json.or(lower_defaults.json),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), HarvestError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(strategy) = &defaults.strategy {
            strategy.parse::<Strategy>()?;
        }

        if let Some(concurrency) = defaults.concurrency {
            if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                return Err(HarvestError::config(format!(
                    "Concurrency must be between 1 and {}",
                    MAX_CONCURRENCY
                )));
            }
        }

        if let Some(timeout_str) = &defaults.timeout {
            if parse_duration(timeout_str).is_none() {
                return Err(HarvestError::config(format!(
                    "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                    timeout_str
                )));
            }
        }

        if let Some(user_agent) = &defaults.user_agent {
            if user_agent.trim().is_empty() {
                return Err(HarvestError::config("user_agent cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Values come from `TH_*` variables; invalid values are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub strategy: Option<Strategy>,
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub repeat: Option<usize>,
    pub json: Option<bool>,
    pub file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from any key lookup. Split out so it can be tested
/// without touching the process environment.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("TH_STRATEGY") {
        match val.parse::<Strategy>() {
            Ok(strategy) => env_config.strategy = Some(strategy),
            Err(_) => warn!("Invalid TH_STRATEGY='{}', use locked/channel", val),
        }
    }

    if let Some(val) = lookup("TH_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(n) if (1..=MAX_CONCURRENCY).contains(&n) => env_config.concurrency = Some(n),
            _ => warn!(
                "Invalid TH_CONCURRENCY='{}', must be 1-{}",
                val, MAX_CONCURRENCY
            ),
        }
    }

    if let Some(val) = lookup("TH_TIMEOUT") {
        match parse_duration(&val) {
            Some(duration) => env_config.timeout = Some(duration),
            None => warn!(
                "Invalid TH_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                val
            ),
        }
    }

    if let Some(val) = lookup("TH_REPEAT") {
        match val.trim().parse::<usize>() {
            Ok(n) => env_config.repeat = Some(n),
            Err(_) => warn!("Invalid TH_REPEAT='{}', must be a whole number", val),
        }
    }

    if let Some(val) = lookup("TH_JSON") {
        match parse_bool(&val) {
            Some(json) => env_config.json = Some(json),
            None => warn!("Invalid TH_JSON='{}', use true/false", val),
        }
    }

    if let Some(path) = lookup("TH_FILE") {
        if !path.trim().is_empty() {
            env_config.file = Some(path);
        }
    }

    if let Some(path) = lookup("TH_CONFIG") {
        if !path.trim().is_empty() {
            env_config.config = Some(path);
        }
    }

    debug!(?env_config, "environment configuration");
    env_config
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration string like "5s", "30s", "2m", "1500ms" or bare seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}

//! Configuration module for the backup scheduler.
//!
//! Configuration is read from an optional TOML file, with support for
//! environment variable interpolation using `${VAR_NAME}` syntax. Every
//! section has defaults, so running without a file uses the in-cluster
//! service account, the `kanister` namespace, and keeps three requests
//! per group.
//!
//! # Example
//!
//! ```toml
//! [sync]
//! namespace = "kanister"
//!
//! [retention]
//! keep_completed = 3
//!
//! [kubernetes]
//! token = "${KUBE_TOKEN}"
//! ```

mod kubernetes;
mod observability;
mod retention;
mod sync;

use std::{path::Path, sync::LazyLock};

pub use kubernetes::*;
pub use observability::*;
pub use retention::*;
use serde::{Deserialize, Serialize};
pub use sync::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Where execution requests are created and cleaned up.
    #[serde(default)]
    pub sync: SyncConfig,

    /// How many execution requests to keep per group.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Kubernetes API connection.
    #[serde(default)]
    pub kubernetes: KubernetesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl SchedulerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: SchedulerConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the file (or defaults).
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(namespace) = overrides.namespace {
            self.sync.namespace = namespace;
        }
        if let Some(keep) = overrides.keep_completed {
            self.retention.keep_completed = keep;
        }
        if overrides.dry_run {
            self.retention.dry_run = true;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate().map_err(ConfigError::Validation)?;
        self.kubernetes.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }

    /// Generate the JSON schema for the configuration file.
    #[cfg(feature = "json-schema")]
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SchedulerConfig)
    }

    /// Generate the JSON schema as a pretty-printed JSON string.
    #[cfg(feature = "json-schema")]
    pub fn json_schema_string() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub namespace: Option<String>,
    pub keep_completed: Option<i64>,
    pub dry_run: bool,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

static ENV_VAR_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
});

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR_RE.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

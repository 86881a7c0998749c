//! Retention configuration for execution requests.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! keep_completed = 3
//! dry_run = false
//! ```

use serde::{Deserialize, Serialize};

/// Controls how many completed execution requests survive per group.
///
/// Each group holds every request born from the same (subject, blueprint)
/// pair. The oldest records beyond `keep_completed` are deleted once they
/// are complete; records in any other state are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Number of most recent requests to keep per group.
    /// Zero or negative makes every completed request eligible.
    /// Default: 3
    #[serde(default = "default_keep_completed")]
    pub keep_completed: i64,

    /// If true, log what would be deleted without actually deleting.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_completed: default_keep_completed(),
            dry_run: false,
        }
    }
}

fn default_keep_completed() -> i64 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetentionConfig::default();
        assert_eq!(config.keep_completed, 3);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            keep_completed = 7
            dry_run = true
        "#;
        let config: RetentionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.keep_completed, 7);
        assert!(config.dry_run);
    }

    #[test]
    fn test_negative_keep_is_accepted() {
        let config: RetentionConfig = toml::from_str("keep_completed = -1").unwrap();
        assert_eq!(config.keep_completed, -1);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<RetentionConfig>("keep = 3").is_err());
    }
}

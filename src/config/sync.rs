use serde::{Deserialize, Serialize};

/// Where generated execution requests live.
///
/// # Example
///
/// ```toml
/// [sync]
/// namespace = "kanister"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Namespace ActionSets are created in and cleaned up from.
    /// Default: "kanister"
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

fn default_namespace() -> String {
    "kanister".to_string()
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !is_dns_label(&self.namespace) {
            return Err(format!(
                "sync.namespace '{}' is not a valid namespace name \
                 (lowercase alphanumerics and '-', at most 63 characters)",
                self.namespace
            ));
        }
        Ok(())
    }
}

/// RFC 1123 label, which is what Kubernetes accepts as a namespace name.
fn is_dns_label(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 63
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_default_namespace() {
        assert_eq!(SyncConfig::default().namespace, "kanister");
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case("kanister", true)]
    #[case("team-a", true)]
    #[case("a1", true)]
    #[case("", false)]
    #[case("Team", false)]
    #[case("-team", false)]
    #[case("team-", false)]
    #[case("team_a", false)]
    fn test_namespace_validation(#[case] namespace: &str, #[case] valid: bool) {
        let config = SyncConfig {
            namespace: namespace.to_string(),
        };
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_overlong_namespace_rejected() {
        let config = SyncConfig {
            namespace: "a".repeat(64),
        };
        assert!(config.validate().is_err());
    }
}

//! Kubeconfig loading for out-of-cluster runs.
//!
//! Supports the subset client tools share: a context selecting a cluster
//! (server, CA file or data, TLS skip) and a user (token, token file, client
//! certificate and key as files or data). Exec and auth-provider plugins are
//! not run.

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;

use super::Connection;
use crate::backend::{BackendError, BackendResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    pub clusters: Option<Vec<NamedCluster>>,
    pub contexts: Option<Vec<NamedContext>>,
    pub users: Option<Vec<NamedUser>>,
    pub current_context: Option<String>,
    /// Directory relative file references are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    pub server: String,
    pub certificate_authority: Option<PathBuf>,
    pub certificate_authority_data: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: AuthInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthInfo {
    pub token: Option<String>,
    #[serde(rename = "tokenFile")]
    pub token_file: Option<PathBuf>,
    pub client_certificate: Option<PathBuf>,
    pub client_certificate_data: Option<String>,
    pub client_key: Option<PathBuf>,
    pub client_key_data: Option<String>,
    pub exec: Option<serde_yaml::Value>,
    pub auth_provider: Option<serde_yaml::Value>,
}

fn invalid(message: impl Into<String>) -> BackendError {
    BackendError::NotConfigured(message.into())
}

impl Kubeconfig {
    /// Read and parse a kubeconfig file.
    pub fn load(path: &Path) -> BackendResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&contents, base_dir)
            .map_err(|e| invalid(format!("kubeconfig {}: {}", path.display(), e)))
    }

    pub fn from_yaml(contents: &str, base_dir: PathBuf) -> BackendResult<Self> {
        let mut config: Kubeconfig =
            serde_yaml::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        config.base_dir = base_dir;
        Ok(config)
    }

    /// Connection settings for `context`, or for `current-context` if `None`.
    pub fn connection(&self, context: Option<&str>) -> BackendResult<Connection> {
        let context_name = context
            .or(self.current_context.as_deref())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid("kubeconfig has no current-context"))?;

        let context = self
            .contexts
            .iter()
            .flatten()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| {
                invalid(format!("context '{}' not found in kubeconfig", context_name))
            })?;

        let cluster = self
            .clusters
            .iter()
            .flatten()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| {
                invalid(format!("cluster '{}' not found in kubeconfig", context.cluster))
            })?;

        let anonymous = AuthInfo::default();
        let user = match context.user.as_deref().filter(|u| !u.is_empty()) {
            Some(name) => self
                .users
                .iter()
                .flatten()
                .find(|u| u.name == name)
                .map(|u| &u.user)
                .ok_or_else(|| invalid(format!("user '{}' not found in kubeconfig", name)))?,
            None => &anonymous,
        };

        let token = match (&user.token, &user.token_file) {
            (Some(token), _) => Some(token.trim().to_string()),
            (None, Some(path)) => {
                Some(std::fs::read_to_string(self.resolve(path))?.trim().to_string())
            }
            (None, None) => None,
        };

        let ca_pem = self.read_pem(
            "certificate-authority",
            cluster.certificate_authority.as_deref(),
            cluster.certificate_authority_data.as_deref(),
        )?;
        let cert_pem = self.read_pem(
            "client-certificate",
            user.client_certificate.as_deref(),
            user.client_certificate_data.as_deref(),
        )?;
        let key_pem = self.read_pem(
            "client-key",
            user.client_key.as_deref(),
            user.client_key_data.as_deref(),
        )?;

        let identity_pem = match (key_pem, cert_pem) {
            (Some(mut key), Some(cert)) => {
                key.push(b'\n');
                key.extend(cert);
                Some(key)
            }
            (None, None) => None,
            _ => {
                return Err(invalid(
                    "kubeconfig user needs both a client certificate and a client key",
                ));
            }
        };

        if token.is_none()
            && identity_pem.is_none()
            && (user.exec.is_some() || user.auth_provider.is_some())
        {
            tracing::warn!(
                context = %context_name,
                "Kubeconfig user relies on an exec or auth-provider plugin, which is not supported"
            );
        }

        Ok(Connection {
            server: cluster.server.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            ca_pem,
            identity_pem,
            insecure: cluster.insecure_skip_tls_verify,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Inline base64 data wins over a file reference.
    fn read_pem(
        &self,
        field: &str,
        path: Option<&Path>,
        data: Option<&str>,
    ) -> BackendResult<Option<Vec<u8>>> {
        if let Some(data) = data {
            return BASE64
                .decode(data.trim())
                .map(Some)
                .map_err(|e| invalid(format!("{}-data is not valid base64: {}", field, e)));
        }
        match path {
            Some(path) => Ok(Some(std::fs::read(self.resolve(path))?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: dev-cluster
  cluster:
    server: https://dev.example.com:6443/
    certificate-authority-data: Y2EtcGVt
- name: prod-cluster
  cluster:
    server: https://prod.example.com
    insecure-skip-tls-verify: true
contexts:
- name: dev
  context:
    cluster: dev-cluster
    user: dev-user
    namespace: team-a
- name: prod
  context:
    cluster: prod-cluster
    user: prod-user
- name: broken
  context:
    cluster: missing-cluster
users:
- name: dev-user
  user:
    token: dev-token
- name: prod-user
  user:
    client-certificate-data: Y2VydA==
    client-key-data: a2V5
preferences: {}
"#;

    fn parsed() -> Kubeconfig {
        Kubeconfig::from_yaml(KUBECONFIG, PathBuf::from("/nonexistent")).unwrap()
    }

    #[test]
    fn test_current_context() {
        let connection = parsed().connection(None).unwrap();
        assert_eq!(connection.server, "https://dev.example.com:6443");
        assert_eq!(connection.token.as_deref(), Some("dev-token"));
        assert_eq!(connection.ca_pem.as_deref(), Some(b"ca-pem".as_slice()));
        assert!(connection.identity_pem.is_none());
        assert!(!connection.insecure);
    }

    #[test]
    fn test_explicit_context_with_client_certificate() {
        let connection = parsed().connection(Some("prod")).unwrap();
        assert_eq!(connection.server, "https://prod.example.com");
        assert!(connection.token.is_none());
        assert!(connection.ca_pem.is_none());
        assert_eq!(connection.identity_pem.as_deref(), Some(b"key\ncert".as_slice()));
        assert!(connection.insecure);
    }

    #[test]
    fn test_missing_references() {
        let config = parsed();
        assert!(matches!(
            config.connection(Some("staging")),
            Err(BackendError::NotConfigured(_))
        ));
        assert!(matches!(
            config.connection(Some("broken")),
            Err(BackendError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_no_current_context() {
        let config = Kubeconfig::from_yaml("apiVersion: v1\nkind: Config\n", PathBuf::new())
            .unwrap();
        assert!(matches!(
            config.connection(None),
            Err(BackendError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_relative_files_resolve_against_kubeconfig_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token"), "file-token\n").unwrap();
        std::fs::write(dir.path().join("ca.crt"), "ca-from-file").unwrap();
        std::fs::write(
            dir.path().join("config"),
            r#"
current-context: local
clusters:
- name: local
  cluster:
    server: http://127.0.0.1:8001
    certificate-authority: ca.crt
contexts:
- name: local
  context:
    cluster: local
    user: local
users:
- name: local
  user:
    tokenFile: token
"#,
        )
        .unwrap();

        let connection = Kubeconfig::load(&dir.path().join("config"))
            .unwrap()
            .connection(None)
            .unwrap();
        assert_eq!(connection.token.as_deref(), Some("file-token"));
        assert_eq!(connection.ca_pem.as_deref(), Some(b"ca-from-file".as_slice()));
    }

    #[test]
    fn test_half_a_client_identity_is_rejected() {
        let config = Kubeconfig::from_yaml(
            r#"
current-context: c
clusters: [{name: c, cluster: {server: "https://c"}}]
contexts: [{name: c, context: {cluster: c, user: u}}]
users: [{name: u, user: {client-certificate-data: Y2VydA==}}]
"#,
            PathBuf::new(),
        )
        .unwrap();
        assert!(config.connection(None).is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Kubeconfig::from_yaml("clusters: [", PathBuf::new()).is_err());
    }
}

//! Kubernetes API connection settings.
//!
//! The API server is chosen in this order:
//!
//! 1. `api_url`, with `token` or `token_file` and `ca_file`.
//! 2. `kubeconfig`, if set explicitly.
//! 3. The in-cluster service account: the address from
//!    `KUBERNETES_SERVICE_HOST` and `KUBERNETES_SERVICE_PORT`, the mounted
//!    token, and the mounted CA bundle.
//! 4. The first existing file listed in `$KUBECONFIG`, or `~/.kube/config`
//!    when `$KUBECONFIG` is unset.
//!
//! # Example
//!
//! ```toml
//! # Talk to `kubectl proxy` from a workstation
//! [kubernetes]
//! api_url = "http://127.0.0.1:8001"
//! ```
//!
//! ```toml
//! # Use a non-default context of a specific kubeconfig
//! [kubernetes]
//! kubeconfig = "/etc/backup-scheduler/kubeconfig"
//! context = "prod"
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct KubernetesConfig {
    /// API server base URL. Defaults to the in-cluster service address.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Kubeconfig file. Defaults to `$KUBECONFIG`, then `~/.kube/config`,
    /// consulted only outside a cluster.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context. Defaults to `current-context`.
    #[serde(default)]
    pub context: Option<String>,

    /// Bearer token. Takes precedence over `token_file`.
    /// Supports `${VAR}` expansion like every other value.
    #[serde(default)]
    pub token: Option<String>,

    /// File holding the bearer token. Ignored if missing.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// PEM bundle used to verify the API server. Ignored if missing.
    #[serde(default = "default_ca_file")]
    pub ca_file: PathBuf,

    /// Skip TLS certificate verification. Only for local testing.
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    /// Per-request timeout in seconds.
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size for list calls (`limit` / `continue`).
    /// Default: 500
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            kubeconfig: None,
            context: None,
            token: None,
            token_file: default_token_file(),
            ca_file: default_ca_file(),
            insecure_skip_tls_verify: false,
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Where the API server address comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiSource {
    /// Explicit or in-cluster URL.
    Url(String),
    Kubeconfig(PathBuf),
}

fn default_token_file() -> PathBuf {
    PathBuf::from(SERVICE_ACCOUNT_DIR).join("token")
}

fn default_ca_file() -> PathBuf {
    PathBuf::from(SERVICE_ACCOUNT_DIR).join("ca.crt")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    500
}

impl KubernetesConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(api_url) = &self.api_url {
            let parsed = url::Url::parse(api_url)
                .map_err(|e| format!("kubernetes.api_url '{}' is invalid: {}", api_url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!(
                    "kubernetes.api_url must use http or https, got '{}'",
                    parsed.scheme()
                ));
            }
        }
        if self.timeout_secs == 0 {
            return Err("kubernetes.timeout_secs must be greater than 0".into());
        }
        if self.page_size == 0 {
            return Err("kubernetes.page_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Pick the API source, following the order in the module docs.
    pub fn resolve_source(&self) -> Option<ApiSource> {
        if self.api_url.is_none()
            && let Some(path) = &self.kubeconfig
        {
            return Some(ApiSource::Kubeconfig(path.clone()));
        }
        if let Some(url) = self.resolve_api_url() {
            return Some(ApiSource::Url(url));
        }
        discover_kubeconfig().map(ApiSource::Kubeconfig)
    }

    /// The configured API URL, or the in-cluster address from the environment.
    pub fn resolve_api_url(&self) -> Option<String> {
        if let Some(api_url) = &self.api_url {
            return Some(api_url.trim_end_matches('/').to_string());
        }
        let host = std::env::var("KUBERNETES_SERVICE_HOST").ok()?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".into());
        if host.contains(':') {
            Some(format!("https://[{}]:{}", host, port))
        } else {
            Some(format!("https://{}:{}", host, port))
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// First existing entry of `$KUBECONFIG`, else `~/.kube/config` if present.
///
/// A set `$KUBECONFIG` with no existing entry does not fall back to the home
/// directory.
fn discover_kubeconfig() -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        return std::env::split_paths(&paths)
            .filter(|p| !p.as_os_str().is_empty())
            .find(|p| p.is_file());
    }
    dirs::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .filter(|p| Path::is_file(p))
}

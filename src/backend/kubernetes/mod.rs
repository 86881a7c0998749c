//! Kubernetes API backend.
//!
//! A thin client over `reqwest` that implements [`ResourceCatalog`] for
//! Namespaces and PersistentVolumeClaims and [`RequestStore`] for Kanister
//! ActionSets. Requests are issued one at a time; list calls follow
//! `continue` tokens until the collection is exhausted.

mod actionsets;
mod catalog;
mod kubeconfig;
mod types;

use std::path::Path;

use kubeconfig::Kubeconfig;
use reqwest::{Certificate, Client, Identity, Method, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;

use super::{BackendError, BackendResult};
use crate::config::{ApiSource, KubernetesConfig};
use types::{ApiStatus, ObjectList};

/// Resolved address and credentials of an API server.
#[derive(Debug, Default)]
pub(crate) struct Connection {
    pub server: String,
    pub token: Option<String>,
    pub ca_pem: Option<Vec<u8>>,
    /// Client key followed by its certificate chain, PEM encoded.
    pub identity_pem: Option<Vec<u8>>,
    pub insecure: bool,
}

impl Connection {
    fn resolve(config: &KubernetesConfig) -> BackendResult<Self> {
        match config.resolve_source() {
            Some(ApiSource::Url(server)) => {
                let token = match &config.token {
                    Some(token) => Some(token.trim().to_string()),
                    None => read_token_file(&config.token_file)?,
                };
                let ca_pem = if config.ca_file.exists() {
                    Some(std::fs::read(&config.ca_file)?)
                } else {
                    None
                };
                Ok(Self {
                    server,
                    token,
                    ca_pem,
                    identity_pem: None,
                    insecure: config.insecure_skip_tls_verify,
                })
            }
            Some(ApiSource::Kubeconfig(path)) => {
                tracing::debug!(path = %path.display(), "Loading kubeconfig");
                let mut connection =
                    Kubeconfig::load(&path)?.connection(config.context.as_deref())?;
                if let Some(token) = &config.token {
                    connection.token = Some(token.trim().to_string());
                }
                connection.insecure |= config.insecure_skip_tls_verify;
                Ok(connection)
            }
            None => Err(BackendError::NotConfigured(
                "no Kubernetes API found: set kubernetes.api_url or kubernetes.kubeconfig, \
                 run in a cluster, or provide $KUBECONFIG or ~/.kube/config"
                    .into(),
            )),
        }
    }
}

/// Client for the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClient {
    http_client: Client,
    base_url: String,
    token: Option<String>,
    page_size: u32,
}

impl KubeClient {
    /// Build a client from configuration.
    ///
    /// Fails if no API server can be determined, or if the token, CA,
    /// client certificate or kubeconfig files exist but cannot be read.
    pub fn new(config: &KubernetesConfig) -> BackendResult<Self> {
        let connection = Connection::resolve(config)?;

        let mut builder = Client::builder().timeout(config.timeout());
        if let Some(pem) = &connection.ca_pem {
            for cert in Certificate::from_pem_bundle(pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if let Some(pem) = &connection.identity_pem {
            builder = builder.identity(Identity::from_pem(pem)?);
        }
        if connection.insecure {
            tracing::warn!("TLS verification of the Kubernetes API server is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        tracing::debug!(
            api_url = %connection.server,
            authenticated = connection.token.is_some() || connection.identity_pem.is_some(),
            "Kubernetes client configured"
        );

        Ok(Self {
            http_client: builder.build()?,
            base_url: connection.server,
            token: connection.token,
            page_size: config.page_size,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send a request, turning non-2xx responses into errors.
    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response)
    }

    /// Send a request and decode a successful JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    /// GET every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        label_selector: Option<&str>,
    ) -> BackendResult<Vec<T>> {
        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut query = vec![("limit", self.page_size.to_string())];
            if let Some(selector) = label_selector {
                query.push(("labelSelector", selector.to_string()));
            }
            if let Some(token) = &continue_token {
                query.push(("continue", token.clone()));
            }

            let page: ObjectList<T> = self
                .send_json(self.request(Method::GET, path).query(&query))
                .await?;
            items.extend(page.items.unwrap_or_default());

            match page.metadata.continue_token {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }
}

fn read_token_file(path: &Path) -> BackendResult<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let token = std::fs::read_to_string(path)?;
    let token = token.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}

/// Turn a non-2xx response into an error, preferring the server's
/// `Status.message`.
async fn api_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiStatus>(&body)
        .ok()
        .and_then(|s| s.message.or(s.reason))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            }
        });

    if status == StatusCode::NOT_FOUND {
        BackendError::NotFound(message)
    } else {
        BackendError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

//! Kubernetes API client
//!
//! Reads the `Endpoints` object of the configured service from the API
//! server. Each ready address corresponds to a pod backing the service.
//! Pattern: `GET /api/v1/namespaces/{namespace}/endpoints/{service}`

use async_trait::async_trait;
use kdisc_core::{Error, Result, Settings};
use serde::Deserialize;
use std::collections::HashSet;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

use crate::options::RegistryOptions;

/// Service-account mount inside every pod
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Long-lived client for the service registry.
///
/// Construction must not block; connections are opened on first use.
#[async_trait]
pub trait RegistryClient: Send + Sync + 'static {
    /// Build the client from the settings bundle
    fn connect(settings: &Settings) -> Result<Self>
    where
        Self: Sized;

    /// Addresses currently registered for the configured service
    async fn endpoint_addresses(&self) -> Result<Vec<IpAddr>>;

    /// Release the client. Closing an already closed client is a no-op.
    fn close(&self) -> io::Result<()>;
}

#[derive(Debug, Deserialize)]
struct Endpoints {
    #[serde(default)]
    subsets: Vec<EndpointSubset>,
}

#[derive(Debug, Deserialize)]
struct EndpointSubset {
    #[serde(default)]
    addresses: Vec<EndpointAddress>,
}

#[derive(Debug, Deserialize)]
struct EndpointAddress {
    ip: String,
}

/// Client for the Kubernetes Endpoints API
pub struct KubernetesApiClient {
    /// Base URL of the API server (e.g., "https://10.96.0.1:443")
    api_server: String,
    /// Bearer token file, re-read on every request so rotated tokens are picked up
    token_path: Option<PathBuf>,
    /// Cluster CA bundle
    ca_path: Option<PathBuf>,
    options: RegistryOptions,
    http: OnceCell<reqwest::Client>,
    closed: AtomicBool,
}

impl KubernetesApiClient {
    /// Create a client for the in-cluster API server.
    ///
    /// Uses `KUBERNETES_SERVICE_HOST` / `KUBERNETES_SERVICE_PORT` and the
    /// pod's service-account token and CA.
    #[must_use]
    pub fn in_cluster(options: RegistryOptions) -> Self {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .unwrap_or_else(|_| "kubernetes.default.svc".to_string());
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        // IPv6 service hosts need brackets in a URL
        let api_server = if host.contains(':') {
            format!("https://[{host}]:{port}")
        } else {
            format!("https://{host}:{port}")
        };

        let account_dir = PathBuf::from(SERVICE_ACCOUNT_DIR);
        Self {
            api_server,
            token_path: Some(account_dir.join("token")),
            ca_path: Some(account_dir.join("ca.crt")),
            options,
            http: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Create with an explicit API server and no credentials
    /// (for testing or `kubectl proxy` setups).
    #[must_use]
    pub fn with_api_server(api_server: impl Into<String>, options: RegistryOptions) -> Self {
        Self {
            api_server: api_server.into().trim_end_matches('/').to_string(),
            token_path: None,
            ca_path: None,
            options,
            http: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Authenticate with the bearer token stored at `path`
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    #[must_use]
    pub fn endpoints_url(&self) -> String {
        format!(
            "{}/api/v1/namespaces/{}/endpoints/{}",
            self.api_server, self.options.namespace, self.options.service_name
        )
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn http(&self) -> Result<&reqwest::Client> {
        self.http.get_or_try_init(|| self.build_http()).await
    }

    async fn build_http(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if !self.options.max_wait.is_zero() {
            builder = builder.timeout(self.options.max_wait);
        }
        if let Some(ca_path) = &self.ca_path {
            if let Some(pem) = read_if_present(ca_path).await? {
                let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    Error::Registry(format!("Invalid cluster CA '{}': {e}", ca_path.display()))
                })?;
                builder = builder.add_root_certificate(certificate);
            }
        }
        builder
            .build()
            .map_err(|e| Error::Registry(format!("Failed to build HTTP client: {e}")))
    }

    async fn bearer_token(&self) -> Result<Option<String>> {
        let Some(path) = &self.token_path else {
            return Ok(None);
        };

        let Some(token) = read_if_present(path).await? else {
            return Ok(None);
        };
        let token = String::from_utf8(token)
            .map_err(|e| Error::Registry(format!("Invalid token in '{}': {e}", path.display())))?;
        Ok(Some(token.trim().to_string()))
    }
}

/// Contents of `path`, or `None` when it does not exist (outside a pod)
async fn read_if_present(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl RegistryClient for KubernetesApiClient {
    fn connect(settings: &Settings) -> Result<Self> {
        Ok(Self::in_cluster(RegistryOptions::from_settings(settings)?))
    }

    async fn endpoint_addresses(&self) -> Result<Vec<IpAddr>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let url = self.endpoints_url();
        let mut request = self.http().await?.get(&url);
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Registry(format!("Endpoints request to '{url}' failed: {e}")))?;

        let endpoints: Endpoints = response
            .json()
            .await
            .map_err(|e| Error::Registry(format!("Invalid endpoints from '{url}': {e}")))?;

        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        for address in endpoints.subsets.iter().flat_map(|subset| &subset.addresses) {
            match address.ip.parse::<IpAddr>() {
                // Deduplicate (a pod may appear in several subsets)
                Ok(ip) if seen.insert(ip) => addresses.push(ip),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(ip = %address.ip, error = %e, "Skipping unparsable endpoint address");
                }
            }
        }

        tracing::debug!(
            namespace = %self.options.namespace,
            service = %self.options.service_name,
            address_count = addresses.len(),
            "Kubernetes endpoints fetched"
        );
        Ok(addresses)
    }

    fn close(&self) -> io::Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(api_server = %self.api_server, "Kubernetes API client closed");
        }
        Ok(())
    }
}

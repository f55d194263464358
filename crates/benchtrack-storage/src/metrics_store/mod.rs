//! Metrics store abstraction
//!
//! A metrics store persists [`PerformanceRecord`]s into named collections. The
//! concrete backend is chosen from a connection URI:
//! - `es://` - OpenSearch with basic auth (or anonymous)
//! - `es+aws://` - Amazon OpenSearch Service with SigV4-signed requests
//! - anything else is rejected with `CoreError::UnsupportedScheme`
//!
//! Construction is not lazy: building a store performs a liveness check.
//!
//! # Examples
//!
//! ```rust,no_run
//! use benchtrack_core::PerformanceRecord;
//! use benchtrack_storage::AutoMetricsStore;
//!
//! #[tokio::main]
//! async fn main() -> benchtrack_core::CoreResult<()> {
//!     let store = AutoMetricsStore::from_uri("es://admin:admin@localhost:9200").await?;
//!
//!     let record = PerformanceRecord::latency("e2e_latency_ms_p90", 812.4, None, None);
//!     store.push("ci_tgi_performances_tracker", &record).await?;
//!     Ok(())
//! }
//! ```

mod credentials;
mod memory;
mod opensearch;
mod signing;
mod uri;

pub use credentials::{AmbientCredentialChain, CredentialChain, StaticCredentialChain};
pub use memory::MemoryMetricsStore;
pub use opensearch::OpenSearchStore;
pub use uri::{parse_aws_host, AwsEndpoint, StoreScheme, StoreUri};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use benchtrack_core::{CoreError, PerformanceRecord, StoreConfig};

use crate::error::Result;
use opensearch::StoreAuth;
use signing::SigV4Signer;

/// Destination for performance records.
///
/// Pushes are independent: there is no batching or atomicity across records,
/// so a caller publishing several metrics must treat each push as separately
/// retriable.
///
/// # Error Handling
///
/// - `CoreError::StoreUnavailable` - backend unreachable
/// - `CoreError::CollectionError` - collection could not be verified or created
/// - `CoreError::DocumentRejected` - backend refused the document
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Liveness check.
    async fn ping(&self) -> Result<()>;

    /// Appends `record` to `collection`, creating the collection when absent.
    async fn push(&self, collection: &str, record: &PerformanceRecord) -> Result<()>;
}

/// Rejects collection names that cannot address a single index.
pub(crate) fn validate_collection(collection: &str) -> Result<()> {
    if collection.is_empty() {
        Err(CoreError::collection(collection, "collection name cannot be empty"))
    } else if collection.contains('/') {
        Err(CoreError::collection(collection, "collection name cannot contain `/`"))
    } else {
        Ok(())
    }
}

/// Builds an [`OpenSearchStore`] from a URI with optional overrides.
pub struct MetricsStoreBuilder {
    uri: String,
    credentials: Option<Arc<dyn CredentialChain>>,
    endpoint: Option<String>,
    tls: bool,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl MetricsStoreBuilder {
    pub fn new(uri: impl Into<String>) -> Self {
        let defaults = StoreConfig::default();
        Self {
            uri: uri.into(),
            credentials: None,
            endpoint: None,
            tls: true,
            connect_timeout: defaults.connect_timeout(),
            request_timeout: defaults.request_timeout(),
        }
    }

    /// URI and timeouts taken from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.uri.clone()).timeouts(config.connect_timeout(), config.request_timeout())
    }

    /// Credential source for `es+aws://` URIs without userinfo.
    ///
    /// Defaults to [`AmbientCredentialChain`].
    pub fn credentials_chain(mut self, chain: Arc<dyn CredentialChain>) -> Self {
        self.credentials = Some(chain);
        self
    }

    /// Send requests to `endpoint` (e.g. `http://127.0.0.1:9200`) instead of
    /// the URI host.
    ///
    /// Signed stores still take region and service from the URI host.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Talk plain HTTP instead of HTTPS.
    pub fn plain_http(mut self) -> Self {
        self.tls = false;
        self
    }

    pub fn timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Resolves authentication and connects.
    ///
    /// # Errors
    ///
    /// - `CoreError::UnsupportedScheme` / `CoreError::InvalidUri` for bad URIs
    /// - `CoreError::Credentials` if AWS credentials cannot be resolved
    /// - `CoreError::StoreUnavailable` if the liveness check fails
    pub async fn build(self) -> Result<OpenSearchStore> {
        let uri = StoreUri::parse(&self.uri)?;
        let auth = match uri.scheme() {
            StoreScheme::Basic => match uri.credentials() {
                Some((username, password)) => StoreAuth::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                },
                None => StoreAuth::Anonymous,
            },
            StoreScheme::AwsSigned => {
                let endpoint = uri.aws_endpoint()?;
                let chain: Arc<dyn CredentialChain> = match (uri.credentials(), self.credentials) {
                    (Some((access_key, secret_key)), _) => {
                        Arc::new(StaticCredentialChain::new(access_key, secret_key))
                    }
                    (None, Some(chain)) => chain,
                    (None, None) => Arc::new(AmbientCredentialChain),
                };
                debug!(region = %endpoint.region, service = %endpoint.service, "signing requests");
                let signer = SigV4Signer::new(chain, endpoint);
                signer.credentials().await?;
                StoreAuth::SigV4(signer)
            }
        };

        let endpoint = self.endpoint.unwrap_or_else(|| uri.endpoint(self.tls));
        OpenSearchStore::connect(
            &endpoint,
            auth,
            self.connect_timeout,
            self.request_timeout,
        )
        .await
    }
}

/// Picks the backend matching a URI's scheme.
pub struct AutoMetricsStore;

impl AutoMetricsStore {
    /// Connects to the store described by `uri` with default settings.
    pub async fn from_uri(uri: &str) -> Result<Arc<dyn MetricsStore>> {
        Ok(Arc::new(MetricsStoreBuilder::new(uri).build().await?))
    }

    /// Connects using the URI and timeouts from configuration.
    pub async fn from_config(config: &StoreConfig) -> Result<Arc<dyn MetricsStore>> {
        Ok(Arc::new(MetricsStoreBuilder::from_config(config).build().await?))
    }
}

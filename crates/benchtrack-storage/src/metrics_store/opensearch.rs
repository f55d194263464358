//! OpenSearch-backed metrics store.
//!
//! Every request goes over HTTPS (plain HTTP only when explicitly allowed) and
//! is authenticated either with basic auth or with a SigV4 signature.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use benchtrack_core::{CoreError, PerformanceRecord};

use super::signing::SigV4Signer;
use super::{validate_collection, MetricsStore};
use crate::error::Result;

const ALREADY_EXISTS: &str = "resource_already_exists_exception";
const MAX_ERROR_BODY: usize = 512;

/// How requests authenticate against the cluster.
#[derive(Debug)]
pub(crate) enum StoreAuth {
    Anonymous,
    Basic { username: String, password: String },
    SigV4(SigV4Signer),
}

/// Metrics store writing one document per record into an OpenSearch index.
#[derive(Debug)]
pub struct OpenSearchStore {
    client: Client,
    base: Url,
    auth: StoreAuth,
    verified: Mutex<HashSet<String>>,
}

impl OpenSearchStore {
    /// Connects and checks that the cluster answers.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidUri` if `endpoint` is not a valid URL
    /// - `CoreError::StoreUnavailable` if the liveness check fails
    pub(crate) async fn connect(
        endpoint: &str,
        auth: StoreAuth,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base = Url::parse(endpoint).map_err(|e| CoreError::invalid_uri(endpoint, e.to_string()))?;
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| CoreError::unavailable(endpoint, e.to_string()))?;

        let store = Self {
            client,
            base,
            auth,
            verified: Mutex::new(HashSet::new()),
        };
        store.ping().await?;
        info!(endpoint = %store.endpoint(), auth = store.auth_kind(), "connected to metrics store");
        Ok(store)
    }

    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    fn auth_kind(&self) -> &'static str {
        match self.auth {
            StoreAuth::Anonymous => "anonymous",
            StoreAuth::Basic { .. } => "basic",
            StoreAuth::SigV4(_) => "sigv4",
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::invalid_uri(self.base.as_str(), "endpoint cannot be a base URL"))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, method: Method, segments: &[&str], body: Option<Vec<u8>>) -> Result<Response> {
        let url = self.url(segments)?;
        let body = body.unwrap_or_default();
        let content_type = (!body.is_empty()).then_some("application/json");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        request = match &self.auth {
            StoreAuth::Anonymous => request,
            StoreAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
            StoreAuth::SigV4(signer) => {
                let credentials = signer.credentials().await?;
                let headers: Vec<(&str, &str)> = content_type
                    .map(|ct| ("content-type", ct))
                    .into_iter()
                    .collect();
                signer
                    .sign(&credentials, method.as_str(), url.as_str(), &headers, &body)?
                    .into_iter()
                    .fold(request, |req, (name, value)| req.header(name, value))
            }
        };

        debug!(%method, %url, "metrics store request");
        request
            .body(body)
            .send()
            .await
            .map_err(|e| CoreError::unavailable(self.endpoint(), e.to_string()))
    }

    /// Liveness check against the cluster root.
    async fn check_alive(&self) -> Result<()> {
        let response = self.send(Method::GET, &[], None).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(CoreError::unavailable(
                self.endpoint(),
                format!("liveness check answered {status}: {}", error_body(response).await),
            ))
        }
    }

    /// Makes sure `collection` exists, creating it when absent.
    ///
    /// A concurrent creator winning the race is not an error.
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if self.verified.lock().contains(collection) {
            return Ok(());
        }

        let response = self.send(Method::HEAD, &[collection], None).await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => self.create_collection(collection).await?,
            status => {
                return Err(CoreError::collection(
                    collection,
                    format!("existence check answered {status}"),
                ))
            }
        }

        self.verified.lock().insert(collection.to_string());
        Ok(())
    }

    async fn create_collection(&self, collection: &str) -> Result<()> {
        let response = self.send(Method::PUT, &[collection], None).await?;
        let status = response.status();
        if status.is_success() {
            info!(collection, "created collection");
            return Ok(());
        }

        let body = error_body(response).await;
        if status == StatusCode::BAD_REQUEST && body.contains(ALREADY_EXISTS) {
            debug!(collection, "collection created concurrently");
            Ok(())
        } else {
            Err(CoreError::collection(
                collection,
                format!("creation answered {status}: {body}"),
            ))
        }
    }
}

#[async_trait]
impl MetricsStore for OpenSearchStore {
    async fn ping(&self) -> Result<()> {
        self.check_alive().await
    }

    async fn push(&self, collection: &str, record: &PerformanceRecord) -> Result<()> {
        validate_collection(collection)?;
        self.ensure_collection(collection).await?;

        let body = serde_json::to_vec(&Value::Object(record.as_document()))?;
        let response = self.send(Method::POST, &[collection, "_doc"], Some(body)).await?;
        let status = response.status();
        if status.is_success() {
            debug!(collection, metric = record.metric(), "indexed record");
            Ok(())
        } else {
            Err(CoreError::DocumentRejected {
                collection: collection.to_string(),
                status: status.as_u16(),
                message: error_body(response).await,
            })
        }
    }
}

async fn error_body(response: Response) -> String {
    let mut text = response.text().await.unwrap_or_default();
    if text.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| text.is_char_boundary(*i))
            .unwrap_or(0);
        text.truncate(cut);
    }
    text
}

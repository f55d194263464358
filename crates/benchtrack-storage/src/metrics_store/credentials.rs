//! AWS credential resolution for signed stores.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use tracing::debug;

use benchtrack_core::CoreError;

use crate::error::Result;

const STATIC_PROVIDER_NAME: &str = "benchtrack-uri";

/// Source of AWS credentials used when the URI carries none.
#[async_trait]
pub trait CredentialChain: Send + Sync {
    async fn resolve(&self) -> Result<Credentials>;
}

/// Fixed key pair, typically taken from URI userinfo.
#[derive(Debug, Clone)]
pub struct StaticCredentialChain {
    credentials: Credentials,
}

impl StaticCredentialChain {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(
                access_key.into(),
                secret_key.into(),
                None,
                None,
                STATIC_PROVIDER_NAME,
            ),
        }
    }
}

#[async_trait]
impl CredentialChain for StaticCredentialChain {
    async fn resolve(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Default AWS provider chain: environment, shared profile, SSO, IMDS...
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientCredentialChain;

#[async_trait]
impl CredentialChain for AmbientCredentialChain {
    async fn resolve(&self) -> Result<Credentials> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let provider = config.credentials_provider().ok_or_else(|| {
            CoreError::Credentials("no AWS credentials provider is configured".to_string())
        })?;
        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| CoreError::Credentials(e.to_string()))?;
        debug!(access_key = credentials.access_key_id(), "resolved ambient AWS credentials");
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_chain_returns_keys() {
        let chain = StaticCredentialChain::new("AKIAEXAMPLE", "secret");
        let creds = chain.resolve().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key(), "secret");
        assert!(creds.session_token().is_none());
    }
}

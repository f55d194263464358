use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningParams, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use tokio::sync::Mutex;
use tracing::debug;

use benchtrack_core::CoreError;

use crate::error::Result;
use crate::metrics_store::credentials::CredentialChain;
use crate::metrics_store::uri::AwsEndpoint;

/// Credentials this close to expiry are resolved again.
const REFRESH_WINDOW: Duration = Duration::from_secs(300);

/// Signs OpenSearch requests with AWS Signature Version 4.
///
/// Credentials come from a [`CredentialChain`] and are cached until they
/// approach their expiry, so temporary credentials are renewed under a
/// long-lived store.
pub(crate) struct SigV4Signer {
    chain: Arc<dyn CredentialChain>,
    cached: Mutex<Option<Credentials>>,
    endpoint: AwsEndpoint,
}

impl fmt::Debug for SigV4Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigV4Signer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SigV4Signer {
    pub fn new(chain: Arc<dyn CredentialChain>, endpoint: AwsEndpoint) -> Self {
        Self {
            chain,
            cached: Mutex::new(None),
            endpoint,
        }
    }

    /// Current credentials, resolving through the chain when none are cached
    /// or the cached ones are about to expire.
    pub async fn credentials(&self) -> Result<Credentials> {
        let mut cached = self.cached.lock().await;
        if let Some(credentials) = cached.as_ref().filter(|c| !expires_soon(c)) {
            return Ok(credentials.clone());
        }
        let fresh = self.chain.resolve().await?;
        debug!(access_key = fresh.access_key_id(), "resolved signing credentials");
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Headers to add so the request carries a valid signature.
    pub fn sign(
        &self,
        credentials: &Credentials,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>> {
        let identity = Identity::from(credentials.clone());
        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.endpoint.region)
            .name(&self.endpoint.service)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| CoreError::Credentials(format!("invalid signing parameters: {e}")))?
            .into();

        let request = SignableRequest::new(
            method,
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| CoreError::Credentials(format!("request cannot be signed: {e}")))?;

        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| CoreError::Credentials(format!("signing failed: {e}")))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

fn expires_soon(credentials: &Credentials) -> bool {
    credentials
        .expiry()
        .is_some_and(|expiry| expiry <= SystemTime::now() + REFRESH_WINDOW)
}

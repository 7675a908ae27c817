//! S3 object store for a log bucket
//!
//! Provides `S3Config` (bucket / region) and `build_store`, which builds an
//! `object_store::aws::AmazonS3` that takes its credentials from the same AWS
//! provider chain as the control-plane client. Endpoint overrides
//! (`AWS_ENDPOINT_URL`, `AWS_ALLOW_HTTP`) are read by the builder itself.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use object_store::aws::{AmazonS3Builder, AwsCredential};
use object_store::{CredentialProvider, ObjectStore};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::LoadBalancerMetadata;
use crate::error::ListingError;

/// Credentials expiring sooner than this are fetched again.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Where the log bucket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    /// AWS region of the bucket (e.g. "us-east-1")
    pub region: String,
}

impl S3Config {
    /// Access logs are delivered to a bucket in the load balancer's region.
    pub fn for_logs(meta: &LoadBalancerMetadata) -> Self {
        Self {
            bucket: meta.bucket.clone(),
            region: meta.region.clone(),
        }
    }
}

type Cached = (Arc<AwsCredential>, Option<SystemTime>);

/// Adapts an SDK credentials provider to `object_store`, holding on to the
/// resolved credentials until they are about to expire.
#[derive(Debug)]
struct SdkCredentials {
    provider: SharedCredentialsProvider,
    cached: Mutex<Option<Cached>>,
}

impl SdkCredentials {
    fn new(provider: SharedCredentialsProvider) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
        }
    }
}

fn is_fresh(expiry: Option<SystemTime>, now: SystemTime) -> bool {
    match expiry {
        None => true,
        Some(at) => at
            .duration_since(now)
            .is_ok_and(|left| left > REFRESH_MARGIN),
    }
}

#[async_trait]
impl CredentialProvider for SdkCredentials {
    type Credential = AwsCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AwsCredential>> {
        let mut cached = self.cached.lock().await;
        if let Some((credential, expiry)) = cached.as_ref() {
            if is_fresh(*expiry, SystemTime::now()) {
                return Ok(Arc::clone(credential));
            }
        }

        let creds = self
            .provider
            .provide_credentials()
            .await
            .map_err(|e| object_store::Error::Generic {
                store: "S3",
                source: Box::new(e),
            })?;
        debug!("Resolved AWS credentials, expiry {:?}", creds.expiry());

        let credential = Arc::new(AwsCredential {
            key_id: creds.access_key_id().to_string(),
            secret_key: creds.secret_access_key().to_string(),
            token: creds.session_token().map(str::to_string),
        });
        *cached = Some((Arc::clone(&credential), creds.expiry()));
        Ok(credential)
    }
}

/// Build an `object_store::aws::AmazonS3` for the configured bucket.
///
/// Without an SDK credentials provider the builder falls back to its own
/// environment lookup.
pub fn build_store(
    config: &S3Config,
    sdk: &aws_config::SdkConfig,
) -> Result<Arc<dyn ObjectStore>, ListingError> {
    let mut builder = AmazonS3Builder::from_env()
        .with_region(&config.region)
        .with_bucket_name(&config.bucket);

    if let Some(provider) = sdk.credentials_provider() {
        builder = builder.with_credentials(Arc::new(SdkCredentials::new(provider)));
    }

    let store = builder.build().map_err(ListingError::Config)?;
    Ok(Arc::new(store))
}

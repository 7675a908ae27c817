//! Load balancer metadata resolution.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cache::{LoadBalancerMetadata, MetadataCache};
use crate::error::ResolutionError;

const ATTR_LOGS_ENABLED: &str = "access_logs.s3.enabled";
const ATTR_LOGS_BUCKET: &str = "access_logs.s3.bucket";
const ATTR_LOGS_PREFIX: &str = "access_logs.s3.prefix";

/// The two control-plane lookups resolution needs.
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    /// ARN of the load balancer called `name`, `None` if there is none.
    async fn find_arn(&self, name: &str) -> Result<Option<String>, ResolutionError>;

    /// Key/value attributes of the load balancer identified by `arn`.
    async fn attributes(&self, arn: &str) -> Result<Vec<(String, String)>, ResolutionError>;
}

/// Resolves load balancer names to log locations, cache first.
pub struct MetadataResolver<A> {
    api: A,
    cache: MetadataCache,
}

impl<A: LoadBalancerApi> MetadataResolver<A> {
    pub fn new(api: A, cache: MetadataCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Return cached metadata for `name`, or discover it and cache it.
    ///
    /// A cache write failure is logged and otherwise ignored.
    pub async fn resolve(&mut self, name: &str) -> Result<LoadBalancerMetadata, ResolutionError> {
        if let Some(meta) = self.cache.get(name) {
            info!("Using cached log location for {}", name);
            return Ok(meta.clone());
        }

        let meta = self.discover(name).await?;
        self.cache.insert(name, meta.clone());
        if let Err(e) = self.cache.persist() {
            warn!("Could not write cache {:?}: {}", self.cache.path(), e);
        }
        Ok(meta)
    }

    async fn discover(&self, name: &str) -> Result<LoadBalancerMetadata, ResolutionError> {
        info!("Looking up load balancer {}", name);
        let arn = self
            .api
            .find_arn(name)
            .await?
            .ok_or_else(|| ResolutionError::NotFound(name.to_string()))?;

        let attributes = self.api.attributes(&arn).await?;
        let (bucket, prefix) = log_location(name, &attributes)?;
        let (account, region) = account_and_region(&arn)?;

        Ok(LoadBalancerMetadata {
            account,
            region,
            bucket,
            prefix,
        })
    }
}

/// Bucket and prefix from load balancer attributes.
fn log_location(
    name: &str,
    attributes: &[(String, String)],
) -> Result<(String, String), ResolutionError> {
    let mut bucket = String::new();
    let mut prefix = String::new();
    for (key, value) in attributes {
        match key.as_str() {
            ATTR_LOGS_ENABLED if value != "true" => {
                return Err(ResolutionError::LoggingDisabled(name.to_string()));
            }
            ATTR_LOGS_BUCKET => bucket = value.clone(),
            ATTR_LOGS_PREFIX => prefix = value.clone(),
            _ => {}
        }
    }
    if bucket.is_empty() {
        return Err(ResolutionError::NoBucket(name.to_string()));
    }
    Ok((bucket, prefix))
}

/// Split `arn:partition:service:region:account:resource` into
/// `(account, region)`.
pub fn account_and_region(arn: &str) -> Result<(String, String), ResolutionError> {
    let fields: Vec<&str> = arn.splitn(6, ':').collect();
    if fields.len() != 6 {
        return Err(ResolutionError::BadArn(arn.to_string()));
    }
    Ok((fields[4].to_string(), fields[3].to_string()))
}

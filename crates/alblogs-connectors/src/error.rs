//! Typed errors for the connectors crate.

use thiserror::Error;

/// Errors that can occur while resolving where a load balancer keeps its logs.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No load balancer with this name exists.
    #[error("load balancer {0:?} not found")]
    NotFound(String),

    /// Access logging is switched off, so there is nothing to fetch.
    #[error("load balancer {0:?} has S3 access logging disabled")]
    LoggingDisabled(String),

    /// The attributes do not name a log bucket.
    #[error("cannot figure out which S3 bucket load balancer {0:?} logs to")]
    NoBucket(String),

    /// The load balancer ARN does not have the expected shape.
    #[error("bad ARN format: {0:?}")]
    BadArn(String),

    /// A control-plane call failed.
    #[error("elastic load balancing API: {0}")]
    Api(String),
}

/// Errors that can occur while selecting candidate log files.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Listing objects failed.
    #[error("listing s3://{bucket}/{prefix}: {source}")]
    Storage {
        bucket: String,
        prefix: String,
        #[source]
        source: object_store::Error,
    },

    /// Nothing was modified inside the time window.
    #[error("no candidate log files found, bucket {bucket:?}, prefix {prefix:?}")]
    NoCandidates { bucket: String, prefix: String },

    /// The object store could not be configured.
    #[error("building S3 object store: {0}")]
    Config(#[source] object_store::Error),
}

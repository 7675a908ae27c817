//! Candidate log-file selection.
//!
//! ALB access logs are written under
//! `<prefix>/AWSLogs/<account>/elasticloadbalancing/<region>/YYYY/MM/DD/`,
//! grouped by UTC day. A file is a candidate when it was last modified within
//! [`CANDIDATE_WINDOW`] after the reference time.

use std::sync::Arc;

use alblogs_core::CANDIDATE_WINDOW;
use chrono::{DateTime, TimeZone, Utc};
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use tracing::{debug, info};

use crate::cache::LoadBalancerMetadata;
use crate::error::ListingError;

pub const LOG_SUFFIX: &str = ".log.gz";

const LOGS_SEGMENT: &str = "AWSLogs";
const SERVICE_SEGMENT: &str = "elasticloadbalancing";

/// A log object worth loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    pub bucket: String,
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Result of one listing.
#[derive(Debug, Clone)]
pub struct Candidates {
    pub bucket: String,
    /// The full listing prefix, including the date.
    pub prefix: String,
    /// Matching keys in listing order.
    pub keys: Vec<CandidateKey>,
}

impl Candidates {
    /// Fail with [`ListingError::NoCandidates`] when nothing matched.
    pub fn require_any(self) -> Result<Self, ListingError> {
        if self.keys.is_empty() {
            return Err(ListingError::NoCandidates {
                bucket: self.bucket,
                prefix: self.prefix,
            });
        }
        Ok(self)
    }
}

/// Full listing prefix for the UTC day containing `ref_time`.
///
/// Empty segments are dropped and slashes at segment edges are trimmed, so an
/// unset or slash-terminated log prefix produces a clean path.
pub fn listing_prefix<Tz: TimeZone>(
    prefix: &str,
    account: &str,
    region: &str,
    ref_time: &DateTime<Tz>,
) -> String {
    let day = ref_time.with_timezone(&Utc).format("%Y/%m/%d").to_string();
    [prefix, LOGS_SEGMENT, account, SERVICE_SEGMENT, region, day.as_str()]
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `meta` is a log file modified in `[ref_time, ref_time + window]`.
pub fn is_candidate(meta: &ObjectMeta, ref_time: DateTime<Utc>) -> bool {
    let key = meta.location.as_ref();
    if key.is_empty() || !key.ends_with(LOG_SUFFIX) {
        return false;
    }
    meta.last_modified >= ref_time && meta.last_modified <= ref_time + CANDIDATE_WINDOW
}

/// Lists log files for one load balancer.
pub struct CandidateKeySelector {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl CandidateKeySelector {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// List the candidates for `ref_time`, walking every listing page.
    pub async fn select<Tz: TimeZone>(
        &self,
        meta: &LoadBalancerMetadata,
        ref_time: &DateTime<Tz>,
    ) -> Result<Candidates, ListingError> {
        let ref_time = ref_time.with_timezone(&Utc);
        let prefix = listing_prefix(&meta.prefix, &meta.account, &meta.region, &ref_time);
        info!("Listing s3://{}/{}", self.bucket, prefix);

        let location = ObjectPath::from(prefix.as_str());
        let mut listing = self.store.list(Some(&location));
        let mut keys = Vec::new();
        let mut seen = 0usize;
        while let Some(object) = listing
            .try_next()
            .await
            .map_err(|source| ListingError::Storage {
                bucket: self.bucket.clone(),
                prefix: prefix.clone(),
                source,
            })?
        {
            seen += 1;
            if is_candidate(&object, ref_time) {
                keys.push(CandidateKey {
                    bucket: self.bucket.clone(),
                    key: object.location.to_string(),
                    last_modified: object.last_modified,
                });
            }
        }
        debug!("{} of {} listed objects are candidates", keys.len(), seen);

        Ok(Candidates {
            bucket: self.bucket.clone(),
            prefix,
            keys,
        })
    }
}

//! alblogs connectors - AWS-facing collaborators
//!
//! This crate provides:
//! - the persisted load balancer metadata cache
//! - metadata resolution over the Elastic Load Balancing API
//! - S3 object-store construction for a log bucket
//! - candidate log-file selection around a reference time

pub mod cache;
pub mod elb;
pub mod error;
pub mod keys;
pub mod resolver;
pub mod s3;

pub use cache::{LoadBalancerMetadata, MetadataCache};
pub use elb::ElbClient;
pub use error::{ListingError, ResolutionError};
pub use keys::{CandidateKey, CandidateKeySelector, Candidates};
pub use resolver::{LoadBalancerApi, MetadataResolver};
pub use s3::S3Config;

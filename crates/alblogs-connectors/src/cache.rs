//! Persisted load balancer metadata cache.
//!
//! A single JSON object maps load balancer names to where they write access
//! logs. The file is read once per run and written back with read-merge-write
//! so entries written by earlier runs survive. An unreadable or malformed file
//! is an empty cache.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a load balancer's access logs live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerMetadata {
    pub account: String,
    pub region: String,
    pub bucket: String,
    /// Key prefix configured for access logs, possibly empty.
    #[serde(default)]
    pub prefix: String,
}

pub type CacheEntries = BTreeMap<String, LoadBalancerMetadata>;

/// In-memory view of the cache file.
#[derive(Debug)]
pub struct MetadataCache {
    path: PathBuf,
    entries: CacheEntries,
}

impl MetadataCache {
    /// Load the cache at `path`. Never fails.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path);
        debug!("Loaded {} cached load balancers from {:?}", entries.len(), path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&LoadBalancerMetadata> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: &str, metadata: LoadBalancerMetadata) {
        self.entries.insert(name.to_string(), metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge our entries over whatever is on disk now and write the result.
    pub fn persist(&self) -> anyhow::Result<()> {
        let mut merged = read_entries(&self.path);
        merged.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&merged)?;
        fs::write(&self.path, json)?;
        debug!("Wrote {} cached load balancers to {:?}", merged.len(), self.path);
        Ok(())
    }

    /// Delete the cache file, if any.
    pub fn clear(path: impl AsRef<Path>) -> std::io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn read_entries(path: &Path) -> CacheEntries {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Cache {:?} not readable: {}", path, e);
            return CacheEntries::new();
        }
    };
    serde_json::from_slice(&content).unwrap_or_else(|e| {
        debug!("Cache {:?} is malformed, ignoring: {}", path, e);
        CacheEntries::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(bucket: &str) -> LoadBalancerMetadata {
        LoadBalancerMetadata {
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            bucket: bucket.to_string(),
            prefix: "alb".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::load(dir.path().join("absent.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_byte_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"").unwrap();
        assert!(MetadataCache::load(&path).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{\"lb\": [1, 2").unwrap();
        assert!(MetadataCache::load(&path).is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = MetadataCache::load(&path);
        cache.insert("web", meta("logs-web"));
        cache.persist().unwrap();

        let reloaded = MetadataCache::load(&path);
        assert_eq!(reloaded.get("web"), Some(&meta("logs-web")));
    }

    #[test]
    fn test_persist_merges_with_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut first = MetadataCache::load(&path);
        let mut second = MetadataCache::load(&path);

        first.insert("api", meta("logs-api"));
        first.persist().unwrap();

        second.insert("web", meta("logs-web"));
        second.persist().unwrap();

        let reloaded = MetadataCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("api"), Some(&meta("logs-api")));
        assert_eq!(reloaded.get("web"), Some(&meta("logs-web")));
    }

    #[test]
    fn test_prefix_defaults_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(
            &path,
            r#"{"lb": {"account": "1", "region": "eu-west-1", "bucket": "b"}}"#,
        )
        .unwrap();

        let cache = MetadataCache::load(&path);
        assert_eq!(cache.get("lb").unwrap().prefix, "");
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{}").unwrap();

        MetadataCache::clear(&path).unwrap();
        assert!(!path.exists());
        MetadataCache::clear(&path).unwrap();
    }
}

//! Filesystem locations from environment variables.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "alblogs";
const CACHE_FILE: &str = "alblogs-cache.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Holds the metadata cache file.
    pub cache_dir: PathBuf,
    /// Holds default database files.
    pub temp_dir: PathBuf,
}

impl Paths {
    /// `ALBLOGS_CACHE_DIR` overrides the per-user cache directory.
    pub fn from_env() -> Self {
        let cache_dir = std::env::var_os("ALBLOGS_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                user_cache_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join(APP_DIR)
            });
        Self {
            cache_dir,
            temp_dir: std::env::temp_dir().join(APP_DIR),
        }
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE)
    }

    /// Default database for a load balancer; the directory is created.
    pub fn default_database(&self, load_balancer: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.temp_dir)?;
        Ok(self.temp_dir.join(format!("{}.db", load_balancer)))
    }

    /// Remove the temp and cache directories, ignoring errors.
    pub fn clean(&self) {
        for dir in [&self.temp_dir, &self.cache_dir] {
            if let Err(e) = remove_dir(dir) {
                tracing::debug!("Could not remove {:?}: {}", dir, e);
            }
        }
    }
}

fn remove_dir(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn user_cache_dir() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        return home().map(|h| h.join("Library").join("Caches"));
    }
    if cfg!(windows) {
        return std::env::var_os("LOCALAPPDATA").map(PathBuf::from);
    }
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| home().map(|h| h.join(".cache")))
}

fn home() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

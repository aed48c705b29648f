//! Disk cache for fetched model artifacts.
//!
//! Cached files are keyed by a hash of the model base URL:
//! `{hash}.model.json` holds the definition and `{hash}.metadata.json`
//! the label metadata. The cache only ever stores model artifacts,
//! never user images.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Cache of model definition and metadata documents.
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a cache rooted at the given directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Create a cache at the default location:
    /// `~/.cache/attire-check/models` (or `.cache/...` as a fallback).
    pub fn with_default_dir() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        Self::new(base.join("attire-check").join("models"))
    }

    /// Create a cache and ensure its directory exists.
    pub fn new_initialized(cache_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let cache = Self::new(cache_dir);
        cache.ensure_dir_exists()?;
        Ok(cache)
    }

    /// Default-location cache with the directory created.
    pub fn with_default_dir_initialized() -> std::io::Result<Self> {
        let cache = Self::with_default_dir();
        cache.ensure_dir_exists()?;
        Ok(cache)
    }

    /// Create the cache directory (and parents) if missing.
    pub fn ensure_dir_exists(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// The directory this cache stores files in.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Look up cached (definition, metadata) bytes for a model URL.
    ///
    /// Returns `None` unless both documents are present and readable.
    pub fn get(&self, url: &str) -> Option<(Vec<u8>, Vec<u8>)> {
        let definition = fs::read(self.definition_path(url)).ok()?;
        let metadata = fs::read(self.metadata_path(url)).ok()?;
        Some((definition, metadata))
    }

    /// Store both documents for a model URL, creating the directory as
    /// needed. An interrupted write of one file leaves `get` returning
    /// `None` only if the other is missing too, so the definition is
    /// written first and metadata last.
    pub fn store(&self, url: &str, definition: &[u8], metadata: &[u8]) -> std::io::Result<()> {
        self.ensure_dir_exists()?;
        fs::write(self.definition_path(url), definition)?;
        fs::write(self.metadata_path(url), metadata)?;
        Ok(())
    }

    /// Remove the cached documents for a model URL. Returns whether
    /// anything was removed.
    pub fn remove(&self, url: &str) -> bool {
        let removed_def = fs::remove_file(self.definition_path(url)).is_ok();
        let removed_meta = fs::remove_file(self.metadata_path(url)).is_ok();
        removed_def || removed_meta
    }

    fn definition_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.model.json", hash_url(url)))
    }

    fn metadata_path(&self, url: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.metadata.json", hash_url(url)))
    }
}

/// Stable filesystem-safe key for a URL: first 16 bytes of its SHA-256,
/// hex encoded.
fn hash_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..16])
}

use crate::config::ExtractOptions;
use crate::extract::Extraction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub extraction: Extraction,
}

/// Extraction results keyed by file path, valid while the source and the
/// extraction inputs (`process_css`, options) match.
pub struct IncrementalCache {
    cache_dir: PathBuf,
    options_key: String,
}

impl IncrementalCache {
    pub fn new(cache_dir: impl Into<PathBuf>, options: &ExtractOptions) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self {
            cache_dir,
            options_key: serde_json::to_string(options).unwrap_or_default(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn compute_hash(&self, source: &str, process_css: bool) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8, process_css as u8, 0u8]);
        hasher.update(self.options_key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(file_path.as_bytes());
        self.cache_dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn get(&self, file_path: &str, source: &str, process_css: bool) -> Option<Extraction> {
        let cache_path = self.get_cache_path(file_path);
        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                warn!(file = %file_path, error = %e, "dropping corrupt cache entry");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == self.compute_hash(source, process_css) {
            trace!(file = %file_path, "cache hit");
            Some(entry.extraction)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, process_css: bool, extraction: &Extraction) {
        let cache_path = self.get_cache_path(file_path);
        let entry = CacheEntry {
            hash: self.compute_hash(source, process_css),
            extraction: extraction.clone(),
        };

        if let Ok(data) = serde_json::to_string(&entry) {
            if let Err(e) = fs::write(&cache_path, data) {
                warn!(path = %cache_path.display(), error = %e, "failed to write cache entry");
            }
        }
    }
}

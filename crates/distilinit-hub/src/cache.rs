use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HubError, HubResult};
use crate::integrity::verify_integrity;

/// Sidecar written next to every downloaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub repo_id: String,
    pub revision: String,
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// On-disk checkpoint cache.
///
/// Layout: `<cache_dir>/<owner>__<repo>/<revision>/<filename>`
/// Metadata sidecar: `<filename>.meta.json`
#[derive(Debug, Clone)]
pub struct ModelCache {
    root: PathBuf,
}

impl ModelCache {
    /// Create a cache rooted at `root` (`~` is expanded), creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> HubResult<Self> {
        let root = expand_tilde(&root.into());
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// `~/.cache/distilinit`.
    pub fn default_cache() -> HubResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            HubError::InvalidCacheDir("Cannot determine home directory".to_string())
        })?;
        Self::new(home.join(".cache").join("distilinit"))
    }

    /// Directory holding every file of `(repo_id, revision)`; this is what
    /// the state-dict loader is pointed at.
    pub fn model_dir(&self, repo_id: &str, revision: &str) -> PathBuf {
        self.root.join(repo_id.replace('/', "__")).join(revision)
    }

    pub fn file_path(&self, repo_id: &str, revision: &str, filename: &str) -> PathBuf {
        self.model_dir(repo_id, revision).join(filename)
    }

    pub fn meta_path(&self, repo_id: &str, revision: &str, filename: &str) -> PathBuf {
        self.model_dir(repo_id, revision)
            .join(format!("{filename}.meta.json"))
    }

    /// `true` when the file and its sidecar exist and the recorded digest
    /// still matches the file on disk.
    pub fn is_cached(&self, repo_id: &str, revision: &str, filename: &str) -> bool {
        let path = self.file_path(repo_id, revision, filename);
        if !path.is_file() {
            return false;
        }
        let Ok(meta) = self.read_meta(repo_id, revision, filename) else {
            return false;
        };
        match verify_integrity(&path, &meta.sha256) {
            Ok(()) => true,
            Err(e) => {
                warn!(filename, error = %e, "Cached file is corrupt, will download again");
                false
            }
        }
    }

    pub fn write_meta(&self, meta: &FileMetadata) -> HubResult<()> {
        let path = self.meta_path(&meta.repo_id, &meta.revision, &meta.filename);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(meta)?)?;
        debug!(path = %path.display(), "Wrote metadata");
        Ok(())
    }

    pub fn read_meta(&self, repo_id: &str, revision: &str, filename: &str) -> HubResult<FileMetadata> {
        let path = self.meta_path(repo_id, revision, filename);
        let json = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::sha256_file;
    use std::env::temp_dir;

    fn temp_cache(suffix: &str) -> (ModelCache, PathBuf) {
        let dir = temp_dir().join(format!("distilinit_cache_test_{suffix}"));
        std::fs::remove_dir_all(&dir).ok();
        let cache = ModelCache::new(&dir).unwrap();
        (cache, dir)
    }

    fn store(cache: &ModelCache, filename: &str, contents: &[u8]) -> PathBuf {
        let path = cache.file_path("google/bert_uncased", "main", filename);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        cache
            .write_meta(&FileMetadata {
                repo_id: "google/bert_uncased".to_string(),
                revision: "main".to_string(),
                filename: filename.to_string(),
                sha256: sha256_file(&path).unwrap(),
                size_bytes: contents.len() as u64,
            })
            .unwrap();
        path
    }

    #[test]
    fn model_dir_encodes_slash() {
        let (cache, dir) = temp_cache("md");
        let p = cache.model_dir("monologg/kobert-lm", "main");
        assert_eq!(p, dir.join("monologg__kobert-lm").join("main"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn meta_path_sits_next_to_file() {
        let (cache, dir) = temp_cache("mp");
        let file = cache.file_path("a/b", "rev", "model.safetensors");
        let meta = cache.meta_path("a/b", "rev", "model.safetensors");
        assert_eq!(meta.parent(), file.parent());
        assert!(meta.to_string_lossy().ends_with("model.safetensors.meta.json"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn not_cached_initially() {
        let (cache, dir) = temp_cache("ic");
        assert!(!cache.is_cached("test/model", "main", "pytorch_model.bin"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn cached_after_file_and_meta_written() {
        let (cache, dir) = temp_cache("ok");
        store(&cache, "config.json", b"{\"model_type\": \"bert\"}");
        assert!(cache.is_cached("google/bert_uncased", "main", "config.json"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn modified_file_is_not_cached() {
        let (cache, dir) = temp_cache("tamper");
        let path = store(&cache, "model.safetensors", b"original bytes");
        std::fs::write(&path, b"truncated").unwrap();
        assert!(!cache.is_cached("google/bert_uncased", "main", "model.safetensors"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn file_without_meta_is_not_cached() {
        let (cache, dir) = temp_cache("nometa");
        let path = cache.file_path("a/b", "main", "config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{}").unwrap();
        assert!(!cache.is_cached("a/b", "main", "config.json"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn metadata_round_trip() {
        let (cache, dir) = temp_cache("meta");
        let meta = FileMetadata {
            repo_id: "test/model".to_string(),
            revision: "main".to_string(),
            filename: "config.json".to_string(),
            sha256: "deadbeef".to_string(),
            size_bytes: 1024,
        };
        cache.write_meta(&meta).unwrap();
        let back = cache.read_meta("test/model", "main", "config.json").unwrap();
        assert_eq!(back.sha256, "deadbeef");
        assert_eq!(back.size_bytes, 1024);
        std::fs::remove_dir_all(dir).ok();
    }
}

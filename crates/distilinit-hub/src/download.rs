use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use hf_hub::{
    api::tokio::{Api, ApiBuilder, ApiRepo},
    Repo, RepoType,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::{
    cache::{FileMetadata, ModelCache},
    error::{HubError, HubResult},
    integrity::sha256_file,
};

/// Architecture config read by the model-type check.
const CONFIG_FILE: &str = "config.json";

const SAFETENSORS_INDEX: &str = "model.safetensors.index.json";
const SAFETENSORS_SINGLE: &str = "model.safetensors";
const PYTORCH_INDEX: &str = "pytorch_model.bin.index.json";
const PYTORCH_SINGLE: &str = "pytorch_model.bin";

const PB_TEMPLATE_SIZED: &str =
    "{wide_msg}\n[{bar:50.cyan/blue}] {bytes}/{total_bytes}  {bytes_per_sec}  ETA {eta}";

const PB_TEMPLATE_SPINNER: &str =
    "{spinner:.green} {wide_msg}  {bytes}  {bytes_per_sec}  [{elapsed_precise}]";

/// Which weight files a repository listing offers, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightFiles {
    /// A `*.index.json` whose `weight_map` names the shards.
    Sharded { index: String },
    /// One self-contained checkpoint file.
    Single(String),
}

/// Pick the weight files to fetch from a repo's file listing.
///
/// Safetensors beats PyTorch pickles; within a format the sharded index beats
/// the single file, matching how the state-dict loader probes a directory.
pub fn select_weight_files(repo_files: &[String]) -> Option<WeightFiles> {
    let has = |name: &str| repo_files.iter().any(|f| f == name);

    if has(SAFETENSORS_INDEX) {
        Some(WeightFiles::Sharded { index: SAFETENSORS_INDEX.to_string() })
    } else if has(SAFETENSORS_SINGLE) {
        Some(WeightFiles::Single(SAFETENSORS_SINGLE.to_string()))
    } else if has(PYTORCH_INDEX) {
        Some(WeightFiles::Sharded { index: PYTORCH_INDEX.to_string() })
    } else if has(PYTORCH_SINGLE) {
        Some(WeightFiles::Single(PYTORCH_SINGLE.to_string()))
    } else {
        None
    }
}

/// Whether the repo ships a `config.json` that must be fetched.
///
/// Repos that don't list one are pulled without it; a listed one that fails
/// to download fails the pull.
pub fn config_required(repo_files: &[String]) -> bool {
    repo_files.iter().any(|f| f == CONFIG_FILE)
}

/// Unique shard filenames named by a HF `*.index.json`, sorted.
pub fn shard_filenames(index_json: &str) -> HubResult<Vec<String>> {
    let index: serde_json::Value = serde_json::from_str(index_json)?;
    let shards: BTreeSet<&str> = index["weight_map"]
        .as_object()
        .map(|m| m.values().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    Ok(shards.into_iter().map(String::from).collect())
}

// ─── Downloader ───────────────────────────────────────────────────────────────

/// Fetches teacher checkpoints from the Hugging Face Hub into a [`ModelCache`].
pub struct ModelDownloader {
    cache: ModelCache,
    api: Api,
    http: reqwest::Client,
    hf_token: Option<String>,
}

impl ModelDownloader {
    /// Reads `HUGGING_FACE_HUB_TOKEN` from the environment if present.
    pub fn new(cache: ModelCache) -> HubResult<Self> {
        let hf_token = std::env::var("HUGGING_FACE_HUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let api = ApiBuilder::new()
            .with_token(hf_token.clone())
            .build()
            .map_err(|e| HubError::DownloadFailed {
                file: "<api init>".into(),
                reason: e.to_string(),
            })?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("distilinit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HubError::DownloadFailed {
                file: "<http client>".into(),
                reason: e.to_string(),
            })?;

        Ok(Self { cache, api, http, hf_token })
    }

    /// Download the config and weight files of `repo_id` at `revision`.
    ///
    /// Returns the local model directory, ready for the state-dict loader.
    pub async fn pull_checkpoint(
        &self,
        repo_id: &str,
        revision: &str,
        mp: Option<&MultiProgress>,
    ) -> HubResult<PathBuf> {
        info!(repo_id, revision, "Resolving teacher checkpoint on the Hub");

        let repo = self.api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let listing: Vec<String> = repo
            .info()
            .await
            .map_err(|e| HubError::DownloadFailed {
                file: format!("<repo info: {repo_id}>"),
                reason: format!("{e}{}", auth_hint(&e.to_string())),
            })?
            .siblings
            .into_iter()
            .map(|s| s.rfilename)
            .collect();

        let weights = select_weight_files(&listing)
            .ok_or_else(|| HubError::NoWeightFiles(repo_id.to_string()))?;

        if config_required(&listing) {
            self.download_file(&repo, repo_id, revision, CONFIG_FILE, mp).await?;
        } else {
            warn!(repo_id, "Repo lists no config.json, skipping architecture check");
        }

        let files = match weights {
            WeightFiles::Single(name) => vec![name],
            WeightFiles::Sharded { index } => {
                let index_path = self.download_file(&repo, repo_id, revision, &index, mp).await?;
                let shards = shard_filenames(&std::fs::read_to_string(&index_path)?)?;
                if shards.is_empty() {
                    return Err(HubError::NoWeightFiles(repo_id.to_string()));
                }
                shards
            }
        };

        info!(repo_id, files = files.len(), "Downloading weight files");
        for filename in &files {
            self.download_file(&repo, repo_id, revision, filename, mp).await?;
        }

        Ok(self.cache.model_dir(repo_id, revision))
    }

    // ─── Download engine ──────────────────────────────────────────────────────

    /// Stream one file into the cache with a progress bar.
    ///
    /// Writes to `<dest>.tmp` and renames on success, then records the
    /// SHA-256 sidecar.
    async fn download_file(
        &self,
        repo: &ApiRepo,
        repo_id: &str,
        revision: &str,
        filename: &str,
        mp: Option<&MultiProgress>,
    ) -> HubResult<PathBuf> {
        let dest = self.cache.file_path(repo_id, revision, filename);

        if self.cache.is_cached(repo_id, revision, filename) {
            debug!(filename, "Already cached, skipping download");
            return Ok(dest);
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = repo.url(filename);
        info!(filename, "Downloading");

        let mut req = self.http.get(&url);
        if let Some(ref token) = self.hf_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req.send().await.map_err(|e| HubError::DownloadFailed {
            file: filename.to_string(),
            reason: format!("{e}{}", auth_hint(&e.to_string())),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::DownloadFailed {
                file: filename.to_string(),
                reason: format!("HTTP {status}{}", auth_hint(status.as_str())),
            });
        }

        let pb = mp.map(|m| progress_bar(m, filename, response.content_length()));

        let tmp_path = dest.with_file_name(format!("{filename}.tmp"));
        match stream_to_disk(response, &tmp_path, pb.as_ref()).await {
            Ok(()) => std::fs::rename(&tmp_path, &dest)?,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        }

        let sha256 = sha256_file(&dest)?;
        let size_bytes = std::fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
        self.cache.write_meta(&FileMetadata {
            repo_id: repo_id.to_string(),
            revision: revision.to_string(),
            filename: filename.to_string(),
            sha256,
            size_bytes,
        })?;

        if let Some(ref pb) = pb {
            pb.finish_with_message(format!("Done  {filename}"));
        }

        Ok(dest)
    }
}

/// Write a streaming HTTP body to `path`, advancing `pb` per chunk.
async fn stream_to_disk(
    response: reqwest::Response,
    path: &Path,
    pb: Option<&ProgressBar>,
) -> HubResult<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| HubError::DownloadFailed {
            file: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
        file.write_all(&chunk)?;
        if let Some(pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }

    file.flush()?;
    Ok(())
}

fn progress_bar(mp: &MultiProgress, filename: &str, total: Option<u64>) -> ProgressBar {
    let pb = match total {
        Some(total) => {
            let pb = mp.add(ProgressBar::new(total));
            if let Ok(style) = ProgressStyle::with_template(PB_TEMPLATE_SIZED) {
                pb.set_style(style.progress_chars("##-"));
            }
            pb
        }
        None => {
            let pb = mp.add(ProgressBar::new_spinner());
            if let Ok(style) = ProgressStyle::with_template(PB_TEMPLATE_SPINNER) {
                pb.set_style(style);
            }
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        }
    };
    pb.set_message(filename.to_string());
    pb
}

fn auth_hint(msg: &str) -> &'static str {
    if msg.contains("401") || msg.contains("403") {
        " (hint: set HUGGING_FACE_HUB_TOKEN for gated repos)"
    } else {
        ""
    }
}

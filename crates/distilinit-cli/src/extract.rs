//! The extraction run: resolve the teacher, distil, write the student.
//!
//! `--model_name` may be a local checkpoint file, a local model directory, or
//! a Hugging Face repo id. Repo ids are downloaded into the cache first.
//!
//! ```text
//! distilinit --model_type bert --model_name bert-base-uncased --num_layer 6 --vocab_transform
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::MultiProgress;
use tracing::info;

use distilinit_core::{default_checkpoint_path, distill, LayerSelection, ModelType, StateDict};
use distilinit_hub::{ModelCache, ModelDownloader};

use crate::config::{expand_home, AppConfig};

/// Parsed command-line inputs for one run.
#[derive(Debug, Clone)]
pub struct ExtractArgs {
    pub model_type: String,
    pub model_name: String,
    pub vocab_transform: bool,
    pub num_layer: usize,
    pub dump_checkpoint: Option<PathBuf>,
    pub revision: Option<String>,
}

/// Where the teacher weights live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Dir(PathBuf),
    File(PathBuf),
}

pub async fn run(args: &ExtractArgs, config: &AppConfig) -> Result<PathBuf> {
    // Both checks run before anything is downloaded or loaded.
    let model_type = ModelType::parse(&args.model_type)
        .with_context(|| format!("Invalid --model_type '{}'", args.model_type))?;
    let selection = LayerSelection::for_count(args.num_layer)
        .with_context(|| format!("Invalid --num_layer {}", args.num_layer))?;

    let dump_checkpoint = args.dump_checkpoint.clone().unwrap_or_else(|| {
        default_checkpoint_path(Path::new(&config.output.serialization_dir), args.num_layer)
    });

    info!(
        model_type = model_type.label(),
        model_name = %args.model_name,
        num_layer = args.num_layer,
        teacher_layers = ?selection.teacher_layers(),
        vocab_transform = args.vocab_transform,
        "Extracting student checkpoint"
    );

    let source = match local_source(&args.model_name) {
        Some(source) => source,
        None => {
            let revision = args.revision.as_deref().unwrap_or(&config.hub.revision);
            Source::Dir(download(&args.model_name, revision, config).await?)
        }
    };

    let mut state_dict = load(&source, model_type)
        .with_context(|| format!("Failed to load teacher '{}'", args.model_name))?;
    if state_dict.is_empty() {
        bail!("Teacher '{}' holds no tensors", args.model_name);
    }
    state_dict.normalize(model_type);
    info!(tensors = state_dict.len(), "Teacher state dict ready");

    let student = distill(&state_dict, model_type, args.num_layer, args.vocab_transform)
        .context("Failed to build student checkpoint")?;

    println!("N layers selected for distillation: {}", student.num_layers());
    println!("Number of params transfered for distillation: {}", student.len());
    println!("Save transfered checkpoint to {}.", dump_checkpoint.display());

    student
        .save(&dump_checkpoint)
        .with_context(|| format!("Failed to write {}", dump_checkpoint.display()))?;

    Ok(dump_checkpoint)
}

/// Treat `model_name` as a path when it exists on disk.
fn local_source(model_name: &str) -> Option<Source> {
    let path = expand_home(model_name);
    if path.is_dir() {
        Some(Source::Dir(path))
    } else if path.is_file() {
        Some(Source::File(path))
    } else {
        None
    }
}

fn load(source: &Source, model_type: ModelType) -> Result<StateDict> {
    let state_dict = match source {
        Source::Dir(dir) => {
            model_type.verify_config(dir)?;
            StateDict::from_dir(dir)?
        }
        Source::File(file) => {
            if let Some(dir) = file.parent() {
                model_type.verify_config(dir)?;
            }
            StateDict::from_file(file)?
        }
    };
    Ok(state_dict)
}

async fn download(repo_id: &str, revision: &str, config: &AppConfig) -> Result<PathBuf> {
    let cache = ModelCache::new(expand_home(&config.hub.cache_dir))?;
    let downloader = ModelDownloader::new(cache).context("Failed to create model downloader")?;
    let mp = MultiProgress::new();

    downloader
        .pull_checkpoint(repo_id, revision, Some(&mp))
        .await
        .with_context(|| format!("Download failed for '{repo_id}'"))
}

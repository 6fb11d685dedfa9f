//! Flat `name → tensor` view of a teacher checkpoint.
//!
//! ## Accepted layouts
//!
//! A model directory is probed in this order:
//!
//! | File | Reader |
//! |------|--------|
//! | `model.safetensors.index.json` + shards | `candle_core::safetensors` |
//! | `model.safetensors` | `candle_core::safetensors` |
//! | `pytorch_model.bin.index.json` + shards | `candle_core::pickle` |
//! | `pytorch_model.bin` | `candle_core::pickle` |
//!
//! A single file is read by extension: `.safetensors`, or `.bin` / `.pt` /
//! `.pth` for PyTorch pickles.
//!
//! ## Normalisation
//!
//! [`StateDict::normalize`] makes the raw file look like the parameters of an
//! instantiated masked-LM: legacy `LayerNorm.gamma` / `LayerNorm.beta` names
//! become `weight` / `bias`, and a missing decoder weight is tied to the word
//! embeddings.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use tracing::{debug, info};

use crate::architecture::ModelType;
use crate::error::{CoreError, CoreResult};
use crate::mapping::{self, DECODER_WEIGHT};

const SAFETENSORS_INDEX: &str = "model.safetensors.index.json";
const SAFETENSORS_SINGLE: &str = "model.safetensors";
const PYTORCH_INDEX: &str = "pytorch_model.bin.index.json";
const PYTORCH_SINGLE: &str = "pytorch_model.bin";

/// On-disk encoding of a checkpoint file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    SafeTensors,
    Pickle,
}

impl WeightFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("safetensors") => Some(Self::SafeTensors),
            Some("bin") | Some("pt") | Some("pth") => Some(Self::Pickle),
            _ => None,
        }
    }
}

/// Teacher parameters keyed by their fully qualified dotted name.
#[derive(Debug, Clone, Default)]
pub struct StateDict {
    tensors: HashMap<String, Tensor>,
}

impl StateDict {
    pub fn from_tensors(tensors: impl IntoIterator<Item = (String, Tensor)>) -> Self {
        Self { tensors: tensors.into_iter().collect() }
    }

    /// Load every weight file of a HF model directory onto the CPU.
    pub fn from_dir(model_dir: &Path) -> CoreResult<Self> {
        let (format, paths) = weight_files(model_dir)?;
        info!(
            model_dir = %model_dir.display(),
            format = ?format,
            files = paths.len(),
            "Loading teacher state dict"
        );

        let mut tensors = HashMap::new();
        for path in &paths {
            tensors.extend(read_file(path, format)?);
        }
        Ok(Self { tensors })
    }

    /// Load a single checkpoint file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let format = WeightFormat::from_path(path)
            .ok_or_else(|| CoreError::NoWeights(path.to_path_buf()))?;
        info!(path = %path.display(), format = ?format, "Loading teacher checkpoint file");
        Ok(Self { tensors: read_file(path, format)? })
    }

    /// Bring legacy names and tied weights in line with an instantiated
    /// `model_type` masked-LM.
    pub fn normalize(&mut self, model_type: ModelType) {
        let legacy: Vec<String> = self
            .tensors
            .keys()
            .filter(|k| k.ends_with(".gamma") || k.ends_with(".beta"))
            .cloned()
            .collect();

        for old in legacy {
            let new = match old.strip_suffix(".gamma") {
                Some(stem) => format!("{stem}.weight"),
                None => format!("{}.bias", old.strip_suffix(".beta").unwrap_or(&old)),
            };
            if let Some(t) = self.tensors.remove(&old) {
                debug!(from = %old, to = %new, "Renaming legacy LayerNorm parameter");
                self.tensors.insert(new, t);
            }
        }

        if !self.tensors.contains_key(DECODER_WEIGHT) {
            let word = mapping::resolve(mapping::WORD_EMBEDDINGS, model_type);
            if let Some(t) = self.tensors.get(&word).cloned() {
                debug!(from = %word, to = DECODER_WEIGHT, "Tying decoder weight to word embeddings");
                self.tensors.insert(DECODER_WEIGHT.to_string(), t);
            }
        }
    }

    /// Look up `name`, failing with [`CoreError::MissingTensor`].
    pub fn require(&self, name: &str) -> CoreResult<&Tensor> {
        self.tensors
            .get(name)
            .ok_or_else(|| CoreError::MissingTensor(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn read_file(path: &Path, format: WeightFormat) -> CoreResult<HashMap<String, Tensor>> {
    debug!(path = %path.display(), "Reading weight file");
    let tensors = match format {
        WeightFormat::SafeTensors => candle_core::safetensors::load(path, &Device::Cpu)?,
        WeightFormat::Pickle => candle_core::pickle::read_all(path)?.into_iter().collect(),
    };
    Ok(tensors)
}

/// Resolve the weight files of `dir` following the table in the module docs.
fn weight_files(dir: &Path) -> CoreResult<(WeightFormat, Vec<PathBuf>)> {
    let candidates = [
        (SAFETENSORS_INDEX, SAFETENSORS_SINGLE, WeightFormat::SafeTensors),
        (PYTORCH_INDEX, PYTORCH_SINGLE, WeightFormat::Pickle),
    ];

    for (index, single, format) in candidates {
        let index_path = dir.join(index);
        if index_path.is_file() {
            return Ok((format, shard_paths(dir, &index_path)?));
        }
        let single_path = dir.join(single);
        if single_path.is_file() {
            return Ok((format, vec![single_path]));
        }
    }

    Err(CoreError::NoWeights(dir.to_path_buf()))
}

/// Unique shard files referenced by a HF `*.index.json`, sorted.
fn shard_paths(dir: &Path, index_path: &Path) -> CoreResult<Vec<PathBuf>> {
    let json = std::fs::read_to_string(index_path)?;
    let index: serde_json::Value = serde_json::from_str(&json)?;
    let shards: BTreeSet<&str> = index["weight_map"]
        .as_object()
        .map(|m| m.values().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    if shards.is_empty() {
        return Err(CoreError::NoWeights(dir.to_path_buf()));
    }
    Ok(shards.iter().map(|s| dir.join(s)).collect())
}

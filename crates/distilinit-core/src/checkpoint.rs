//! The distilled student checkpoint and its safetensors writer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::Tensor;
use tracing::info;

use crate::error::CoreResult;

/// Student parameters produced by [`distill`](crate::distill).
#[derive(Debug, Clone)]
pub struct StudentCheckpoint {
    tensors: HashMap<String, Tensor>,
    num_layers: usize,
}

impl StudentCheckpoint {
    pub fn new(tensors: HashMap<String, Tensor>, num_layers: usize) -> Self {
        Self { tensors, num_layers }
    }

    /// Number of transformer layers the student receives.
    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// Number of parameter tensors transferred.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Write all tensors to `path` as safetensors.
    ///
    /// Parent directories are created. The data goes to `<path>.tmp` first and
    /// is renamed into place, so `path` only ever holds a complete checkpoint.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_file_name(format!(
            "{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));

        if let Err(e) = candle_core::safetensors::save(&self.tensors, &tmp_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        std::fs::rename(&tmp_path, path)?;

        info!(
            path = %path.display(),
            tensors = self.tensors.len(),
            num_layers = self.num_layers,
            "Student checkpoint written"
        );
        Ok(())
    }
}

/// Default output location: `<serialization_dir>/<num_layers>_layer.safetensors`.
pub fn default_checkpoint_path(serialization_dir: &Path, num_layers: usize) -> PathBuf {
    serialization_dir.join(format!("{num_layers}_layer.safetensors"))
}

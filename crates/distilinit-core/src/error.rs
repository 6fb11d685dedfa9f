use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported model architecture: {0} (only \"bert\" is supported)")]
    UnsupportedArchitecture(String),

    #[error("Unsupported layer count: {0}. Num of layer only 1, 3, 6")]
    UnsupportedLayerCount(usize),

    #[error("Tensor '{0}' not found in source checkpoint")]
    MissingTensor(String),

    #[error("No supported checkpoint weights found in {}", .0.display())]
    NoWeights(PathBuf),
}

pub type CoreResult<T> = Result<T, CoreError>;

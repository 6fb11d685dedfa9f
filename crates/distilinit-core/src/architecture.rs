//! Source model families the extractor understands.
//!
//! Only the BERT masked-LM layout is supported. The type still exists as an
//! enum so the parameter prefix and the `config.json` check have one home.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Architecture of the teacher checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// `BertForMaskedLM` (`bert.*` encoder + `cls.predictions.*` head).
    Bert,
}

impl ModelType {
    /// Parse a user-supplied `--model_type` value.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s {
            "bert" => Ok(Self::Bert),
            other => Err(CoreError::UnsupportedArchitecture(other.to_string())),
        }
    }

    /// Tag used both on the command line and in HF `config.json`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bert => "bert",
        }
    }

    /// Prefix of the base encoder's parameters inside the masked-LM state dict.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Bert => "bert",
        }
    }

    /// Reject a model directory whose `config.json` declares another family.
    ///
    /// A missing `config.json`, or one without a `model_type` field, passes:
    /// older BERT checkpoints predate that field.
    pub fn verify_config(&self, model_dir: &Path) -> CoreResult<()> {
        let path = model_dir.join("config.json");
        if !path.is_file() {
            debug!(path = %path.display(), "No config.json, skipping architecture check");
            return Ok(());
        }

        let json = std::fs::read_to_string(&path)?;
        let cfg: HfConfigTag = serde_json::from_str(&json)?;

        match cfg.model_type.as_deref() {
            Some(tag) if tag != self.label() => {
                Err(CoreError::UnsupportedArchitecture(tag.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// The only field of HF `config.json` the extractor reads.
#[derive(Deserialize)]
struct HfConfigTag {
    model_type: Option<String>,
}

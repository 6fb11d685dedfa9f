//! Select teacher layers and rename them into a student checkpoint.
//!
//! [`distill`] is pure: it reads a [`StateDict`] and returns a new
//! [`StudentCheckpoint`] without touching the filesystem. Tensors are shared
//! with the source (candle tensors are reference counted), never copied.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::architecture::ModelType;
use crate::checkpoint::StudentCheckpoint;
use crate::error::CoreResult;
use crate::mapping::{self, Rename};
use crate::selection::LayerSelection;
use crate::state_dict::StateDict;

/// Build the student parameter mapping for `num_layers` student layers.
///
/// The layer count is validated before any tensor is looked up. A name that
/// the plan expects but `source` lacks fails with
/// [`CoreError::MissingTensor`](crate::CoreError::MissingTensor).
pub fn distill(
    source: &StateDict,
    model_type: ModelType,
    num_layers: usize,
    include_vocab_transform: bool,
) -> CoreResult<StudentCheckpoint> {
    let selection = LayerSelection::for_count(num_layers)?;
    info!(
        num_layers,
        teacher_layers = ?selection.teacher_layers(),
        vocab_transform = include_vocab_transform,
        "Selecting teacher layers"
    );

    let renames = mapping::plan(model_type, &selection, include_vocab_transform);
    let mut tensors = HashMap::with_capacity(renames.len());

    for Rename { source: name, destination } in renames {
        let tensor = source.require(&name)?;
        debug!(from = %name, to = %destination, shape = ?tensor.dims(), "Transfer");
        tensors.insert(destination, tensor.clone());
    }

    Ok(StudentCheckpoint::new(tensors, selection.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::fixtures::{synthetic_bert, values};

    #[test]
    fn entry_count_per_layer_count() {
        let teacher = synthetic_bert(12);
        for &n in LayerSelection::supported_counts() {
            let plain = distill(&teacher, ModelType::Bert, n, false).unwrap();
            assert_eq!(plain.len(), 4 + 16 * n + 2);
            assert_eq!(plain.num_layers(), n);

            let with_transform = distill(&teacher, ModelType::Bert, n, true).unwrap();
            assert_eq!(with_transform.len(), 4 + 16 * n + 2 + 4);
        }
    }

    #[test]
    fn student_layer_indices_are_contiguous() {
        let teacher = synthetic_bert(12);
        for &n in LayerSelection::supported_counts() {
            let student = distill(&teacher, ModelType::Bert, n, false).unwrap();
            let mut indices: Vec<usize> = student
                .names()
                .iter()
                .filter_map(|name| name.strip_prefix("distilbert.transformer.layer."))
                .filter_map(|rest| rest.split('.').next())
                .map(|idx| idx.parse().unwrap())
                .collect();
            indices.sort_unstable();
            indices.dedup();
            assert_eq!(indices, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn three_layer_scenario() {
        let teacher = synthetic_bert(12);
        let student = distill(&teacher, ModelType::Bert, 3, false).unwrap();
        assert_eq!(student.len(), 54);

        for (student_idx, teacher_idx) in [(0, 0), (1, 4), (2, 8)] {
            let got = student
                .get(&format!("distilbert.transformer.layer.{student_idx}.ffn.lin1.weight"))
                .unwrap();
            let want = teacher
                .require(&format!("bert.encoder.layer.{teacher_idx}.intermediate.dense.weight"))
                .unwrap();
            assert_eq!(values(got), values(want));
        }
        assert!(student.get("distilbert.transformer.layer.3.ffn.lin1.weight").is_none());
    }

    #[test]
    fn copied_tensors_are_identical() {
        let teacher = synthetic_bert(12);
        let student = distill(&teacher, ModelType::Bert, 6, true).unwrap();
        let selection = LayerSelection::for_count(6).unwrap();

        for rename in mapping::plan(ModelType::Bert, &selection, true) {
            let src = teacher.require(&rename.source).unwrap();
            let dst = student.get(&rename.destination).unwrap();
            assert_eq!(src.dims(), dst.dims(), "{}", rename.destination);
            assert_eq!(values(src), values(dst), "{}", rename.destination);
        }
    }

    #[test]
    fn skipped_teacher_tensors_are_dropped() {
        let teacher = synthetic_bert(12);
        let student = distill(&teacher, ModelType::Bert, 1, false).unwrap();
        assert!(student.names().iter().all(|n| !n.contains("token_type")));
        assert!(student.names().iter().all(|n| !n.starts_with("bert.")));
        assert!(student.names().iter().all(|n| !n.starts_with("cls.")));
    }

    #[test]
    fn unsupported_count_fails_before_lookup() {
        // An empty source proves no tensor was requested.
        let empty = StateDict::default();
        for n in [0, 2, 4, 12] {
            let err = distill(&empty, ModelType::Bert, n, false).unwrap_err();
            assert!(matches!(err, CoreError::UnsupportedLayerCount(got) if got == n));
        }
    }

    #[test]
    fn shallow_teacher_reports_missing_layer() {
        // Six student layers need teacher layer 11.
        let teacher = synthetic_bert(8);
        let err = distill(&teacher, ModelType::Bert, 6, false).unwrap_err();
        assert!(
            matches!(err, CoreError::MissingTensor(ref n) if n.starts_with("bert.encoder.layer.9.")),
            "unexpected error: {err}"
        );
    }
}

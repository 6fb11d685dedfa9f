//! Teacher layer selection for each supported student depth.
//!
//! | Student layers | Teacher layers copied |
//! |----------------|-----------------------|
//! | 1              | 5                     |
//! | 3              | 0, 4, 8               |
//! | 6              | 0, 2, 4, 7, 9, 11     |
//!
//! These indices are the distillation recipe itself. Changing them changes
//! the student that downstream training starts from.

use crate::error::{CoreError, CoreResult};

const ONE_LAYER: &[usize] = &[5];
const THREE_LAYERS: &[usize] = &[0, 4, 8];
const SIX_LAYERS: &[usize] = &[0, 2, 4, 7, 9, 11];

/// Ordered teacher layer indices for one student depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSelection {
    teacher_layers: &'static [usize],
}

impl LayerSelection {
    /// Resolve the policy for `num_layers` student layers.
    pub fn for_count(num_layers: usize) -> CoreResult<Self> {
        let teacher_layers = match num_layers {
            6 => SIX_LAYERS,
            3 => THREE_LAYERS,
            1 => ONE_LAYER,
            other => return Err(CoreError::UnsupportedLayerCount(other)),
        };
        Ok(Self { teacher_layers })
    }

    /// Student depths accepted by [`LayerSelection::for_count`].
    pub fn supported_counts() -> &'static [usize] {
        &[1, 3, 6]
    }

    pub fn teacher_layers(&self) -> &'static [usize] {
        self.teacher_layers
    }

    pub fn len(&self) -> usize {
        self.teacher_layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teacher_layers.is_empty()
    }

    /// `(student_index, teacher_index)` pairs, student indices counting from 0.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.teacher_layers.iter().copied().enumerate()
    }
}

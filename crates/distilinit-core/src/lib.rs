//! # distilinit-core
//!
//! Weight surgery that turns a BERT masked-LM checkpoint into the initial
//! weights of a shallower DistilBERT student.
//!
//! ## Pipeline
//!
//! 1. [`StateDict`] loads the teacher (safetensors or PyTorch pickle) and
//!    normalises legacy names.
//! 2. [`distill`] picks teacher layers with [`LayerSelection`] and renames
//!    tensors using the tables in [`mapping`].
//! 3. [`StudentCheckpoint::save`] writes the result as safetensors.
//!
//! ## Layer policy
//!
//! | Student layers | Teacher layers |
//! |---|---|
//! | 1 | 5 |
//! | 3 | 0, 4, 8 |
//! | 6 | 0, 2, 4, 7, 9, 11 |

pub mod architecture;
pub mod checkpoint;
pub mod distill;
pub mod error;
pub mod mapping;
pub mod selection;
pub mod state_dict;

#[cfg(test)]
mod fixtures;

pub use architecture::ModelType;
pub use checkpoint::{default_checkpoint_path, StudentCheckpoint};
pub use distill::distill;
pub use error::{CoreError, CoreResult};
pub use selection::LayerSelection;
pub use state_dict::{StateDict, WeightFormat};

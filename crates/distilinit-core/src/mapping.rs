//! Teacher → student parameter renaming rules.
//!
//! The rules are plain `(source, destination)` template tables. Placeholders:
//!
//! | Placeholder | Expands to |
//! |-------------|------------|
//! | `{prefix}`  | encoder prefix of the teacher, e.g. `bert` |
//! | `{teacher}` | teacher layer index |
//! | `{student}` | student layer index (0-based, contiguous) |
//!
//! Tables whose names end in `_BLOCKS` name a sub-module; every entry is
//! expanded once per [`SUFFIXES`] entry, suffix-major, so a layer yields all
//! `.weight` tensors before all `.bias` tensors.
//!
//! The destination names are the parameter names of a DistilBERT masked-LM
//! student and must not drift.

use crate::architecture::ModelType;
use crate::selection::LayerSelection;

/// Parameter suffixes of every `nn.Linear` / `nn.LayerNorm` sub-module.
pub const SUFFIXES: [&str; 2] = ["weight", "bias"];

/// Tied masked-LM decoder weight in the teacher.
pub const DECODER_WEIGHT: &str = "cls.predictions.decoder.weight";

/// Word embedding matrix in the teacher (before prefix expansion).
pub const WORD_EMBEDDINGS: &str = "{prefix}.embeddings.word_embeddings.weight";

const EMBEDDINGS: &[(&str, &str)] = &[
    (WORD_EMBEDDINGS, "distilbert.embeddings.word_embeddings.weight"),
    (
        "{prefix}.embeddings.position_embeddings.weight",
        "distilbert.embeddings.position_embeddings.weight",
    ),
];

const EMBEDDING_NORM_BLOCKS: &[(&str, &str)] =
    &[("{prefix}.embeddings.LayerNorm", "distilbert.embeddings.LayerNorm")];

const LAYER_BLOCKS: &[(&str, &str)] = &[
    (
        "{prefix}.encoder.layer.{teacher}.attention.self.query",
        "distilbert.transformer.layer.{student}.attention.q_lin",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.attention.self.key",
        "distilbert.transformer.layer.{student}.attention.k_lin",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.attention.self.value",
        "distilbert.transformer.layer.{student}.attention.v_lin",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.attention.output.dense",
        "distilbert.transformer.layer.{student}.attention.out_lin",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.attention.output.LayerNorm",
        "distilbert.transformer.layer.{student}.sa_layer_norm",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.intermediate.dense",
        "distilbert.transformer.layer.{student}.ffn.lin1",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.output.dense",
        "distilbert.transformer.layer.{student}.ffn.lin2",
    ),
    (
        "{prefix}.encoder.layer.{teacher}.output.LayerNorm",
        "distilbert.transformer.layer.{student}.output_layer_norm",
    ),
];

const VOCAB_PROJECTOR: &[(&str, &str)] = &[
    (DECODER_WEIGHT, "vocab_projector.weight"),
    ("cls.predictions.bias", "vocab_projector.bias"),
];

const VOCAB_TRANSFORM_BLOCKS: &[(&str, &str)] = &[
    ("cls.predictions.transform.dense", "vocab_transform"),
    ("cls.predictions.transform.LayerNorm", "vocab_layer_norm"),
];

/// One tensor to copy: teacher name → student name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub source: String,
    pub destination: String,
}

/// Placeholder values for one template expansion.
#[derive(Debug, Clone, Copy)]
struct Vars<'a> {
    prefix: &'a str,
    teacher: usize,
    student: usize,
}

impl Vars<'_> {
    fn render(&self, template: &str) -> String {
        template
            .replace("{prefix}", self.prefix)
            .replace("{teacher}", &self.teacher.to_string())
            .replace("{student}", &self.student.to_string())
    }
}

fn expand_plain(table: &[(&str, &str)], vars: Vars<'_>, out: &mut Vec<Rename>) {
    for (src, dst) in table {
        out.push(Rename {
            source: vars.render(src),
            destination: vars.render(dst),
        });
    }
}

fn expand_blocks(table: &[(&str, &str)], vars: Vars<'_>, out: &mut Vec<Rename>) {
    for suffix in SUFFIXES {
        for (src, dst) in table {
            out.push(Rename {
                source: format!("{}.{suffix}", vars.render(src)),
                destination: format!("{}.{suffix}", vars.render(dst)),
            });
        }
    }
}

/// Renames for a single teacher layer copied into student slot `student`.
pub fn layer_renames(model_type: ModelType, teacher: usize, student: usize) -> Vec<Rename> {
    let mut out = Vec::with_capacity(LAYER_BLOCKS.len() * SUFFIXES.len());
    let vars = Vars { prefix: model_type.prefix(), teacher, student };
    expand_blocks(LAYER_BLOCKS, vars, &mut out);
    out
}

/// Every rename needed to build the student checkpoint, in copy order.
pub fn plan(
    model_type: ModelType,
    selection: &LayerSelection,
    include_vocab_transform: bool,
) -> Vec<Rename> {
    let vars = Vars { prefix: model_type.prefix(), teacher: 0, student: 0 };
    let mut out = Vec::with_capacity(expected_len(selection.len(), include_vocab_transform));

    expand_plain(EMBEDDINGS, vars, &mut out);
    expand_blocks(EMBEDDING_NORM_BLOCKS, vars, &mut out);

    for (student, teacher) in selection.pairs() {
        out.extend(layer_renames(model_type, teacher, student));
    }

    expand_plain(VOCAB_PROJECTOR, vars, &mut out);
    if include_vocab_transform {
        expand_blocks(VOCAB_TRANSFORM_BLOCKS, vars, &mut out);
    }
    out
}

/// Number of tensors a student with `num_layers` layers receives.
pub fn expected_len(num_layers: usize, include_vocab_transform: bool) -> usize {
    let per_layer = LAYER_BLOCKS.len() * SUFFIXES.len();
    let embeddings = EMBEDDINGS.len() + EMBEDDING_NORM_BLOCKS.len() * SUFFIXES.len();
    let transform = if include_vocab_transform {
        VOCAB_TRANSFORM_BLOCKS.len() * SUFFIXES.len()
    } else {
        0
    };
    embeddings + per_layer * num_layers + VOCAB_PROJECTOR.len() + transform
}

/// Expand a `{prefix}` template for `model_type`.
pub fn resolve(template: &str, model_type: ModelType) -> String {
    Vars { prefix: model_type.prefix(), teacher: 0, student: 0 }.render(template)
}

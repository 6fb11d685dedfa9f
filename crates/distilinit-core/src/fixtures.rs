//! Synthetic teacher checkpoints shared by the unit tests.

use candle_core::{Device, Tensor};

use crate::state_dict::StateDict;

/// One-element F32 tensor holding `value`.
pub(crate) fn scalar(value: f32) -> Tensor {
    Tensor::new(&[value], &Device::Cpu).unwrap()
}

pub(crate) fn values(t: &Tensor) -> Vec<f32> {
    t.flatten_all().unwrap().to_vec1::<f32>().unwrap()
}

/// Every parameter name of a `BertForMaskedLM` with `num_layers` layers.
pub(crate) fn bert_names(num_layers: usize) -> Vec<String> {
    let mut names = vec![
        "bert.embeddings.word_embeddings.weight".to_string(),
        "bert.embeddings.position_embeddings.weight".to_string(),
        "bert.embeddings.token_type_embeddings.weight".to_string(),
        "bert.embeddings.LayerNorm.weight".to_string(),
        "bert.embeddings.LayerNorm.bias".to_string(),
    ];
    let blocks = [
        "attention.self.query",
        "attention.self.key",
        "attention.self.value",
        "attention.output.dense",
        "attention.output.LayerNorm",
        "intermediate.dense",
        "output.dense",
        "output.LayerNorm",
    ];
    for layer in 0..num_layers {
        for block in blocks {
            for suffix in ["weight", "bias"] {
                names.push(format!("bert.encoder.layer.{layer}.{block}.{suffix}"));
            }
        }
    }
    for name in [
        "cls.predictions.bias",
        "cls.predictions.transform.dense.weight",
        "cls.predictions.transform.dense.bias",
        "cls.predictions.transform.LayerNorm.weight",
        "cls.predictions.transform.LayerNorm.bias",
        "cls.predictions.decoder.weight",
    ] {
        names.push(name.to_string());
    }
    names
}

/// A 2×3 tensor whose values are unique to position `i` in [`bert_names`].
pub(crate) fn distinct(i: usize) -> Tensor {
    let base = i as f32 * 10.0;
    let data: Vec<f32> = (0..6).map(|k| base + k as f32).collect();
    Tensor::from_vec(data, (2, 3), &Device::Cpu).unwrap()
}

/// A full teacher with distinct values in every tensor.
pub(crate) fn synthetic_bert(num_layers: usize) -> StateDict {
    StateDict::from_tensors(
        bert_names(num_layers)
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, distinct(i))),
    )
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod extract;

use config::load_config;
use extract::ExtractArgs;

/// Extract some layers of a full BertForMaskedLM to initialise a DistilBERT
/// student for transfer-learned distillation.
#[derive(Debug, Parser)]
#[command(name = "distilinit", version, about, long_about = None)]
struct Cli {
    /// Teacher architecture. Only "bert" is supported.
    #[arg(long = "model_type", default_value = "bert")]
    model_type: String,

    /// Teacher model: Hugging Face repo id, local model directory, or a
    /// single checkpoint file (.safetensors, .bin, .pt, .pth).
    #[arg(long = "model_name", default_value = "monologg/kobert-lm")]
    model_name: String,

    /// Also copy the masked-LM transform (dense + LayerNorm) into
    /// vocab_transform / vocab_layer_norm.
    #[arg(long = "vocab_transform")]
    vocab_transform: bool,

    /// Number of student layers: 1, 3, or 6.
    #[arg(long = "num_layer", default_value_t = 3)]
    num_layer: usize,

    /// Output file. Defaults to <serialization_dir>/<num_layer>_layer.safetensors.
    ///
    /// The checkpoint is always written as safetensors, never as a PyTorch
    /// `.pth` pickle; load it with `safetensors.torch.load_file`.
    #[arg(long = "dump_checkpoint", value_name = "FILE")]
    dump_checkpoint: Option<PathBuf>,

    /// Hub revision (branch, tag, or commit) when --model_name is a repo id.
    #[arg(long)]
    revision: Option<String>,

    /// Path to a custom configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log format: "pretty" (default) or "json".
    #[arg(long = "log_format", default_value = "pretty", value_name = "FORMAT")]
    log_format: String,
}

impl Cli {
    fn extract_args(&self) -> ExtractArgs {
        ExtractArgs {
            model_type: self.model_type.clone(),
            model_name: self.model_name.clone(),
            vocab_transform: self.vocab_transform,
            num_layer: self.num_layer,
            dump_checkpoint: self.dump_checkpoint.clone(),
            revision: self.revision.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_format);

    let cfg = load_config(cli.config.as_ref())
        .context("Failed to load configuration")?;

    extract::run(&cli.extract_args(), &cfg).await?;

    Ok(())
}

fn init_tracing(log_format: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Runtime configuration loaded from TOML + env vars.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory receiving `<num_layer>_layer.safetensors`.
    pub serialization_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HubConfig {
    pub cache_dir: String,
    pub revision: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig {
                serialization_dir: "serialization_dir".to_string(),
            },
            hub: HubConfig {
                cache_dir: "~/.cache/distilinit".to_string(),
                revision: "main".to_string(),
            },
        }
    }
}

/// Load configuration from, lowest priority first:
/// 1. Built-in defaults
/// 2. `config/default.toml` (if present)
/// 3. A custom config file path (if provided)
/// 4. Environment variables, e.g. `DISTILINIT_HUB__CACHE_DIR`
pub fn load_config(config_file: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();

    let mut builder = Config::builder()
        .set_default("output.serialization_dir", defaults.output.serialization_dir)?
        .set_default("hub.cache_dir", defaults.hub.cache_dir)?
        .set_default("hub.revision", defaults.hub.revision)?
        .add_source(File::with_name("config/default").required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    // Keys contain underscores, so sections are split on a double underscore.
    builder = builder.add_source(
        Environment::with_prefix("DISTILINIT")
            .prefix_separator("_")
            .separator("__"),
    );

    builder.build()?.try_deserialize()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

use anyhow::{Context, Result};
use rollcall_core::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
const CONFIG_FILE: &str = "rollcall.toml";

/// CLI configuration, from a TOML file with env-variable fallbacks.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing the three ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive match.
    pub threshold: f32,
    /// Pipeline strategy and geometric constants.
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        let model_dir = std::env::var("ROLLCALL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models"));
        Self {
            model_dir,
            threshold: 0.7,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration. An explicitly given path must exist; otherwise
    /// `rollcall.toml` is read when present and defaults apply when not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EditorConfig {
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub predict: PredictConfig,
}

impl EditorConfig {
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path();
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config file {}", config_path.display()))?;
            let parsed: EditorConfig = toml::from_str(&raw)
                .with_context(|| format!("failed to parse TOML from {}", config_path.display()))?;
            return Ok(parsed);
        }

        Ok(EditorConfig::default())
    }
}

fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var("QUILL_CONFIG") {
        return Path::new(&path).to_path_buf();
    }

    if let Some(base) = dirs::config_dir() {
        return base.join("quill").join("config.toml");
    }

    Path::new("/tmp/quill.toml").to_path_buf()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Directory holding the ngrams.*.txt files.
    #[serde(default = "default_resource_dir")]
    pub dir: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            dir: default_resource_dir(),
        }
    }
}

/// The ngram files ship next to the binary by default.
fn default_resource_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictConfig {
    /// Whether completion starts enabled; Ctrl-A / Ctrl-O toggle it.
    #[serde(default = "default_predict_enabled")]
    pub enable: bool,
    /// Rows of the candidate panel.
    #[serde(default = "default_panel_rows")]
    pub rows: usize,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            enable: default_predict_enabled(),
            rows: default_panel_rows(),
        }
    }
}

fn default_predict_enabled() -> bool {
    true
}

fn default_panel_rows() -> usize {
    8
}

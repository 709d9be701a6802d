//! CLI configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level quizforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    /// Award partial credit for SML and MTL questions.
    #[serde(default)]
    pub allow_partial_grading: bool,
    /// Where `validate` looks when no bank is given.
    #[serde(default = "default_banks_dir")]
    pub banks_dir: PathBuf,
    /// Where attempt reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_banks_dir() -> PathBuf {
    PathBuf::from("./banks")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizforge-results")
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            allow_partial_grading: false,
            banks_dir: default_banks_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// `QUIZFORGE_PARTIAL_GRADING` overrides `allow_partial_grading`.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config(&path)?
        }
        None => QuizforgeConfig::default(),
    };

    if let Ok(value) = std::env::var("QUIZFORGE_PARTIAL_GRADING") {
        match parse_flag(&value) {
            Some(flag) => config.allow_partial_grading = flag,
            None => tracing::warn!("ignoring QUIZFORGE_PARTIAL_GRADING={value}: not a boolean"),
        }
    }

    Ok(config)
}

fn parse_config(path: &Path) -> Result<QuizforgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config: {}", path.display()))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

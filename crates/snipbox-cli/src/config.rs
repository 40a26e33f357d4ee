//! Configuration: locate, parse and check `config.toml`

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use snipbox_core::SecurityPolicy;
use std::path::{Path, PathBuf};

/// Top-level layout of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executor: SecurityPolicy,
}

// ── Location ────────────────────────────────────────────────────

/// `~/.config/snipbox` on Linux, the platform equivalent elsewhere
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snipbox")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// ── Loading ─────────────────────────────────────────────────────

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config.toml")?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config at {}", path.display()))
    }

    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let path = default_config_path();
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn check(&self) -> Result<()> {
        let executor = &self.executor;
        if executor.max_execution_time == 0 {
            bail!("executor.max_execution_time must be at least 1 second");
        }
        if executor.max_output_length == 0 {
            bail!("executor.max_output_length must be greater than 0");
        }
        if executor.interpreter.trim().is_empty() {
            bail!("executor.interpreter must not be empty");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render config as TOML")
    }
}

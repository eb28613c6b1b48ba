//! Optional TOML config for the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_DATA_FILE: &str = "data.json";

/// CLI configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Vault root used to resolve relative video paths.
    pub vault_root: Option<String>,
    /// Path to the settings data file.
    pub data_file: Option<PathBuf>,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        toml::from_str(&raw).with_context(|| format!("parse config {:?}", path))
    }

    /// Flag value, then config value, then the current directory.
    pub fn vault_root(&self, flag: Option<&str>) -> Result<String> {
        if let Some(root) = flag.or(self.vault_root.as_deref()) {
            return Ok(root.to_string());
        }
        let cwd = std::env::current_dir().context("resolve current dir")?;
        Ok(cwd.to_string_lossy().into_owned())
    }

    /// Flag value, then config value, then `data.json`.
    pub fn data_file(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.data_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
    }
}

// Configuration loaded from the rc file (~/.leadboard/rc)
//
// The rc file is a plain `key=value` list. Recognised keys:
//   data.location=<path>      database path (relative to the rc directory)
//   board.refetch=yes|no      refetch canonical state after a successful mutation
//   access.read_only=yes|no   reject every mutation with the permission message

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Behaviour switches for the board engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    pub refetch_after_mutation: bool,
    pub read_only: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            refetch_after_mutation: true,
            read_only: false,
        }
    }
}

/// Parsed rc file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcConfig {
    pub data_location: Option<PathBuf>,
    pub board: BoardConfig,
}

impl RcConfig {
    /// Directory holding the rc file and the default database
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to determine home directory")?;
        Ok(home.join(".leadboard"))
    }

    /// Get the configuration file path
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("rc"))
    }

    /// Load the rc file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content, path.parent())
    }

    /// Parse rc content. Relative `data.location` paths are resolved against `base_dir`.
    pub fn parse(content: &str, base_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("Ignoring malformed config line {}: {}", line_no + 1, line);
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = Some(match base_dir {
                        Some(dir) if path.is_relative() => dir.join(path),
                        _ => path,
                    });
                }
                "board.refetch" => {
                    config.board.refetch_after_mutation = parse_bool(key, value)?;
                }
                "access.read_only" => {
                    config.board.read_only = parse_bool(key, value)?;
                }
                _ => log::debug!("Ignoring unknown config key '{}'", key),
            }
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Invalid value for {}: '{}'. Expected yes or no.", key, value),
    }
}

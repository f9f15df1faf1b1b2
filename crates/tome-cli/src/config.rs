// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI preferences under the platform config directory (e.g. `~/.config/tome`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// File name of the preferences document inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Storage root used when `--root` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl CliConfig {
    /// Load preferences from `path`. A missing or empty file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) if bytes.is_empty() => Ok(Self::default()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("malformed config {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("reading config {}", path.display())),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "flyingrobots", "Tome")
}

/// Storage root: `--root`, then `config.json`, then the platform data dir.
///
/// The config file is only consulted when no flag is given.
pub fn resolve_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = flag {
        return Ok(root);
    }
    let dirs = project_dirs().context("could not resolve platform directories; pass --root")?;
    let config = CliConfig::load_from(&dirs.config_dir().join(CONFIG_FILE))?;
    Ok(pick_root(None, config, dirs.data_dir()))
}

fn pick_root(flag: Option<PathBuf>, config: CliConfig, data_dir: &Path) -> PathBuf {
    flag.or(config.root).unwrap_or_else(|| data_dir.to_path_buf())
}

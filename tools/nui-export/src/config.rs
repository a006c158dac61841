//! Exporter configuration (`nui-export.toml`)
//!
//! ```toml
//! texture_prefix = "../../resources/textures/"
//! output_extension = "nui"
//!
//! [paths]
//! source = "models/uncompiled"
//! output = "models/nui"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "nui-export.toml";

/// Directory prefix the runtime loads textures from
pub const DEFAULT_TEXTURE_PREFIX: &str = "../../resources/textures/";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    #[serde(default = "default_texture_prefix")]
    pub texture_prefix: String,
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

fn default_texture_prefix() -> String {
    DEFAULT_TEXTURE_PREFIX.to_string()
}

fn default_output_extension() -> String {
    nui_common::NUI_EXT.to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            texture_prefix: default_texture_prefix(),
            output_extension: default_output_extension(),
            paths: PathsConfig::default(),
        }
    }
}

impl ExportConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse exporter config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config: {:?}", path))
    }

    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};

/// A supported file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Picks the format from the file extension (`yaml`, `yml`, or `json`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Name used to select per-format flag keys.
    pub fn name(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }

    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T> {
        match self {
            Format::Yaml => Ok(serde_yaml::from_str(text)?),
            Format::Json => Ok(serde_json::from_str(text)?),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! # Config Module
//!
//! Per-environment settings, usually read from a JSON file by the host.
//!
//! ```json
//! { "default_easing": "ease_in_out", "palette": { "accent": "#FF8800" } }
//! ```

use crate::animation::EasingType;
use crate::palette::Palette;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::instrument;

/// Settings applied when an [`Environment`](crate::Environment) is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Easing used by `fade` when the script does not name one.
    pub default_easing: EasingType,
    /// Extra color names, as hex literals, for controllers built from this config.
    pub palette: HashMap<String, String>,
}

impl EnvironmentConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid environment configuration")
    }

    /// Reads a configuration file.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_json(&text)
    }

    /// The default palette extended with this configuration's entries.
    pub fn palette(&self) -> Palette {
        let mut palette = Palette::new();
        palette.extend_from_literals(&self.palette);
        palette
    }
}

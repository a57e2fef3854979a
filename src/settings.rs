use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::cleaning::CleaningConfig;

/// Loads a cleaning configuration from a JSON file.
///
/// Fields absent from the file keep their default values. A missing file
/// is an error.
pub fn load_config(path: &Path) -> Result<CleaningConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config in {}", path.display()))
}

pub fn save_config(path: &Path, config: &CleaningConfig) -> Result<()> {
    let serialized = serde_json::to_string_pretty(config)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}

use anyhow::anyhow;
use serde::Deserialize;
use std::{fs::read_to_string, path::Path};

use crate::form::FormConfig;
use crate::inventory::trees::InventoryConfig;

/// Both pipelines' settings. Every section and field falls back to the
/// reference setup when left out.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub inventory: InventoryConfig,
    pub form: FormConfig,
}

impl Config {
    pub fn from_file(filepath: &Path) -> anyhow::Result<Self> {
        if !filepath.exists() {
            return Err(anyhow!("Config file {:?} not found", filepath));
        }
        let config_contents = read_to_string(filepath)?;
        Ok(serde_yaml::from_str(&config_contents)?)
    }
}

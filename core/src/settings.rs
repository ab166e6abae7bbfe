//! Store settings: which column the config lives in and how keys are
//! written. Loaded from YAML; every field has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};


/// Column the config tree is persisted in, unless configured otherwise.
pub const DEFAULT_ATTRIBUTE: &str = "_config";


/// How keys are spelled in the persisted encoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStyle {
    /// `:color`, the spelling existing columns use.
    #[default]
    Symbol,
    /// `color`
    String,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSettings {
    /// Name of the record attribute holding the encoded tree.
    pub attribute: String,
    pub key_style: KeyStyle,
}

impl Default for StoreSettings {
    fn default() -> Self {
        default_settings()
    }
}


pub fn default_settings() -> StoreSettings {
    StoreSettings {
        attribute: DEFAULT_ATTRIBUTE.into(),
        key_style: KeyStyle::Symbol,
    }
}


/// Load settings from a YAML file.
pub fn load(path: &Path) -> Result<StoreSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StoreError::Settings(format!("cannot read '{}': {}", path.display(), e))
    })?;
    parse(&content)
}


/// Parse settings from a YAML string. Blank input yields the defaults.
pub fn parse(content: &str) -> Result<StoreSettings> {
    if content.trim().is_empty() {
        return Ok(default_settings());
    }
    let settings: StoreSettings = serde_yaml::from_str(content)
        .map_err(|e| StoreError::Settings(format!("invalid store settings: {}", e)))?;
    if settings.attribute.trim().is_empty() {
        return Err(StoreError::Settings("attribute must not be empty".into()));
    }
    Ok(settings)
}

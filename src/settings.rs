use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::categorizer::PostFill;
use crate::error::{FaturaError, Result};
use crate::installments::InstallmentDating;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rules_path: String,
    pub drop_negative_amounts: bool,
    pub post_fill: PostFill,
    pub installment_dating: InstallmentDating,
    pub projection_months: u32,
}

pub const DEFAULT_RULES_FILE: &str = "regras_categorizacao.xlsx";
pub const DEFAULT_PROJECTION_MONTHS: u32 = 36;

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_path: DEFAULT_RULES_FILE.to_string(),
            drop_negative_amounts: false,
            post_fill: PostFill::default(),
            installment_dating: InstallmentDating::default(),
            projection_months: DEFAULT_PROJECTION_MONTHS,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fatura")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Settings from disk, or defaults when the file is missing or unreadable.
pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<PathBuf> {
    std::fs::create_dir_all(config_dir())?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FaturaError::Settings(e.to_string()))?;
    let path = settings_path();
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
}

pub fn shellexpand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

// Configuration helpers for the response formatter
//
// Settings live in ~/.historymind/formatter.json. The library never reads
// them implicitly; the CLI loads them and hands them to ResponseFormatter.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scaffold markers left behind by the backend's answer templates.
pub const DEFAULT_BANNED_PREFIXES: [&str; 6] = [
    "B1.",
    "B2.",
    "B3.",
    "Câu hỏi nhắm tới",
    "Bối cảnh.",
    "Cốt lõi.",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterSettings {
    #[serde(default = "default_banned_prefixes")]
    pub banned_prefixes: Vec<String>,
    #[serde(default = "default_key_length")]
    pub key_length: usize, // Characters of normalized content in a similarity key
    #[serde(default)]
    pub min_key_length: usize, // 0 = keep records whose normalized content is empty
    #[serde(default = "default_unicode_nfc")]
    pub unicode_nfc: bool,
}

fn default_banned_prefixes() -> Vec<String> {
    DEFAULT_BANNED_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_key_length() -> usize {
    30
}

fn default_unicode_nfc() -> bool {
    true
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            banned_prefixes: default_banned_prefixes(),
            key_length: default_key_length(),
            min_key_length: 0,
            unicode_nfc: default_unicode_nfc(),
        }
    }
}

impl FormatterSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.key_length == 0 {
            return Err("key_length must be at least 1".to_string());
        }
        if self.banned_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err("banned_prefixes cannot contain blank entries".to_string());
        }
        Ok(())
    }
}

pub fn get_config_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".historymind"))
}

pub fn ensure_config_dir() -> Result<PathBuf, String> {
    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;
    Ok(config_dir)
}

pub fn get_settings_path() -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join("formatter.json"))
}

// ============================================================================
// Formatter Settings
// ============================================================================

pub fn read_settings() -> Result<FormatterSettings, String> {
    read_settings_at(&get_settings_path()?)
}

pub fn write_settings(settings: &FormatterSettings) -> Result<(), String> {
    ensure_config_dir()?;
    write_settings_at(&get_settings_path()?, settings)
}

pub fn read_settings_at(path: &Path) -> Result<FormatterSettings, String> {
    if !path.exists() {
        return Ok(FormatterSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings: {}", e))?;
    let settings: FormatterSettings = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse settings: {}", e))?;
    settings.validate()?;
    Ok(settings)
}

pub fn write_settings_at(path: &Path, settings: &FormatterSettings) -> Result<(), String> {
    settings.validate()?;
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}

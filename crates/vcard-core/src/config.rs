//! Configuration management for vcard
//!
//! This module provides configuration structures for repository-level vcard settings:
//! read-protocol limits, summary previews, diff caps, export defaults and lint hints.
//! Every default equals the constant the engine uses when no config is loaded.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{DraftError, Result};

/// Repository-level vcard configuration
///
/// Loaded from `.vcard/config.toml` in the repo root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VcardConfig {
    /// Read protocol limits
    #[serde(default)]
    pub read: ReadConfig,

    /// File-system summary settings
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Artifact diff settings
    #[serde(default)]
    pub diff: DiffConfig,

    /// Export defaults
    #[serde(default)]
    pub export: ExportConfig,

    /// Lint settings
    #[serde(default)]
    pub lint: LintConfig,
}

/// Limits applied to batched read requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadConfig {
    /// Maximum number of reads honoured per request
    #[serde(default = "default_max_reads")]
    pub max_reads: usize,

    /// Slice length when a read omits `limit`
    #[serde(default = "default_read_limit")]
    pub default_limit: usize,

    /// Upper clamp for `limit`
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

/// Content-free summary settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Characters kept in each preview
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

/// Artifact diff settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Maximum changed paths reported
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

/// Export defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// `work` keeps the embedded plan, `publish` strips it
    #[serde(default = "default_export_mode")]
    pub mode: String,
}

/// Lint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    /// Card fields that produce a warning when empty
    #[serde(default = "default_recommended_fields")]
    pub recommended_fields: Vec<String>,
}

// Default value providers
fn default_max_reads() -> usize {
    8
}

fn default_read_limit() -> usize {
    1200
}

fn default_max_limit() -> usize {
    6000
}

fn default_preview_chars() -> usize {
    80
}

fn default_max_paths() -> usize {
    200
}

fn default_export_mode() -> String {
    "work".to_string()
}

fn default_recommended_fields() -> Vec<String> {
    vec![
        "personality".to_string(),
        "scenario".to_string(),
        "mes_example".to_string(),
        "creator_notes".to_string(),
    ]
}

impl VcardConfig {
    /// Load configuration from `.vcard/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(".vcard/config.toml");

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DraftError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write default configuration to `.vcard/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<()> {
        let config_dir = repo_root.join(".vcard");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| DraftError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            max_reads: default_max_reads(),
            default_limit: default_read_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_paths: default_max_paths(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: default_export_mode(),
        }
    }
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            recommended_fields: default_recommended_fields(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let config = VcardConfig::default();
        assert_eq!(config.read.max_reads, 8);
        assert_eq!(config.read.default_limit, 1200);
        assert_eq!(config.read.max_limit, 6000);
        assert_eq!(config.diff.max_paths, 200);
        assert_eq!(config.export.mode, "work");
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = VcardConfig::load_or_default(temp_dir.path()).unwrap();
        assert_eq!(config, VcardConfig::default());
    }

    #[test]
    fn test_write_then_load_default() {
        let temp_dir = TempDir::new().unwrap();
        VcardConfig::write_default(temp_dir.path()).unwrap();
        assert!(temp_dir.path().join(".vcard/config.toml").exists());

        let config = VcardConfig::load_or_default(temp_dir.path()).unwrap();
        assert_eq!(config, VcardConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".vcard");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[read]\ndefault_limit = 500\n").unwrap();

        let config = VcardConfig::load_or_default(temp_dir.path()).unwrap();
        assert_eq!(config.read.default_limit, 500);
        assert_eq!(config.read.max_limit, 6000);
        assert_eq!(config.summary.preview_chars, 80);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "read = 3").unwrap();
        assert!(matches!(
            VcardConfig::from_file(&path),
            Err(DraftError::Config(_))
        ));
    }
}

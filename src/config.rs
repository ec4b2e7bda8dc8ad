//! Project configuration stored in `.minuta/config.yaml`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::render::{FontFamily, PageSize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Settings for the PDF rendering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub page_size: PageSize,
    /// Raster pixels per CSS pixel. Sets the grid that page bands are cut
    /// on; text and rules stay vector, so it does not change their size.
    pub scale: u32,
    pub font_family: FontFamily,
    /// Rendering surfaces that may be alive at once
    pub max_live_surfaces: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            scale: 2,
            font_family: FontFamily::Serif,
            max_live_surfaces: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Blob directory, relative to `.minuta/`
    pub blob_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_dir: "blobs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render.page_size, PageSize::A4);
        assert_eq!(config.render.scale, 2);
        assert_eq!(config.storage.blob_dir, "blobs");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("render:\n  scale: 3\n").unwrap();
        assert_eq!(config.render.scale, 3);
        assert_eq!(config.render.page_size, PageSize::A4);
        assert_eq!(config.render.max_live_surfaces, 4);
        assert_eq!(config.storage.blob_dir, "blobs");
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        let mut config = Config::default();
        config.render.font_family = FontFamily::Sans;
        config.logging.level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.render.font_family, FontFamily::Sans);
        assert_eq!(loaded.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(&tmp.path().join("absent.yaml")).unwrap();
        assert_eq!(config.render.scale, 2);
    }
}

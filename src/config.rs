//! Configuration for the import pipeline.
//!
//! Loaded from config.json at startup. Every field has a default, so a partial
//! file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::ocr::{
    CropSettings, EngineMode, PreprocessMode, RecognizeOptions, DEFAULT_TARGET_WIDTH,
    DEFAULT_WHITELIST,
};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Tesseract settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code, e.g. "eng"
    pub language: String,
    pub engine_mode: EngineMode,
    /// Tesseract page segmentation mode (`--psm`)
    pub page_segmentation: u8,
    /// Characters Tesseract may emit; empty disables the whitelist
    pub whitelist: String,
    /// Maximum time for one recognition (milliseconds)
    pub timeout_ms: u64,
    /// Explicit path to the tesseract executable
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            engine_mode: EngineMode::Default,
            page_segmentation: 6,
            whitelist: DEFAULT_WHITELIST.to_string(),
            timeout_ms: 120_000,
            tesseract_path: None,
            tessdata_dir: None,
        }
    }
}

impl OcrConfig {
    pub fn to_recognize_options(&self) -> RecognizeOptions {
        RecognizeOptions {
            language: self.language.clone(),
            whitelist: self.whitelist.clone(),
            engine_mode: self.engine_mode,
            page_segmentation: self.page_segmentation,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Complete import configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Width the source image is scaled to before cropping
    pub target_width: u32,
    pub mode: PreprocessMode,
    pub crop: CropSettings,
    pub ocr: OcrConfig,
    /// Match store directory; the per-user data dir when unset
    pub store_dir: Option<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            mode: PreprocessMode::Auto,
            crop: CropSettings::default(),
            ocr: OcrConfig::default(),
            store_dir: None,
        }
    }
}

impl ImportConfig {
    /// Loads configuration, falling back to defaults on any problem.
    ///
    /// Looks at `explicit` first, then config.json in the working directory,
    /// then next to the executable.
    pub fn load(explicit: Option<&Path>) -> Self {
        let Some(path) = find_config_path(explicit) else {
            info!("{} not found. Using default config.", CONFIG_FILE_NAME);
            return Self::default();
        };

        info!("Loading config from {}", path.display());
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Reads and parses one config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Err(e) = config.crop.validate() {
            warn!("Ignoring invalid crop in {}: {}", path.display(), e);
            return Ok(Self {
                crop: CropSettings::default(),
                ..config
            });
        }
        Ok(config)
    }

    /// Writes the default configuration to `path`.
    pub fn save_default(path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Store directory from config, or the default under the data dir.
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(crate::paths::get_store_dir)
    }
}

fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("Config file {} does not exist", path.display());
    }

    [
        PathBuf::from(CONFIG_FILE_NAME),
        crate::paths::get_exe_dir().join(CONFIG_FILE_NAME),
    ]
    .into_iter()
    .find(|p| p.exists())
}

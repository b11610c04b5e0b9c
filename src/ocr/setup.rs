use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::ocr::engine::TesseractCli;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

const COMMON_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

/// Builds a Tesseract engine from config, locating the executable and tessdata.
pub fn tesseract_from_config(config: &OcrConfig) -> Result<TesseractCli> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
    let tessdata = find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language);
    match &tessdata {
        Some(dir) => info!("Using tessdata at {}", dir.display()),
        None => info!("No tessdata directory found, relying on Tesseract defaults"),
    }
    Ok(TesseractCli::new(executable, tessdata))
}

/// Finds the Tesseract executable: configured path, then PATH, then common locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!(
            "Configured tesseract_path {} does not exist, searching elsewhere",
            path.display()
        );
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    COMMON_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory containing `<language>.traineddata`.
///
/// Search order: configured dir, the local data dir, `TESSDATA_PREFIX`, then
/// common system locations.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Option<PathBuf> {
    let file_name = traineddata_name(language);
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = configured {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(crate::paths::get_tessdata_dir());
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    candidates.extend(COMMON_TESSDATA.iter().map(PathBuf::from));

    candidates
        .into_iter()
        .find(|dir| dir.join(&file_name).exists())
}

/// Ensures `<language>.traineddata` is available, downloading it into the
/// local tessdata directory if no installed copy is found.
pub fn ensure_language_data(config: &OcrConfig) -> Result<PathBuf> {
    if let Some(dir) = find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language) {
        info!("{} found in {}", traineddata_name(&config.language), dir.display());
        return Ok(dir);
    }

    let target_dir = config
        .tessdata_dir
        .clone()
        .unwrap_or_else(crate::paths::get_tessdata_dir);
    download_tessdata(&target_dir, &config.language)?;
    Ok(target_dir)
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Downloads trained data for `language` from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file_name = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    let path = tessdata_dir.join(&file_name);

    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;

    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "standings-import")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    // Write next to the destination first so a partial download never looks installed
    let mut temp = tempfile::NamedTempFile::new_in(tessdata_dir)?;
    temp.write_all(&bytes)?;
    temp.persist(&path)
        .with_context(|| format!("Failed to save {}", path.display()))?;

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());

    Ok(())
}

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::OcrError;

/// Characters Tesseract may emit for standings tables.
pub const DEFAULT_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-:.,#()'&_ ";

/// Tesseract `--oem` engine selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineMode {
    Legacy,
    Lstm,
    Combined,
    #[default]
    Default,
}

impl EngineMode {
    pub fn oem(self) -> u8 {
        match self {
            EngineMode::Legacy => 0,
            EngineMode::Lstm => 1,
            EngineMode::Combined => 2,
            EngineMode::Default => 3,
        }
    }
}

/// Parameters passed along with each recognition request.
#[derive(Clone, Debug)]
pub struct RecognizeOptions {
    pub language: String,
    pub whitelist: String,
    pub engine_mode: EngineMode,
    /// Tesseract `--psm`; 6 assumes a single uniform block of text
    pub page_segmentation: u8,
    pub timeout: Duration,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            whitelist: DEFAULT_WHITELIST.to_string(),
            engine_mode: EngineMode::Default,
            page_segmentation: 6,
            timeout: Duration::from_secs(120),
        }
    }
}

/// A text recognizer for binarized standings images.
///
/// `progress` receives values in 0..=100 while the call runs. Implementations
/// may take arbitrarily long; the caller guarantees one call per image at a time.
pub trait OcrEngine: Send + Sync {
    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognizeOptions,
        progress: &mut dyn FnMut(u8),
    ) -> Result<String, OcrError>;
}

/// Runs the `tesseract` executable on a temporary PNG.
#[derive(Clone, Debug)]
pub struct TesseractCli {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl TesseractCli {
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>) -> Self {
        Self {
            executable,
            tessdata,
        }
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }

    fn build_command(&self, input: &std::path::Path, output_base: &str, options: &RecognizeOptions) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg(output_base);
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        cmd.arg("-l")
            .arg(&options.language)
            .arg("--oem")
            .arg(options.engine_mode.oem().to_string())
            .arg("--psm")
            .arg(options.page_segmentation.to_string())
            .arg("-c")
            .arg("preserve_interword_spaces=1");
        if !options.whitelist.is_empty() {
            cmd.arg("-c")
                .arg(format!("tessedit_char_whitelist={}", options.whitelist));
        }
        cmd.stdout(Stdio::null());
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognizeOptions,
        progress: &mut dyn FnMut(u8),
    ) -> Result<String, OcrError> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png").map_err(OcrError::TempFile)?;
        image
            .save(temp_input.path())
            .map_err(OcrError::ImageWrite)?;

        // Tesseract appends .txt to the output base
        let temp_output = NamedTempFile::new().map_err(OcrError::TempFile)?;
        let output_base = temp_output.path().to_string_lossy().to_string();
        let txt_path = format!("{}.txt", output_base);

        // Stderr goes to a file so a chatty process never blocks on a full pipe
        let stderr_log = NamedTempFile::new().map_err(OcrError::TempFile)?;
        let mut cmd = self.build_command(temp_input.path(), &output_base, options);
        cmd.stderr(stderr_log.reopen().map_err(OcrError::TempFile)?);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OcrError::NotFound
            } else {
                OcrError::Spawn(e)
            }
        })?;

        info!(
            "Tesseract started ({}x{}, lang={}, psm={})",
            image.width(),
            image.height(),
            options.language,
            options.page_segmentation
        );
        progress(0);

        let start = Instant::now();
        let status = loop {
            match child.try_wait().map_err(OcrError::Spawn)? {
                Some(status) => break status,
                None if start.elapsed() > options.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = std::fs::remove_file(&txt_path);
                    return Err(OcrError::TimedOut(options.timeout.as_millis() as u64));
                }
                None => std::thread::sleep(POLL_INTERVAL),
            }
        };

        if !status.success() {
            let _ = std::fs::remove_file(&txt_path);
            let stderr = std::fs::read(stderr_log.path())
                .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
                .unwrap_or_default();
            return Err(OcrError::Failed {
                status: status.to_string(),
                stderr,
            });
        }

        let text = std::fs::read_to_string(&txt_path).map_err(OcrError::ReadOutput)?;
        let _ = std::fs::remove_file(&txt_path);

        debug!(
            "Tesseract finished in {:.1}s, {} chars",
            start.elapsed().as_secs_f32(),
            text.len()
        );
        progress(100);

        Ok(text)
    }
}

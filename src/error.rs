//! Error types for the import pipeline.
//!
//! Library layers report structured errors; the CLI wraps them with
//! `anyhow` context.

use thiserror::Error;

use crate::pipeline::StateKind;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Crop {side} = {value}% is outside the allowed 0-40% range")]
    CropOutOfRange { side: &'static str, value: f32 },

    #[error("Crop leaves no {axis}: {first} + {second} must stay below 100%")]
    CropTooLarge {
        axis: &'static str,
        first: f32,
        second: f32,
    },

    #[error("Crop produced an empty {width}x{height} region")]
    EmptyRegion { width: u32, height: u32 },

    #[error("Target width must be positive")]
    ZeroTargetWidth,

    #[error("Source image is empty")]
    EmptySource,

    #[error("Rescaled image would be {width}x{height}, too large to process")]
    TooLarge { width: u32, height: u32 },
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Tesseract not found. Please install Tesseract-OCR or set ocr.tesseract_path")]
    NotFound,

    #[error("Failed to write OCR input image")]
    ImageWrite(#[source] image::ImageError),

    #[error("Failed to prepare temporary OCR files")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to start Tesseract")]
    Spawn(#[source] std::io::Error),

    #[error("Tesseract failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Tesseract timed out after {0}ms")]
    TimedOut(u64),

    #[error("Failed to read Tesseract output")]
    ReadOutput(#[source] std::io::Error),

    #[error("OCR engine error: {0}")]
    Engine(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed for key {key}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize match records")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid deck id: {0:?}")]
    InvalidDeckId(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Recognition already in progress")]
    Busy,

    #[error("No image loaded")]
    NoImage,

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: StateKind, to: StateKind },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("Recognition failed: {0}")]
    Recognition(#[from] OcrError),

    #[error("No parsed rows to import")]
    NothingToImport,

    #[error(transparent)]
    Store(#[from] StoreError),
}

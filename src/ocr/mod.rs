//! Image preprocessing and text recognition for standings screenshots.

pub mod engine;
pub mod preprocess;
pub mod setup;

pub use engine::{EngineMode, OcrEngine, RecognizeOptions, TesseractCli, DEFAULT_WHITELIST};
pub use preprocess::{preprocess, CropSettings, PreprocessMode, DEFAULT_TARGET_WIDTH};
pub use setup::{ensure_language_data, tesseract_from_config};

//! Standings Import
//!
//! Turns a photo or screenshot of a tournament standings table into per-match
//! records attached to a deck: the image is binarized for OCR, recognized by
//! Tesseract, parsed into ranked rows, and each row's `W-L-D` tally is
//! expanded into one record per game.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod pipeline;
pub mod records;
pub mod standings;
pub mod store;

pub use config::{ImportConfig, OcrConfig};
pub use error::{OcrError, PipelineError, PreprocessError, StoreError};
pub use pipeline::{ImportPipeline, PipelineState};
pub use records::{MatchRecord, MatchResult, NewMatch};
pub use standings::{parse, ParsedRow};
pub use store::{FileStore, KeyValueStore, MatchStore, MemoryStore};

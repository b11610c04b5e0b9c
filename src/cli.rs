use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::ocr::{CropSettings, PreprocessMode};

#[derive(Parser)]
#[command(name = "standings-import")]
#[command(about = "Import tournament standings screenshots as per-deck match records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./config.json, then next to the executable)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Crop margins in percent, overriding the configured ones.
#[derive(Args, Debug, Default)]
pub struct CropArgs {
    #[arg(long)]
    pub crop_top: Option<f32>,
    #[arg(long)]
    pub crop_right: Option<f32>,
    #[arg(long)]
    pub crop_bottom: Option<f32>,
    #[arg(long)]
    pub crop_left: Option<f32>,
}

impl CropArgs {
    pub fn apply(&self, base: CropSettings) -> CropSettings {
        CropSettings {
            top: self.crop_top.unwrap_or(base.top),
            right: self.crop_right.unwrap_or(base.right),
            bottom: self.crop_bottom.unwrap_or(base.bottom),
            left: self.crop_left.unwrap_or(base.left),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recognize a standings screenshot and add its matches to a deck
    Import {
        /// Standings image (PNG, JPEG, ...)
        #[arg(required = true)]
        image: PathBuf,

        /// Deck receiving the matches
        #[arg(short, long)]
        deck: String,

        /// Deck display name, for messages only
        #[arg(long)]
        deck_name: Option<String>,

        #[command(flatten)]
        crop: CropArgs,

        /// Binarization mode (auto/high-contrast/colored-text)
        #[arg(short, long)]
        mode: Option<PreprocessMode>,

        /// Show the parsed rows without writing matches
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse recognized standings text (stdin when no file is given)
    Parse {
        /// Text file with OCR output
        input: Option<PathBuf>,

        /// Also show the matches each row expands to
        #[arg(long)]
        expand: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write the preprocessed image OCR would see
    Preview {
        #[arg(required = true)]
        image: PathBuf,

        /// Output PNG
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,

        #[command(flatten)]
        crop: CropArgs,

        #[arg(short, long)]
        mode: Option<PreprocessMode>,
    },

    /// List a deck's matches, newest first
    List {
        #[arg(short, long)]
        deck: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete one match by id
    Delete {
        #[arg(short, long)]
        deck: String,

        /// Match id
        id: String,
    },

    /// Delete every match of a deck
    Clear {
        #[arg(short, long)]
        deck: String,
    },

    /// Export a deck's matches to CSV
    Export {
        #[arg(short, long)]
        deck: String,

        /// Output CSV file
        #[arg(short, long, default_value = "matches.csv")]
        output: PathBuf,
    },

    /// Win/loss summary of a deck
    Summary {
        #[arg(short, long)]
        deck: String,

        /// Also write the summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a config.json with default settings
    InitConfig {
        #[arg(default_value = "config.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the Tesseract installation and download language data
    Setup,
}

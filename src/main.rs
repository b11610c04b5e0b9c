//! Standings Import command-line tool.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use standings_import::cli::{Cli, Commands};
use standings_import::config::ImportConfig;
use standings_import::ocr::{self, preprocess, CropSettings, PreprocessMode};
use standings_import::pipeline::ImportPipeline;
use standings_import::records::{self, summary, MatchRecord, MatchSummary};
use standings_import::standings::{self, ParsedRow};
use standings_import::store::{FileStore, MatchStore};
use standings_import::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = ImportConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Import {
            image,
            deck,
            deck_name,
            crop,
            mode,
            dry_run,
        } => {
            let source = load_rgba(&image)?;
            let engine = ocr::tesseract_from_config(&config.ocr)?;
            let pipeline = ImportPipeline::new(engine, &config);

            let crop = crop.apply(config.crop);
            let mode = mode.unwrap_or(config.mode);
            pipeline
                .update_settings(crop, mode)
                .context("Invalid crop settings")?;

            println!("Recognizing {}...", image.display());
            let rows = pipeline.load_image(source)?;
            if let Some(strategy) = pipeline.strategy() {
                println!("Found {} rows ({} layout)", rows.len(), strategy);
            }
            print_rows(&rows);

            if rows.is_empty() {
                bail!("No standings rows recognized. Try another crop or --mode.");
            }
            if dry_run {
                println!("Dry run: nothing written");
                return Ok(());
            }

            let store = open_store(&config)?;
            let count = pipeline.commit(&store, &deck, deck_name.as_deref())?;
            println!(
                "Imported {} matches into {}",
                count,
                deck_name.as_deref().unwrap_or(&deck)
            );
        }

        Commands::Parse {
            input,
            expand,
            json,
        } => {
            let text = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };

            let outcome = standings::parse_with_strategy(&text);
            match outcome.strategy {
                Some(strategy) => info!("Parsed {} rows ({} layout)", outcome.rows.len(), strategy),
                None => warn!("No standings rows found"),
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.rows)?);
            } else {
                print_rows(&outcome.rows);
            }

            if expand {
                for m in records::expand(&outcome.rows) {
                    println!(
                        "{:<8} {:<5} {:<24} {}",
                        m.round,
                        m.result,
                        m.opponent,
                        m.notes.as_deref().unwrap_or("")
                    );
                }
            }
        }

        Commands::Preview {
            image,
            output,
            crop,
            mode,
        } => {
            let source = load_rgba(&image)?;
            let crop: CropSettings = crop.apply(config.crop);
            let mode: PreprocessMode = mode.unwrap_or(config.mode);

            let preview = preprocess(&source, &crop, config.target_width, mode)?;
            preview
                .save(&output)
                .with_context(|| format!("Failed to save {}", output.display()))?;
            println!(
                "Saved {}x{} preview ({}) to {}",
                preview.width(),
                preview.height(),
                mode,
                output.display()
            );
        }

        Commands::List { deck, json } => {
            let store = open_store(&config)?;
            let matches = store.list(&deck);
            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else {
                print_matches(&matches);
            }
        }

        Commands::Delete { deck, id } => {
            let store = open_store(&config)?;
            if store.delete_one(&deck, &id)? {
                println!("Deleted match {}", id);
            } else {
                bail!("No match {} in deck {}", id, deck);
            }
        }

        Commands::Clear { deck } => {
            let store = open_store(&config)?;
            let count = store.list(&deck).len();
            store.clear(&deck)?;
            println!("Deleted {} matches from {}", count, deck);
        }

        Commands::Export { deck, output } => {
            let store = open_store(&config)?;
            let matches = store.list(&deck);
            records::export_csv(&output, &matches)?;
            println!("Exported {} matches to {}", matches.len(), output.display());
        }

        Commands::Summary { deck, output } => {
            let store = open_store(&config)?;
            let summary = MatchSummary::from_records(&store.list(&deck));
            print!("{}", summary);
            if let Some(path) = output {
                summary::export_to_json(&summary, &path)?;
                println!("Summary saved to {}", path.display());
            }
        }

        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            ImportConfig::save_default(&path)?;
            println!("Wrote default config to {}", path.display());
        }

        Commands::Setup => {
            let engine = ocr::tesseract_from_config(&config.ocr)?;
            println!("Tesseract: {}", engine.executable().display());
            let tessdata = ocr::ensure_language_data(&config.ocr)?;
            println!(
                "Language data '{}' available in {}",
                config.ocr.language,
                tessdata.display()
            );
        }
    }

    Ok(())
}

fn load_rgba(path: &Path) -> Result<image::RgbaImage> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(img.to_rgba8())
}

fn open_store(config: &ImportConfig) -> Result<MatchStore<FileStore>> {
    let dir = config.store_dir();
    let store = FileStore::open(&dir)
        .with_context(|| format!("Failed to open match store at {}", dir.display()))?;
    Ok(MatchStore::new(store))
}

fn print_rows(rows: &[ParsedRow]) {
    for row in rows {
        println!(
            "{:>4}  {:<24} {:>6}  {}",
            row.rank,
            row.player,
            row.points.map(|p| p.to_string()).unwrap_or_default(),
            row.record.as_deref().unwrap_or("")
        );
    }
}

fn print_matches(matches: &[MatchRecord]) {
    if matches.is_empty() {
        println!("No matches");
        return;
    }
    for m in matches {
        println!(
            "{}  {}  {:<8} {:<5} {:<24} {}",
            m.id,
            m.date.format("%Y-%m-%d %H:%M"),
            m.round,
            m.result,
            m.opponent,
            m.notes.as_deref().unwrap_or("")
        );
    }
}

//! CSV export of stored match records.
//!
//! One header row, then one row per record in stored order (newest first).

use super::MatchRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV header row.
const CSV_HEADER: &str = "id,deck_id,date,round,opponent,opponent_inks,result,notes";

/// Quotes a field when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(record: &MatchRecord) -> String {
    let fields = [
        record.id.clone(),
        record.deck_id.clone(),
        record.date.to_rfc3339(),
        record.round.clone(),
        record.opponent.clone(),
        record.opponent_inks.to_string(),
        record.result.to_string(),
        record.notes.clone().unwrap_or_default(),
    ];

    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Writes `records` to a new CSV file at `path`, replacing any existing file.
pub fn export_csv(path: &Path, records: &[MatchRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    for record in records {
        writeln!(writer, "{}", format_row(record)).context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

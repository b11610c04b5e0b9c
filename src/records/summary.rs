//! Win/loss summary of a deck's stored matches.

use super::{MatchRecord, MatchResult};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Results against one opponent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpponentTally {
    pub opponent: String,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
}

impl OpponentTally {
    pub fn games(&self) -> usize {
        self.wins + self.losses + self.draws
    }
}

/// Totals over a set of match records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchSummary {
    /// Number of matches
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    /// Wins over all matches, 0.0 when there are none
    pub win_rate: f64,
    /// Sorted by games played, then by name
    pub opponents: Vec<OpponentTally>,
}

impl MatchSummary {
    /// Calculate the summary for `records`.
    pub fn from_records(records: &[MatchRecord]) -> Self {
        let mut summary = MatchSummary::default();
        let mut by_opponent: BTreeMap<&str, OpponentTally> = BTreeMap::new();

        for record in records {
            let tally = by_opponent
                .entry(record.opponent.as_str())
                .or_insert_with(|| OpponentTally {
                    opponent: record.opponent.clone(),
                    ..Default::default()
                });

            match record.result {
                MatchResult::Win => {
                    summary.wins += 1;
                    tally.wins += 1;
                }
                MatchResult::Loss => {
                    summary.losses += 1;
                    tally.losses += 1;
                }
                MatchResult::Draw => {
                    summary.draws += 1;
                    tally.draws += 1;
                }
            }
        }

        summary.total = records.len();
        if summary.total > 0 {
            summary.win_rate = summary.wins as f64 / summary.total as f64;
        }

        let mut opponents: Vec<OpponentTally> = by_opponent.into_values().collect();
        // BTreeMap order already sorts by name; stable sort keeps it for ties
        opponents.sort_by(|a, b| b.games().cmp(&a.games()));
        summary.opponents = opponents;

        summary
    }
}

impl std::fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} matches: {}W {}L {}D ({:.1}% win rate)",
            self.total,
            self.wins,
            self.losses,
            self.draws,
            self.win_rate * 100.0
        )?;
        for tally in &self.opponents {
            writeln!(
                f,
                "  {:<24} {}-{}-{}",
                tally.opponent, tally.wins, tally.losses, tally.draws
            )?;
        }
        Ok(())
    }
}

/// Export a summary to a pretty-printed JSON file.
pub fn export_to_json(summary: &MatchSummary, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(summary).context("Failed to serialize summary to JSON")?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

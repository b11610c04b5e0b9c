use tracing::{debug, warn};

use super::{MatchResult, NewMatch, OpponentInks};
use crate::standings::ParsedRow;

/// Most games one standings row may expand to. Larger tallies are OCR noise
/// (a lost dash, a date fragment) and are treated as record-less rows.
pub const MAX_GAMES_PER_ROW: u32 = 64;

/// Aggregate win/loss/draw counts read from a record string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl Tally {
    /// Parses `W-L` or `W-L-D`. Surrounding whitespace is ignored.
    pub fn parse(record: &str) -> Option<Self> {
        let parts: Vec<&str> = record.trim().split('-').collect();
        if !(2..=3).contains(&parts.len()) {
            return None;
        }

        let mut counts = parts.iter().map(|p| p.trim().parse::<u32>());
        let wins = counts.next()?.ok()?;
        let losses = counts.next()?.ok()?;
        let draws = match counts.next() {
            Some(value) => value.ok()?,
            None => 0,
        };

        Some(Tally {
            wins,
            losses,
            draws,
        })
    }

    pub fn total(&self) -> u32 {
        self.wins
            .saturating_add(self.losses)
            .saturating_add(self.draws)
    }
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.draws)
    }
}

/// Expands standings rows into one match per game played.
///
/// A row with a tally yields its wins, then its losses, then its draws. A row
/// without a usable tally yields a single win whose notes carry the points.
/// Tallies over [`MAX_GAMES_PER_ROW`] games count as unusable.
pub fn expand(rows: &[ParsedRow]) -> Vec<NewMatch> {
    let mut matches = Vec::new();

    for row in rows {
        let tally = row.record.as_deref().and_then(Tally::parse).filter(|tally| {
            let plausible = tally.total() <= MAX_GAMES_PER_ROW;
            if !plausible {
                warn!(
                    "Ignoring implausible record {} for {} (over {} games)",
                    tally, row.player, MAX_GAMES_PER_ROW
                );
            }
            plausible
        });

        match tally {
            Some(tally) => expand_tally(row, tally, &mut matches),
            None => {
                if let Some(record) = &row.record {
                    debug!("Unreadable record '{}' for {}, treating as one win", record, row.player);
                }
                matches.push(NewMatch {
                    id: None,
                    date: None,
                    round: row.rank.to_string(),
                    opponent: row.player.clone(),
                    opponent_inks: OpponentInks::Unknown,
                    result: MatchResult::Win,
                    notes: row.points.map(|p| p.to_string()),
                });
            }
        }
    }

    matches
}

fn expand_tally(row: &ParsedRow, tally: Tally, out: &mut Vec<NewMatch>) {
    let blocks = [
        (MatchResult::Win, tally.wins),
        (MatchResult::Loss, tally.losses),
        (MatchResult::Draw, tally.draws),
    ];

    let mut seq = 0;
    for (result, count) in blocks {
        for i in 1..=count {
            seq += 1;
            out.push(NewMatch {
                id: None,
                date: None,
                round: format!("{}-{}", row.rank, seq),
                opponent: row.player.clone(),
                opponent_inks: OpponentInks::Unknown,
                result,
                notes: Some(format!("{} {}/{} vs {}", result, i, count, row.player)),
            });
        }
    }
}

//! Standings text parsing.
//!
//! OCR output of a standings table comes in three shapes, tried in order:
//! - Tabular: a delimited header row naming rank and player columns
//! - Block: one block per player, each starting with an ordinal ("1st", "2nd")
//! - Loose: one player per line, starting with the rank
//!
//! The first strategy that yields at least one row wins; rows from different
//! strategies are never merged.

mod block;
mod loose;
mod tabular;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Aggregate tally such as `3-0` or `2-1-1`.
pub(crate) static RECORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+-\d+(?:-\d+)?").unwrap());

/// One standings entry recovered from OCR text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRow {
    pub rank: u32,
    pub player: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
}

impl ParsedRow {
    /// Rows need a positive rank and a non-empty player name.
    pub fn is_valid(&self) -> bool {
        self.rank > 0 && !self.player.trim().is_empty()
    }
}

/// Which layout produced a set of rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseStrategy {
    Tabular,
    Block,
    LooseLine,
}

impl std::fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStrategy::Tabular => write!(f, "tabular"),
            ParseStrategy::Block => write!(f, "block"),
            ParseStrategy::LooseLine => write!(f, "loose-line"),
        }
    }
}

/// Rows together with the strategy that produced them.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseOutcome {
    /// `None` when no strategy found a usable row
    pub strategy: Option<ParseStrategy>,
    pub rows: Vec<ParsedRow>,
}

/// Parses recognized standings text into rows, in encounter order.
///
/// Never fails: unparseable text yields an empty list.
pub fn parse(text: &str) -> Vec<ParsedRow> {
    parse_with_strategy(text).rows
}

/// Like [`parse`], also reporting which strategy matched.
pub fn parse_with_strategy(text: &str) -> ParseOutcome {
    let attempts: [(ParseStrategy, fn(&str) -> Vec<ParsedRow>); 3] = [
        (ParseStrategy::Tabular, tabular::parse_tabular),
        (ParseStrategy::Block, block::parse_blocks),
        (ParseStrategy::LooseLine, loose::parse_loose_lines),
    ];

    for (strategy, attempt) in attempts {
        let rows = attempt(text);
        if !rows.is_empty() {
            return ParseOutcome {
                strategy: Some(strategy),
                rows,
            };
        }
    }

    ParseOutcome {
        strategy: None,
        rows: Vec::new(),
    }
}

/// Keeps only the ASCII digits of `text` and parses them.
pub(crate) fn digits_only(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// First `W-L` / `W-L-D` substring of `text`.
pub(crate) fn find_record(text: &str) -> Option<String> {
    RECORD_RE.find(text).map(|m| m.as_str().to_string())
}

//! Atomic match records and the expansion of standings rows into them.
//!
//! This module provides:
//! - Match record types stored per deck
//! - Expansion of `W-L-D` tallies into one record per game
//! - CSV export and win/loss summaries of stored records

pub mod expand;
pub mod export;
pub mod summary;

pub use expand::{expand, Tally};
pub use export::export_csv;
pub use summary::MatchSummary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of a single match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MatchResult::Win => "Win",
            MatchResult::Loss => "Loss",
            MatchResult::Draw => "Draw",
        };
        f.pad(label)
    }
}

/// Card resource colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ink {
    Amber,
    Amethyst,
    Emerald,
    Ruby,
    Sapphire,
    Steel,
}

/// Inks an opponent played, when known.
///
/// Serialized as the string `"unknown"` or as an array of inks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OpponentInksRepr", into = "OpponentInksRepr")]
pub enum OpponentInks {
    #[default]
    Unknown,
    Known(BTreeSet<Ink>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OpponentInksRepr {
    List(Vec<Ink>),
    Label(String),
}

impl From<OpponentInks> for OpponentInksRepr {
    fn from(inks: OpponentInks) -> Self {
        match inks {
            OpponentInks::Unknown => OpponentInksRepr::Label("unknown".to_string()),
            OpponentInks::Known(set) => OpponentInksRepr::List(set.into_iter().collect()),
        }
    }
}

impl TryFrom<OpponentInksRepr> for OpponentInks {
    type Error = String;

    fn try_from(repr: OpponentInksRepr) -> Result<Self, Self::Error> {
        match repr {
            OpponentInksRepr::List(list) => Ok(OpponentInks::Known(list.into_iter().collect())),
            OpponentInksRepr::Label(label) if label.eq_ignore_ascii_case("unknown") => {
                Ok(OpponentInks::Unknown)
            }
            OpponentInksRepr::Label(label) => Err(format!("invalid opponent inks: {}", label)),
        }
    }
}

impl std::fmt::Display for OpponentInks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpponentInks::Unknown => write!(f, "unknown"),
            OpponentInks::Known(set) => {
                let names: Vec<String> = set.iter().map(|ink| format!("{:?}", ink)).collect();
                write!(f, "{}", names.join("/"))
            }
        }
    }
}

/// A match not yet committed to a deck. Missing ids and dates are filled in
/// by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMatch {
    pub id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub round: String,
    pub opponent: String,
    pub opponent_inks: OpponentInks,
    pub result: MatchResult,
    pub notes: Option<String>,
}

/// One stored match outcome owned by a deck.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: String,
    pub deck_id: String,
    #[serde(rename = "dateISO")]
    pub date: DateTime<Utc>,
    pub round: String,
    pub opponent: String,
    #[serde(default)]
    pub opponent_inks: OpponentInks,
    pub result: MatchResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_json_shape() {
        let record = MatchRecord {
            id: "m1".to_string(),
            deck_id: "deck-9".to_string(),
            date: Utc.with_ymd_and_hms(2026, 3, 14, 18, 30, 0).unwrap(),
            round: "1-1".to_string(),
            opponent: "Alice".to_string(),
            opponent_inks: OpponentInks::Unknown,
            result: MatchResult::Win,
            notes: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["deckId"], "deck-9");
        assert_eq!(json["dateISO"], "2026-03-14T18:30:00Z");
        assert_eq!(json["opponentInks"], "unknown");
        assert_eq!(json["result"], "Win");
        assert!(json.get("notes").is_none());

        let back: MatchRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_known_inks_serialize_as_list() {
        let inks = OpponentInks::Known([Ink::Steel, Ink::Amber].into_iter().collect());
        let json = serde_json::to_string(&inks).unwrap();
        assert_eq!(json, r#"["Amber","Steel"]"#);
        assert_eq!(inks.to_string(), "Amber/Steel");

        let parsed: OpponentInks = serde_json::from_str(r#""Unknown""#).unwrap();
        assert_eq!(parsed, OpponentInks::Unknown);
        assert!(serde_json::from_str::<OpponentInks>(r#""purple""#).is_err());
    }
}

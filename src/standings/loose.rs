use once_cell::sync::Lazy;
use regex::Regex;

use super::{ParsedRow, RECORD_RE};

/// Leading rank, optionally followed by ".", ")" or ":".
static RANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)[.):]?").unwrap());

/// "points 9", "Points: 9" or "9pts" / "9 pts".
static POINTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpoints?\s*:?\s*(\d+)|\b(\d+)\s*pts\b").unwrap());

/// Separator characters OCR leaves around a name once the numbers are gone.
const SEPARATORS: &[char] = &['|', '-', ',', ';', ':'];

fn remove_span(text: &str, start: usize, end: usize) -> String {
    format!("{} {}", &text[..start], &text[end..])
}

/// Pulls the first `W-L[-D]` out of `text`.
fn strip_record(text: &str) -> (Option<String>, String) {
    match RECORD_RE.find(text) {
        Some(m) => (
            Some(m.as_str().to_string()),
            remove_span(text, m.start(), m.end()),
        ),
        None => (None, text.to_string()),
    }
}

/// Pulls the first points phrase out of `text`.
fn strip_points(text: &str) -> (Option<u32>, String) {
    let Some(caps) = POINTS_RE.captures(text) else {
        return (None, text.to_string());
    };
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok());
    match caps.get(0) {
        Some(whole) => (value, remove_span(text, whole.start(), whole.end())),
        None => (value, text.to_string()),
    }
}

fn parse_line(line: &str) -> Option<ParsedRow> {
    let rank_match = RANK_RE.captures(line)?;
    let rank: u32 = rank_match[1].parse().unwrap_or(0);
    let prefix_end = rank_match.get(0)?.end();

    let (record, rest) = strip_record(&line[prefix_end..]);
    let (points, rest) = strip_points(&rest);

    let player = rest
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .to_string();

    let row = ParsedRow {
        rank,
        player,
        points,
        record,
    };
    row.is_valid().then_some(row)
}

/// Reads each line on its own as `<rank> <player> [points] [record]`.
pub(super) fn parse_loose_lines(text: &str) -> Vec<ParsedRow> {
    text.lines().filter_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_phrase_variants() {
        let rows = parse_loose_lines("1. Ana points: 12 4-0\n2) Ben 9 pts 3-1\n3 Cy Points 6");
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].player, "Ana");
        assert_eq!(rows[0].points, Some(12));
        assert_eq!(rows[0].record.as_deref(), Some("4-0"));

        assert_eq!(rows[1].player, "Ben");
        assert_eq!(rows[1].points, Some(9));

        assert_eq!(rows[2].player, "Cy");
        assert_eq!(rows[2].points, Some(6));
        assert_eq!(rows[2].record, None);
    }

    #[test]
    fn test_whitespace_collapsed_and_separators_trimmed() {
        let rows = parse_loose_lines("4   Dana    Smith  |  2-2-1");
        assert_eq!(rows[0].player, "Dana Smith");
        assert_eq!(rows[0].record.as_deref(), Some("2-2-1"));
    }

    #[test]
    fn test_lines_without_rank_or_player_dropped() {
        let rows = parse_loose_lines("Standings\n5 3-0\n0 Zed 1-0\n\n6 Eve");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 6);
        assert_eq!(rows[0].player, "Eve");
    }
}

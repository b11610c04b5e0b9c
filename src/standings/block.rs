use once_cell::sync::Lazy;
use regex::Regex;

use super::{find_record, ParsedRow};

/// Ordinal marker at line start: "1st", "2nd", "3rd", "4th", "11th", ...
static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)(?:st|nd|rd|th)\b").unwrap());

/// Lines describing a player rather than naming one.
static METADATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)points?\s*:|record|status").unwrap());

static POINTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)points?\s*:?\s*(\d+)").unwrap());

/// Lines belonging to one ordinal-marked player block.
struct Block<'a> {
    rank: u32,
    /// Text after the ordinal on the marker line
    inline: &'a str,
    lines: Vec<&'a str>,
}

impl Block<'_> {
    fn player(&self) -> Option<String> {
        let inline = self
            .inline
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ')' | ':' | '-'))
            .trim();

        let candidate = if !inline.is_empty() && !METADATA_RE.is_match(inline) {
            Some(inline)
        } else {
            self.lines
                .iter()
                .map(|line| line.trim())
                .find(|line| !line.is_empty() && !METADATA_RE.is_match(line))
        };

        candidate
            .map(|name| name.trim_end_matches('.').trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn text(&self) -> String {
        std::iter::once(self.inline)
            .chain(self.lines.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn into_row(self) -> Option<ParsedRow> {
        let text = self.text();
        let row = ParsedRow {
            rank: self.rank,
            player: self.player()?,
            points: POINTS_RE
                .captures(&text)
                .and_then(|c| c[1].parse().ok()),
            record: find_record(&text),
        };
        row.is_valid().then_some(row)
    }
}

/// Splits text into blocks at ordinal-marked lines and reads one row per block.
///
/// Text before the first marker is ignored.
pub(super) fn parse_blocks(text: &str) -> Vec<ParsedRow> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = ORDINAL_RE.captures(line) {
            let marker_end = caps.get(0).map_or(0, |m| m.end());
            blocks.push(Block {
                rank: caps[1].parse().unwrap_or(0),
                inline: &line[marker_end..],
                lines: Vec::new(),
            });
        } else if let Some(current) = blocks.last_mut() {
            current.lines.push(line);
        }
    }

    blocks.into_iter().filter_map(Block::into_row).collect()
}

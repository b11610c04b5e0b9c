use once_cell::sync::Lazy;
use regex::Regex;

use super::{digits_only, find_record, ParsedRow};

static RANK_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"rank|place").unwrap());
static PLAYER_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"player|name").unwrap());
static POINTS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"points|pts").unwrap());
static RECORD_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"record|w-l(-d)?").unwrap());

/// Column positions found in the header row.
#[derive(Debug, Default, PartialEq)]
struct Columns {
    rank: Option<usize>,
    player: Option<usize>,
    points: Option<usize>,
    record: Option<usize>,
}

impl Columns {
    /// Assigns each header cell to the first role its keyword matches.
    fn from_header(cells: &[&str]) -> Self {
        let mut columns = Columns::default();
        for (idx, cell) in cells.iter().enumerate() {
            let cell = cell.trim().to_lowercase();
            if RANK_HEADER.is_match(&cell) {
                columns.rank.get_or_insert(idx);
            } else if PLAYER_HEADER.is_match(&cell) {
                columns.player.get_or_insert(idx);
            } else if POINTS_HEADER.is_match(&cell) {
                columns.points.get_or_insert(idx);
            } else if RECORD_HEADER.is_match(&cell) {
                columns.record.get_or_insert(idx);
            }
        }
        columns
    }
}

/// Picks the delimiter of the header line: tab first, then comma.
fn detect_delimiter(line: &str) -> Option<char> {
    if line.contains('\t') {
        Some('\t')
    } else if line.contains(',') {
        Some(',')
    } else {
        None
    }
}

/// Parses delimited text whose first line is a header naming rank and player.
///
/// Returns no rows when the first line is not such a header.
pub(super) fn parse_tabular(text: &str) -> Vec<ParsedRow> {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let Some(delimiter) = detect_delimiter(header) else {
        return Vec::new();
    };

    let lowered = header.to_lowercase();
    if !RANK_HEADER.is_match(&lowered) || !PLAYER_HEADER.is_match(&lowered) {
        return Vec::new();
    }

    let header_cells: Vec<&str> = header.split(delimiter).collect();
    let columns = Columns::from_header(&header_cells);

    let cell = |cells: &[&str], idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| cells.get(i)).map(|c| c.trim().to_string())
    };

    lines
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let cells: Vec<&str> = line.split(delimiter).collect();
            let row = ParsedRow {
                rank: cell(&cells, columns.rank)
                    .and_then(|c| digits_only(&c))
                    .unwrap_or(0),
                player: cell(&cells, columns.player).unwrap_or_default(),
                points: cell(&cells, columns.points).and_then(|c| digits_only(&c)),
                record: cell(&cells, columns.record).and_then(|c| find_record(&c)),
            };
            row.is_valid().then_some(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_column_mapping() {
        let columns = Columns::from_header(&["Player Name", "Pts", "Place", "Record"]);
        assert_eq!(
            columns,
            Columns {
                rank: Some(2),
                player: Some(0),
                points: Some(1),
                record: Some(3),
            }
        );
    }

    #[test]
    fn test_tab_preferred_over_comma() {
        let text = "Rank\tPlayer\tRecord\n1\tSmith, Anna\t4-1";
        let rows = parse_tabular(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player, "Smith, Anna");
        assert_eq!(rows[0].record.as_deref(), Some("4-1"));
    }

    #[test]
    fn test_non_header_first_line_rejected() {
        assert!(parse_tabular("1,Alice,9,3-0-0\n2,Bob,6,2-1-0").is_empty());
        assert!(parse_tabular("Rank Player Points").is_empty());
    }

    #[test]
    fn test_invalid_rows_discarded() {
        let text = "Rank,Player,Points\n0,Zero,3\n,NoRank,3\n4,,3\n5,Kim,abc";
        let rows = parse_tabular(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 5);
        assert_eq!(rows[0].player, "Kim");
        assert_eq!(rows[0].points, None);
    }

    #[test]
    fn test_record_extracted_from_noisy_cell() {
        let text = "Rank,Player,Record\n#1,Lee,(3-1-1) OK";
        let rows = parse_tabular(text);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].record.as_deref(), Some("3-1-1"));
    }
}

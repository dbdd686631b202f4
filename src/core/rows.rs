//! Row renderer - display-ready results rows

use super::format::{format_name, format_penalty, format_rank};
use super::types::{Bib, ResultsSnapshot};

/// One results row as displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub bib: Bib,
    pub rank: String,
    pub name: String,
    pub nationality: String,
    pub penalty: String,
    /// Penalty other than zero, shown with emphasis
    pub has_penalty: bool,
    pub total: String,
    pub behind: String,
    pub highlighted: bool,
}

/// Build display rows for a snapshot; `highlight` is the effective highlight
pub fn render_rows(snapshot: &ResultsSnapshot, highlight: Option<Bib>) -> Vec<RowView> {
    snapshot
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let penalty = format_penalty(&row.penalty);
            RowView {
                bib: row.bib,
                rank: format_rank(row.rank),
                name: format_name(&row.name),
                nationality: row.nationality.clone(),
                has_penalty: penalty != "0",
                penalty,
                total: row.total_time.clone(),
                // Leader has no gap
                behind: if index == 0 {
                    String::new()
                } else {
                    row.behind_leader.clone()
                },
                highlighted: highlight == Some(row.bib),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CompetitorRow;

    fn snapshot() -> ResultsSnapshot {
        let mut leader = CompetitorRow::new(7, Some(1), "SMITH John/JONES Mike");
        leader.behind_leader = "0.00".to_string();
        leader.total_time = "95.10".to_string();

        let mut second = CompetitorRow::new(9, Some(2), "NOVAK Jan");
        second.penalty = "2".to_string();
        second.behind_leader = "+1.20".to_string();

        let unranked = CompetitorRow::new(11, None, "DOE Jane");

        ResultsSnapshot {
            rows: vec![leader, second, unranked],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_labels() {
        let rows = render_rows(&snapshot(), None);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].rank, "1.");
        assert_eq!(rows[0].name, "SMITH/JONES");
        assert_eq!(rows[0].behind, "");
        assert_eq!(rows[0].penalty, "0");
        assert!(!rows[0].has_penalty);

        assert_eq!(rows[1].behind, "+1.20");
        assert!(rows[1].has_penalty);

        assert_eq!(rows[2].rank, "");
    }

    #[test]
    fn test_render_highlight_flag() {
        let rows = render_rows(&snapshot(), Some(Bib(9)));
        let flagged: Vec<Bib> = rows.iter().filter(|r| r.highlighted).map(|r| r.bib).collect();
        assert_eq!(flagged, vec![Bib(9)]);
    }
}

use tabled::{settings::Style, Table, Tabled};

use crate::election::analytics::{PartySummary, PenetrationReport, WinnerReport};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Two-column metric/value table
#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) -> &mut Self {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[derive(Tabled)]
struct ShareRow {
    #[tabled(rename = "Party")]
    party: &'static str,
    #[tabled(rename = "Votes")]
    votes: u64,
    #[tabled(rename = "Share %")]
    pct: String,
}

pub fn party_summary_table(summary: &PartySummary) -> String {
    let rows: Vec<ShareRow> = summary
        .parties
        .iter()
        .map(|p| ShareRow {
            party: p.label,
            votes: p.votes,
            pct: format!("{:.2}", p.pct),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct WinCountRow {
    #[tabled(rename = "Party")]
    party: String,
    #[tabled(rename = "Booths won")]
    booths: u64,
}

/// Booths won per party, most wins first
pub fn winner_counts_table(report: &WinnerReport) -> String {
    let mut rows: Vec<WinCountRow> = report
        .winner_counts
        .iter()
        .map(|(party, booths)| WinCountRow {
            party: party.clone(),
            booths: *booths,
        })
        .collect();
    rows.sort_by(|a, b| b.booths.cmp(&a.booths).then_with(|| a.party.cmp(&b.party)));
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct PenetrationRow {
    #[tabled(rename = "Booth")]
    booth: String,
    #[tabled(rename = "NTK votes")]
    ntk_votes: u64,
    #[tabled(rename = "NTK %")]
    ntk_pct: String,
    #[tabled(rename = "IJK votes")]
    ijk_votes: u64,
    #[tabled(rename = "IJK %")]
    ijk_pct: String,
}

pub fn penetration_table(report: &PenetrationReport) -> String {
    let rows: Vec<PenetrationRow> = report
        .booths
        .iter()
        .map(|b| PenetrationRow {
            booth: b.booth_station.clone(),
            ntk_votes: b.ntk_votes,
            ntk_pct: format!("{:.2}", b.ntk_pct),
            ijk_votes: b.ijk_votes,
            ijk_pct: format!("{:.2}", b.ijk_pct),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::analytics::{booth_winners, party_summary};
    use crate::election::{BoothResult, Party};

    #[test]
    fn test_metric_table() {
        let mut builder = TableBuilder::new();
        assert!(builder.build().is_empty());
        builder.add_row("Voters", 12).add_row("Families", 3);
        let out = builder.build();
        assert!(out.contains("Voters"));
        assert!(out.contains("12"));
    }

    #[test]
    fn test_election_tables() {
        let rows = vec![
            BoothResult::new("1").with_votes(Party::Dmk, 60).with_votes(Party::Ntk, 40).with_total_valid(100),
            BoothResult::new("2").with_votes(Party::Admk, 70).with_total_valid(70),
        ];
        let summary = party_summary_table(&party_summary(&rows));
        assert!(summary.contains("DMK"));
        assert!(summary.contains("35.29"));

        let wins = winner_counts_table(&booth_winners(&rows));
        assert!(wins.contains("ADMK"));
        assert!(wins.contains("Booths won"));
    }
}

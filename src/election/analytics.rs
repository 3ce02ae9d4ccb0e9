//! Election analytics implementation
//!
//! Provides booth-level derivations over raw result rows:
//! - Party summary (total votes and vote share)
//! - Per-booth winners, runner-up margins and booths-won counts
//! - Single-booth detail
//! - Small-party penetration above a vote-share threshold

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use super::{BoothResult, Party};
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Default vote-share threshold for small-party penetration
pub const DEFAULT_PENETRATION_THRESHOLD: f64 = 10.0;

/// Label counted for booths without a derivable winner
pub const UNKNOWN_WINNER: &str = "UNKNOWN";

/// One party's votes and share of the valid votes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyShare {
    pub key: &'static str,
    pub label: &'static str,
    pub votes: u64,
    pub pct: f64,
}

impl PartyShare {
    fn new(party: Party, votes: u64, denominator: u64) -> Self {
        Self {
            key: party.key(),
            label: party.label(),
            votes,
            pct: percentage(votes, denominator),
        }
    }
}

/// Constituency-wide totals per party
#[derive(Debug, Clone, Serialize)]
pub struct PartySummary {
    pub total_valid_votes: u64,
    pub parties: Vec<PartyShare>,
}

/// Winner and margin of one booth
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoothWinner {
    pub booth_station: String,
    pub winner: Option<&'static str>,
    pub runner_up: Option<&'static str>,
    pub margin: u64,
    pub total_valid_votes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WinnerReport {
    #[serde(rename = "perBooth")]
    pub per_booth: Vec<BoothWinner>,
    #[serde(rename = "winnerCounts")]
    pub winner_counts: BTreeMap<String, u64>,
}

/// Ranked breakdown of a single booth
#[derive(Debug, Clone, Serialize)]
pub struct BoothDetail {
    pub booth_station: String,
    pub parties: Vec<PartyShare>,
    pub winner: Option<&'static str>,
    pub margin: u64,
    pub total_valid_votes: u64,
}

/// NTK / IJK share in one booth
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Penetration {
    pub booth_station: String,
    pub ntk_votes: u64,
    pub ntk_pct: f64,
    pub ijk_votes: u64,
    pub ijk_pct: f64,
}

impl Penetration {
    fn peak(&self) -> f64 {
        self.ntk_pct.max(self.ijk_pct)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PenetrationReport {
    pub threshold: f64,
    pub booths: Vec<Penetration>,
}

/// Round to two decimal places, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `votes / denominator * 100` rounded to two places; 0 for an empty denominator
pub fn percentage(votes: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(votes as f64 / denominator as f64 * 100.0)
}

/// Rank the tracked parties of a booth by votes, highest first.
///
/// Equal votes keep the tracked-party order (DMK, DMDK, ADMK, IJK, NTK).
pub fn rank_parties(row: &BoothResult) -> Vec<(Party, u64)> {
    let mut ranked: Vec<(Party, u64)> = Party::all().iter().map(|p| (*p, row.votes(*p))).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Winner, runner-up and margin from a ranking.
///
/// A booth where no party polled a vote has no winner.
fn decide(ranked: &[(Party, u64)]) -> (Option<Party>, Option<Party>, u64) {
    match ranked.first() {
        Some(&(winner, votes)) if votes > 0 => {
            let runner_up = ranked.get(1).copied();
            let margin = votes - runner_up.map(|(_, v)| v).unwrap_or(0);
            (Some(winner), runner_up.map(|(p, _)| p), margin)
        }
        _ => (None, None, 0),
    }
}

pub fn party_summary(rows: &[BoothResult]) -> PartySummary {
    let total_valid_votes: u64 = rows.iter().map(|r| r.total_valid_votes).sum();
    let parties = Party::all()
        .iter()
        .map(|p| {
            let votes = rows.iter().map(|r| r.votes(*p)).sum();
            PartyShare::new(*p, votes, total_valid_votes)
        })
        .collect();

    PartySummary {
        total_valid_votes,
        parties,
    }
}

pub fn booth_winner(row: &BoothResult) -> BoothWinner {
    let ranked = rank_parties(row);
    let (winner, runner_up, margin) = decide(&ranked);
    BoothWinner {
        booth_station: row.booth_station.clone(),
        winner: winner.map(|p| p.label()),
        runner_up: runner_up.map(|p| p.label()),
        margin,
        total_valid_votes: row.total_valid_votes,
    }
}

pub fn booth_winners(rows: &[BoothResult]) -> WinnerReport {
    let per_booth: Vec<BoothWinner> = rows.iter().map(booth_winner).collect();

    let mut winner_counts = BTreeMap::new();
    for booth in &per_booth {
        let label = booth.winner.unwrap_or(UNKNOWN_WINNER);
        *winner_counts.entry(label.to_string()).or_insert(0) += 1;
    }

    WinnerReport {
        per_booth,
        winner_counts,
    }
}

/// Ranked breakdown of one booth.
///
/// Percentages use `total_valid_votes` floored at 1 as the denominator, but
/// the reported `total_valid_votes` is the raw stored value (0 stays 0).
/// A booth where every party polled 0 has no winner: `winner` is `None`
/// and the margin is 0.
pub fn booth_detail(row: &BoothResult) -> BoothDetail {
    let ranked = rank_parties(row);
    let (winner, _, margin) = decide(&ranked);
    let denominator = row.total_valid_votes.max(1);

    BoothDetail {
        booth_station: row.booth_station.clone(),
        parties: ranked
            .iter()
            .map(|(p, votes)| PartyShare::new(*p, *votes, denominator))
            .collect(),
        winner: winner.map(|p| p.label()),
        margin,
        total_valid_votes: row.total_valid_votes,
    }
}

/// Booths where NTK or IJK reach `threshold` percent, strongest first
pub fn small_party_penetration(rows: &[BoothResult], threshold: f64) -> PenetrationReport {
    let mut booths: Vec<Penetration> = rows
        .iter()
        .map(|r| {
            let denominator = r.total_valid_votes.max(1);
            Penetration {
                booth_station: r.booth_station.clone(),
                ntk_votes: r.ntk,
                ntk_pct: percentage(r.ntk, denominator),
                ijk_votes: r.ijk,
                ijk_pct: percentage(r.ijk, denominator),
            }
        })
        .filter(|p| p.ntk_pct >= threshold || p.ijk_pct >= threshold)
        .collect();

    booths.sort_by(|a, b| b.peak().partial_cmp(&a.peak()).unwrap_or(Ordering::Equal));

    PenetrationReport { threshold, booths }
}

/// Analytics over the results held in a store
pub struct ElectionEngine<'a> {
    store: &'a SqliteStore,
}

impl<'a> ElectionEngine<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    pub fn party_summary(&self) -> Result<PartySummary> {
        Ok(party_summary(&self.store.booth_results()?))
    }

    pub fn winners(&self) -> Result<WinnerReport> {
        Ok(booth_winners(&self.store.booth_results()?))
    }

    /// Detail for one booth; not-found when no row matches
    pub fn booth(&self, booth_station: &str) -> Result<BoothDetail> {
        let row = self
            .store
            .booth_result(booth_station)?
            .ok_or_else(|| Error::NotFound("Booth not found".to_string()))?;
        Ok(booth_detail(&row))
    }

    pub fn penetration(&self, threshold: Option<f64>) -> Result<PenetrationReport> {
        let threshold = threshold.unwrap_or(DEFAULT_PENETRATION_THRESHOLD);
        Ok(small_party_penetration(&self.store.booth_results()?, threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booth(station: &str, votes: [u64; 5], total_valid: u64) -> BoothResult {
        Party::all()
            .iter()
            .zip(votes)
            .fold(BoothResult::new(station), |row, (p, v)| row.with_votes(*p, v))
            .with_total_valid(total_valid)
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.333), 33.33);
        assert_eq!(round2(12.5), 12.5);
        assert_eq!(round2(66.666), 66.67);
    }

    #[test]
    fn test_party_summary_sums_to_hundred() {
        let rows = vec![
            booth("1", [60, 50, 45, 20, 25], 200),
            booth("2", [60, 45, 50, 20, 25], 200),
        ];
        let summary = party_summary(&rows);
        assert_eq!(summary.total_valid_votes, 400);
        assert_eq!(summary.parties[0].votes, 120);
        assert_eq!(summary.parties[0].pct, 30.0);
        let total: f64 = summary.parties.iter().map(|p| p.pct).sum();
        assert!(((total * 100.0).round() as i64 - 10_000).abs() <= 1);
    }

    #[test]
    fn test_party_summary_uneven_split_within_tolerance() {
        let rows = vec![booth("1", [1, 1, 1, 0, 0], 3)];
        let total: f64 = party_summary(&rows).parties.iter().map(|p| p.pct).sum();
        // compare in hundredths; 100.0 - 99.99 is not exactly 0.01
        assert!(((total * 100.0).round() as i64 - 10_000).abs() <= 1);
    }

    #[test]
    fn test_party_summary_zero_total() {
        let summary = party_summary(&[booth("1", [0; 5], 0)]);
        assert!(summary.parties.iter().all(|p| p.pct == 0.0));
        assert!(party_summary(&[]).parties.iter().all(|p| p.pct == 0.0));
    }

    #[test]
    fn test_winner_with_tied_runners_up() {
        // DMDK 120, DMK 95, ADMK 95: DMK precedes ADMK in the tracked order
        let row = booth("7", [95, 120, 95, 0, 0], 310);
        let result = booth_winner(&row);
        assert_eq!(result.winner, Some("DMDK"));
        assert_eq!(result.runner_up, Some("DMK"));
        assert_eq!(result.margin, 25);

        let order: Vec<&str> = rank_parties(&row).iter().map(|(p, _)| p.label()).collect();
        assert_eq!(order, vec!["DMDK", "DMK", "ADMK", "IJK", "NTK"]);
    }

    #[test]
    fn test_winner_counts() {
        let rows = vec![
            booth("1", [10, 5, 0, 0, 0], 15),
            booth("2", [10, 5, 0, 0, 0], 15),
            booth("3", [0, 0, 9, 0, 0], 9),
            booth("4", [0; 5], 0),
        ];
        let report = booth_winners(&rows);
        assert_eq!(report.winner_counts.get("DMK"), Some(&2));
        assert_eq!(report.winner_counts.get("ADMK"), Some(&1));
        assert_eq!(report.winner_counts.get(UNKNOWN_WINNER), Some(&1));
        assert_eq!(report.per_booth[3].margin, 0);
    }

    #[test]
    fn test_booth_detail_floors_denominator() {
        let detail = booth_detail(&booth("9", [0, 0, 0, 0, 3], 0));
        assert_eq!(detail.winner, Some("NTK"));
        assert_eq!(detail.margin, 3);
        assert_eq!(detail.parties[0].label, "NTK");
        assert_eq!(detail.parties[0].pct, 300.0);
        assert_eq!(detail.total_valid_votes, 0);
    }

    #[test]
    fn test_booth_detail_without_votes_has_no_winner() {
        let detail = booth_detail(&booth("4", [0; 5], 0));
        assert_eq!(detail.winner, None);
        assert_eq!(detail.margin, 0);
        assert_eq!(detail.total_valid_votes, 0);
        assert!(detail.parties.iter().all(|p| p.pct == 0.0));
    }

    #[test]
    fn test_penetration_threshold() {
        // NTK 12%, IJK 8%
        let rows = vec![booth("5", [50, 20, 10, 8, 12], 100)];
        let included = small_party_penetration(&rows, 10.0);
        assert_eq!(included.booths.len(), 1);
        assert_eq!(included.booths[0].ntk_pct, 12.0);
        assert_eq!(included.booths[0].ijk_pct, 8.0);

        let excluded = small_party_penetration(&rows, 15.0);
        assert!(excluded.booths.is_empty());
    }

    #[test]
    fn test_penetration_sorted_by_peak_share() {
        let rows = vec![
            booth("a", [0, 0, 0, 11, 0], 100),
            booth("b", [0, 0, 0, 0, 30], 100),
            booth("c", [0, 0, 0, 20, 5], 100),
        ];
        let report = small_party_penetration(&rows, 10.0);
        let order: Vec<&str> = report.booths.iter().map(|b| b.booth_station.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_engine_reads_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_booth_results(&[booth("1", [10, 5, 0, 0, 0], 15)])
            .unwrap();
        let engine = ElectionEngine::new(&store);

        assert_eq!(engine.party_summary().unwrap().total_valid_votes, 15);
        assert_eq!(engine.booth("1").unwrap().winner, Some("DMK"));
        assert!(matches!(engine.booth("404"), Err(Error::NotFound(_))));
        assert_eq!(engine.penetration(None).unwrap().threshold, 10.0);
    }
}

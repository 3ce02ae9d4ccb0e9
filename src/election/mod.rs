//! Election results and booth-level analytics
//!
//! Results are stored one row per booth station. Everything derived from
//! them (summaries, winners, penetration) is computed in-process by
//! [`analytics`] over rows fetched from the store.

pub mod analytics;

pub use analytics::{
    BoothDetail, BoothWinner, ElectionEngine, PartyShare, PartySummary, Penetration,
    PenetrationReport, WinnerReport,
};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five tracked parties.
///
/// Declaration order is significant: it is the order parties are reported
/// in, and it breaks ties when two parties poll the same votes in a booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Party {
    Dmk,
    Dmdk,
    Admk,
    Ijk,
    Ntk,
}

impl Party {
    /// Column name in `election_results`
    pub fn key(&self) -> &'static str {
        match self {
            Party::Dmk => "dravida_munnetra_kazhagam",
            Party::Dmdk => "desiya_murpokku_dravidar_kazhagam",
            Party::Admk => "all_india_anna_dravidar_munnetra_kazhagam",
            Party::Ijk => "indiya_jananayaka_katchi",
            Party::Ntk => "naam_tamilar_katchi",
        }
    }

    /// Short display label
    pub fn label(&self) -> &'static str {
        match self {
            Party::Dmk => "DMK",
            Party::Dmdk => "DMDK",
            Party::Admk => "ADMK",
            Party::Ijk => "IJK",
            Party::Ntk => "NTK",
        }
    }

    /// All tracked parties, in tie-break order
    pub fn all() -> &'static [Party] {
        &[Party::Dmk, Party::Dmdk, Party::Admk, Party::Ijk, Party::Ntk]
    }
}

impl FromStr for Party {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Party::all()
            .iter()
            .copied()
            .find(|p| p.key().eq_ignore_ascii_case(wanted) || p.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::Validation(format!("Unknown party: {}", s)))
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Vote tallies for one booth station.
///
/// Missing counts are stored as NULL and read back as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoothResult {
    pub booth_station: String,
    #[serde(rename = "dravida_munnetra_kazhagam")]
    pub dmk: u64,
    #[serde(rename = "desiya_murpokku_dravidar_kazhagam")]
    pub dmdk: u64,
    #[serde(rename = "all_india_anna_dravidar_munnetra_kazhagam")]
    pub admk: u64,
    #[serde(rename = "indiya_jananayaka_katchi")]
    pub ijk: u64,
    #[serde(rename = "naam_tamilar_katchi")]
    pub ntk: u64,
    pub total_valid_votes: u64,
    pub rejected_votes: u64,
    pub nota: u64,
    pub total_votes: u64,
}

impl BoothResult {
    pub fn new(booth_station: impl Into<String>) -> Self {
        Self {
            booth_station: booth_station.into(),
            ..Default::default()
        }
    }

    /// Votes polled by one party
    pub fn votes(&self, party: Party) -> u64 {
        match party {
            Party::Dmk => self.dmk,
            Party::Dmdk => self.dmdk,
            Party::Admk => self.admk,
            Party::Ijk => self.ijk,
            Party::Ntk => self.ntk,
        }
    }

    /// Set one party's votes
    pub fn with_votes(mut self, party: Party, votes: u64) -> Self {
        match party {
            Party::Dmk => self.dmk = votes,
            Party::Dmdk => self.dmdk = votes,
            Party::Admk => self.admk = votes,
            Party::Ijk => self.ijk = votes,
            Party::Ntk => self.ntk = votes,
        }
        self
    }

    pub fn with_total_valid(mut self, total_valid_votes: u64) -> Self {
        self.total_valid_votes = total_valid_votes;
        self
    }
}

//! Family linkage - grouping voters into households
//!
//! A family belongs to one booth and owns a set of member links. Each link
//! points at one voter; a voter is in at most one family at a time and its
//! `is_linked` flag mirrors that membership.
//!
//! Writes go through [`FamilyLinker`], which runs every multi-statement
//! change inside a single store transaction. Reads are plain joins on
//! [`SqliteStore`](crate::storage::SqliteStore).

pub mod linker;
pub mod queries;

pub use linker::FamilyLinker;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Party-support label used when a family is created without one
pub const DEFAULT_PARTY_SUPPORT: &str = "OTHERS";

/// Ids sent by the client as JSON numbers or numeric strings
mod lenient_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    fn parse<E: serde::de::Error>(raw: Raw) -> Result<i64, E> {
        match raw {
            Raw::Number(id) => Ok(id),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid id {:?}", text))),
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        parse(Raw::deserialize(deserializer)?)
    }

    /// Blank strings and `null` read as absent
    pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(raw) => parse(raw).map(Some),
        }
    }
}

/// A voter picked into a new family.
///
/// Name, age and gender are copied onto the member link as supplied by the
/// caller; they are not re-read from the voter record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedVoter {
    #[serde(deserialize_with = "lenient_id::required")]
    pub voter_id: i64,
    pub voter_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

impl SelectedVoter {
    pub fn new(voter_id: i64, voter_name: impl Into<String>) -> Self {
        Self {
            voter_id,
            voter_name: Some(voter_name.into()),
            age: None,
            gender: None,
        }
    }
}

/// Request to create a family together with its initial members
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFamily {
    #[serde(default, deserialize_with = "lenient_id::optional")]
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
    pub family_name: Option<String>,
    pub contact_no: Option<String>,
    pub caste_code: Option<String>,
    pub party_support: Option<String>,
    #[serde(default, deserialize_with = "lenient_id::optional")]
    pub panchayat_id: Option<i64>,
    #[serde(default)]
    pub selected_voters: Vec<SelectedVoter>,
}

impl NewFamily {
    pub fn new(booth_no: i64, family_name: impl Into<String>, voters: Vec<SelectedVoter>) -> Self {
        Self {
            booth_no: Some(booth_no),
            family_name: Some(family_name.into()),
            selected_voters: voters,
            ..Default::default()
        }
    }

    pub fn with_village(mut self, village_name: impl Into<String>) -> Self {
        self.village_name = Some(village_name.into());
        self
    }

    pub fn with_contact(mut self, contact_no: impl Into<String>) -> Self {
        self.contact_no = Some(contact_no.into());
        self
    }

    pub fn with_caste(mut self, caste_code: impl Into<String>) -> Self {
        self.caste_code = Some(caste_code.into());
        self
    }

    pub fn with_panchayat(mut self, panchayat_id: i64) -> Self {
        self.panchayat_id = Some(panchayat_id);
        self
    }

    /// Booth number and trimmed family name, or a validation error
    pub fn validate(&self) -> Result<(i64, &str)> {
        let name = self.family_name.as_deref().map(str::trim).unwrap_or("");
        let (Some(booth_no), false, false) = (self.booth_no, name.is_empty(), self.selected_voters.is_empty())
        else {
            return Err(Error::Validation("Missing required data".to_string()));
        };

        let mut seen = HashSet::new();
        if let Some(dup) = self.selected_voters.iter().find(|v| !seen.insert(v.voter_id)) {
            return Err(Error::Validation(format!(
                "Voter {} selected more than once",
                dup.voter_id
            )));
        }
        Ok((booth_no, name))
    }

    /// Party-support label, falling back to [`DEFAULT_PARTY_SUPPORT`]
    pub fn party_support(&self) -> &str {
        self.party_support
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_PARTY_SUPPORT)
    }
}

/// Outcome of a successful family creation
#[derive(Debug, Clone, Serialize)]
pub struct FamilyCreated {
    pub family_id: i64,
    pub members: usize,
    /// Selected voter ids that matched no voter record
    pub unmatched_voters: Vec<i64>,
}

/// Request to link one more voter to an existing family
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMember {
    #[serde(default, deserialize_with = "lenient_id::optional")]
    pub family_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id::optional")]
    pub voter_id: Option<i64>,
    pub voter_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

impl NewMember {
    pub fn new(family_id: i64, voter_id: i64) -> Self {
        Self {
            family_id: Some(family_id),
            voter_id: Some(voter_id),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FamilyFilter {
    pub panchayat_id: Option<i64>,
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
}

/// A family with its member count, for list views
#[derive(Debug, Clone, Serialize)]
pub struct FamilySummary {
    pub family_id: i64,
    pub family_name: String,
    pub contact_no: Option<String>,
    pub party_support: String,
    pub village_name: Option<String>,
    pub booth_no: i64,
    pub caste_name: Option<String>,
    pub panchayat_name: Option<String>,
    pub member_count: u64,
}

/// A family member joined to its voter record
#[derive(Debug, Clone, Serialize)]
pub struct FamilyMember {
    pub voter_id: i64,
    pub epic_no: Option<String>,
    pub voter_name: Option<String>,
    pub relative_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_booth_name_and_voters() {
        let ok = NewFamily::new(12, " Kumar ", vec![SelectedVoter::new(1, "A")]);
        assert_eq!(ok.validate().unwrap(), (12, "Kumar"));

        let mut no_booth = ok.clone();
        no_booth.booth_no = None;
        assert!(matches!(no_booth.validate(), Err(Error::Validation(_))));

        let blank_name = NewFamily::new(12, "  ", vec![SelectedVoter::new(1, "A")]);
        assert!(matches!(blank_name.validate(), Err(Error::Validation(_))));

        let no_voters = NewFamily::new(12, "Kumar", vec![]);
        assert!(matches!(no_voters.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_repeated_voter() {
        let family = NewFamily::new(
            1,
            "Kumar",
            vec![SelectedVoter::new(4, "A"), SelectedVoter::new(4, "A")],
        );
        assert!(matches!(family.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_ids_accept_numeric_strings() {
        let family: NewFamily = serde_json::from_value(serde_json::json!({
            "booth_no": "12",
            "family_name": "Kumar",
            "panchayat_id": "",
            "selected_voters": [{ "voter_id": " 7 " }, { "voter_id": 8 }]
        }))
        .unwrap();
        assert_eq!(family.booth_no, Some(12));
        assert_eq!(family.panchayat_id, None);
        let ids: Vec<i64> = family.selected_voters.iter().map(|v| v.voter_id).collect();
        assert_eq!(ids, vec![7, 8]);

        let member: NewMember =
            serde_json::from_value(serde_json::json!({ "family_id": "3", "voter_id": 9 })).unwrap();
        assert_eq!((member.family_id, member.voter_id), (Some(3), Some(9)));

        let bad = serde_json::from_value::<NewMember>(serde_json::json!({ "family_id": "three" }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_party_support_default() {
        let mut family = NewFamily::new(1, "Kumar", vec![SelectedVoter::new(1, "A")]);
        assert_eq!(family.party_support(), "OTHERS");
        family.party_support = Some("DMK".into());
        assert_eq!(family.party_support(), "DMK");
    }
}

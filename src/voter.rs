//! Voter roll types
//!
//! A voter is identified by its store id; `epic_no` is the external
//! registration id. `is_linked` records whether the voter currently belongs
//! to a family.

use serde::{Deserialize, Serialize};

/// Default page size for the unlinked-voter picker
pub const UNLINKED_PAGE_SIZE: u32 = 200;
/// Default page size for the full voter listing
pub const LISTING_PAGE_SIZE: u32 = 500;

/// A voter record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voter {
    pub id: i64,
    pub epic_no: Option<String>,
    pub name: String,
    pub relative_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub mobile_number: Option<String>,
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
    pub panchayat_id: Option<i64>,
    pub caste_code: Option<String>,
    pub linked_mobile: Option<String>,
    pub is_linked: bool,
}

/// A voter to insert (the roll itself is loaded by external tooling)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVoter {
    pub epic_no: Option<String>,
    pub name: String,
    pub relative_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub mobile_number: Option<String>,
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
    pub panchayat_id: Option<i64>,
    pub caste_code: Option<String>,
}

impl NewVoter {
    pub fn new(name: impl Into<String>, booth_no: i64) -> Self {
        Self {
            name: name.into(),
            booth_no: Some(booth_no),
            ..Default::default()
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_epic(mut self, epic_no: impl Into<String>) -> Self {
        self.epic_no = Some(epic_no.into());
        self
    }

    pub fn with_village(mut self, village_name: impl Into<String>) -> Self {
        self.village_name = Some(village_name.into());
        self
    }
}

/// Search over the unlinked voters of one booth
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnlinkedQuery {
    pub booth_no: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Filters for the full voter listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoterFilter {
    pub panchayat_id: Option<i64>,
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
    pub name: Option<String>,
    pub relative_name: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Row of the full voter listing, joined to its panchayat name
#[derive(Debug, Clone, Serialize)]
pub struct VoterListing {
    pub id: i64,
    pub epic_no: Option<String>,
    pub name: String,
    pub relative_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub mobile_number: Option<String>,
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
    pub panchayat_name: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page as u64)
        };
        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Resolve `(page, limit, offset)` from optional request values
pub fn paging(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.filter(|l| *l > 0).unwrap_or(default_limit);
    let offset = (page as u64 - 1) * limit as u64;
    (page, limit, offset)
}

/// Filters for the demographic summary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryFilter {
    pub booth_no: Option<i64>,
    pub panchayat_id: Option<i64>,
    pub village_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderCount {
    pub gender: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgeGroups {
    pub age_18_25: u64,
    pub age_26_50: u64,
    pub age_51_75: u64,
    pub age_75_plus: u64,
}

/// Gender and age-band breakdown of a slice of the roll
#[derive(Debug, Clone, Serialize)]
pub struct VoterSummary {
    pub gender: Vec<GenderCount>,
    #[serde(rename = "ageGroups")]
    pub age_groups: AgeGroups,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_defaults() {
        assert_eq!(paging(None, None, 200), (1, 200, 0));
        assert_eq!(paging(Some(3), Some(50), 200), (3, 50, 100));
        assert_eq!(paging(Some(0), Some(0), 500), (1, 500, 0));
    }

    #[test]
    fn test_page_counts() {
        let page: Page<u8> = Page::new(vec![], 401, 1, 200);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(vec![], 0, 1, 200);
        assert_eq!(empty.total_pages, 0);
    }
}

//! Master data and office records
//!
//! Panchayats, booths, villages and castes are lookup tables. Events,
//! visitors, the party leadership roster, users and the message log are
//! plain records with no cross-table invariants.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation(message.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct Panchayat {
    pub panchayat_id: i64,
    pub panchayat_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPanchayat {
    pub panchayat_name: Option<String>,
}

impl NewPanchayat {
    pub fn validate(&self) -> Result<&str> {
        required(&self.panchayat_name, "Panchayat name required")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Booth {
    pub booth_id: i64,
    pub booth_no: i64,
    pub panchayat_id: Option<i64>,
    pub total_villages: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBooth {
    pub booth_no: Option<i64>,
    pub panchayat_id: Option<i64>,
    pub total_villages: Option<i64>,
}

impl NewBooth {
    pub fn validate(&self) -> Result<i64> {
        self.booth_no
            .ok_or_else(|| Error::Validation("Booth number required".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Village {
    pub village_id: i64,
    pub village_name: String,
    pub booth_no: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVillage {
    pub booth_no: Option<i64>,
    pub village_name: Option<String>,
}

impl NewVillage {
    pub fn validate(&self) -> Result<(i64, &str)> {
        match (self.booth_no, required(&self.village_name, "")) {
            (Some(booth_no), Ok(name)) => Ok((booth_no, name)),
            _ => Err(Error::Validation("Booth No & Village Name required".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Caste {
    pub caste_id: i64,
    pub caste_name: String,
    pub caste_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCaste {
    pub caste_name: Option<String>,
    pub caste_code: Option<String>,
}

impl NewCaste {
    pub fn new(caste_name: impl Into<String>, caste_code: Option<&str>) -> Self {
        Self {
            caste_name: Some(caste_name.into()),
            caste_code: caste_code.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<&str> {
        required(&self.caste_name, "Caste name required")
    }
}

/// A constituency event (wedding, function, meeting) to attend
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub native_place: Option<String>,
    pub mobile: Option<String>,
    pub panchayat: Option<String>,
    pub event_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    pub name: Option<String>,
    pub native_place: Option<String>,
    pub mobile: Option<String>,
    pub panchayat: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(&str, NaiveDate)> {
        match (required(&self.name, ""), self.event_date) {
            (Ok(name), Some(date)) => Ok((name, date)),
            _ => Err(Error::Validation("Name and Event Date are required".to_string())),
        }
    }
}

/// An entry in the office visitor log
#[derive(Debug, Clone, Serialize)]
pub struct Visitor {
    pub id: i64,
    pub name: String,
    pub native_place: Option<String>,
    pub village: Option<String>,
    pub mobile: String,
    pub visit_date: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVisitor {
    pub name: Option<String>,
    pub native_place: Option<String>,
    pub village: Option<String>,
    pub mobile: Option<String>,
}

impl NewVisitor {
    pub fn validate(&self) -> Result<(&str, &str)> {
        match (required(&self.name, ""), required(&self.mobile, "")) {
            (Ok(name), Ok(mobile)) => Ok((name, mobile)),
            _ => Err(Error::Validation("Name and Mobile required".to_string())),
        }
    }
}

/// A row of the party leadership roster
#[derive(Debug, Clone, Serialize)]
pub struct Leader {
    pub s_no: i64,
    pub union_name: Option<String>,
    pub panchayat_name: Option<String>,
    pub branch_name: Option<String>,
    pub leader_name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderInput {
    pub union_name: Option<String>,
    pub panchayat_name: Option<String>,
    pub branch_name: Option<String>,
    pub leader_name: Option<String>,
    pub phone_number: Option<String>,
}

impl LeaderInput {
    pub fn validate(&self) -> Result<(&str, &str)> {
        match (required(&self.leader_name, ""), required(&self.phone_number, "")) {
            (Ok(name), Ok(phone)) => Ok((name, phone)),
            _ => Err(Error::Validation("Name and phone number required".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderFilter {
    pub union_name: Option<String>,
    pub panchayat_name: Option<String>,
    pub branch_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn validate(&self) -> Result<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
            _ => Err(Error::Validation("Username and password required".to_string())),
        }
    }
}

/// A greeting queued to a list of phone numbers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WishMessage {
    pub recipients: Option<Vec<String>>,
    pub message: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "sentBy")]
    pub sent_by: Option<String>,
}

impl WishMessage {
    pub fn validate(&self) -> Result<(&[String], &str)> {
        match (self.recipients.as_deref(), required(&self.message, "")) {
            (Some(recipients), Ok(message)) => Ok((recipients, message)),
            _ => Err(Error::Validation("Recipients and message required".to_string())),
        }
    }

    pub fn sender(&self) -> &str {
        self.sent_by.as_deref().filter(|s| !s.is_empty()).unwrap_or("System")
    }
}

/// Per-recipient outcome of logging a wish message
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub phone: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        assert!(NewPanchayat::default().validate().is_err());
        assert!(NewBooth::default().validate().is_err());
        assert!(
            NewVillage {
                booth_no: Some(1),
                village_name: Some("  ".into())
            }
            .validate()
            .is_err()
        );
        assert!(NewEvent {
            name: Some("Wedding".into()),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(NewVisitor {
            name: Some("Ravi".into()),
            mobile: Some("98".into()),
            ..Default::default()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_wish_sender_default() {
        let wish = WishMessage {
            recipients: Some(vec!["1".into()]),
            message: Some("Happy Pongal".into()),
            ..Default::default()
        };
        assert_eq!(wish.sender(), "System");
        assert_eq!(wish.validate().unwrap().0.len(), 1);
    }

    #[test]
    fn test_event_date_deserializes() {
        let event: NewEvent =
            serde_json::from_str(r#"{"name":"Temple festival","event_date":"2026-01-14"}"#).unwrap();
        let (_, date) = event.validate().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 14).unwrap());
    }
}

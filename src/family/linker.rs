//! Transactional family writes
//!
//! Every operation here opens one transaction on the store connection,
//! taking the write lock at BEGIN so concurrent writers on other pooled
//! connections wait on the busy timeout instead of failing. Returning early with an error drops the transaction, which rolls back
//! every statement already executed in it.

use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};

use super::{FamilyCreated, NewFamily, NewMember};
use crate::storage::SqliteStore;
use crate::{Error, Result};

const DUPLICATE_FAMILY: &str = "Family name already exists in this booth!";

/// Creates, dissolves and edits families while keeping voter link flags in step
pub struct FamilyLinker<'a> {
    store: &'a mut SqliteStore,
}

impl<'a> FamilyLinker<'a> {
    pub fn new(store: &'a mut SqliteStore) -> Self {
        Self { store }
    }

    fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .store
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Create a family with its initial members.
    ///
    /// Household attributes (caste, village, panchayat, contact) are copied
    /// onto every member voter. A selected id with no voter record is logged
    /// and reported back, but does not abort the creation.
    pub fn create_family(&mut self, family: &NewFamily) -> Result<FamilyCreated> {
        let (booth_no, family_name) = family.validate()?;
        let tx = self.begin()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM families WHERE booth_no = ?1 AND family_name = ?2",
            params![booth_no, family_name],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::Conflict(DUPLICATE_FAMILY.to_string()));
        }

        for voter in &family.selected_voters {
            if let Some(other) = member_family(&tx, voter.voter_id)? {
                return Err(Error::Conflict(format!(
                    "Voter {} already belongs to family {}",
                    voter.voter_id, other
                )));
            }
        }

        tx.execute(
            r#"
            INSERT INTO families (booth_no, village_name, family_name, contact_no, caste_code, party_support, panchayat_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                booth_no,
                family.village_name,
                family_name,
                family.contact_no,
                family.caste_code,
                family.party_support(),
                family.panchayat_id,
            ],
        )
        .map_err(|e| conflict_on_unique(e.into(), DUPLICATE_FAMILY))?;
        let family_id = tx.last_insert_rowid();

        let mut unmatched_voters = Vec::new();
        for voter in &family.selected_voters {
            tx.execute(
                "INSERT INTO family_members (family_id, voter_id, voter_name, age, gender) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![family_id, voter.voter_id, voter.voter_name, voter.age, voter.gender],
            )?;

            let updated = tx.execute(
                r#"
                UPDATE voters
                SET is_linked = 1, caste_code = ?1, village_name = ?2, panchayat_id = ?3, linked_mobile = ?4
                WHERE id = ?5
                "#,
                params![
                    family.caste_code,
                    family.village_name,
                    family.panchayat_id,
                    family.contact_no,
                    voter.voter_id,
                ],
            )?;
            if updated == 0 {
                tracing::warn!(voter_id = voter.voter_id, family_id, "No voter updated for selected id");
                unmatched_voters.push(voter.voter_id);
            }
        }

        tx.commit()?;
        tracing::info!(
            family_id,
            booth_no,
            members = family.selected_voters.len(),
            "Created family {}",
            family_name
        );

        Ok(FamilyCreated {
            family_id,
            members: family.selected_voters.len(),
            unmatched_voters,
        })
    }

    /// Dissolve a family: unlink its voters, then remove links and the family.
    ///
    /// Returns the number of voters unlinked.
    pub fn delete_family(&mut self, family_id: i64) -> Result<usize> {
        let tx = self.begin()?;

        let found: Option<i64> = tx
            .query_row(
                "SELECT family_id FROM families WHERE family_id = ?1",
                [family_id],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(Error::NotFound("Family not found".to_string()));
        }

        let voter_ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT voter_id FROM family_members WHERE family_id = ?1")?;
            let ids = stmt
                .query_map([family_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        };

        for voter_id in &voter_ids {
            tx.execute("UPDATE voters SET is_linked = 0 WHERE id = ?1", [voter_id])?;
        }
        tx.execute("DELETE FROM family_members WHERE family_id = ?1", [family_id])?;
        tx.execute("DELETE FROM families WHERE family_id = ?1", [family_id])?;

        tx.commit()?;
        tracing::info!(family_id, unlinked = voter_ids.len(), "Deleted family");
        Ok(voter_ids.len())
    }

    /// Unlink one voter from whichever family holds it; returns that family id
    pub fn remove_member(&mut self, voter_id: i64) -> Result<i64> {
        let tx = self.begin()?;

        let family_id = member_family(&tx, voter_id)?
            .ok_or_else(|| Error::NotFound("Member not found".to_string()))?;

        tx.execute("DELETE FROM family_members WHERE voter_id = ?1", [voter_id])?;
        tx.execute("UPDATE voters SET is_linked = 0 WHERE id = ?1", [voter_id])?;

        tx.commit()?;
        tracing::info!(family_id, voter_id, "Removed family member");
        Ok(family_id)
    }

    /// Link one more voter to an existing family.
    ///
    /// A voter that already belongs to a family is rejected with a conflict.
    pub fn add_member(&mut self, member: &NewMember) -> Result<()> {
        let (Some(family_id), Some(voter_id)) = (member.family_id, member.voter_id) else {
            return Err(Error::Validation("Family id and voter id required".to_string()));
        };
        let tx = self.begin()?;

        let family: Option<i64> = tx
            .query_row(
                "SELECT family_id FROM families WHERE family_id = ?1",
                [family_id],
                |row| row.get(0),
            )
            .optional()?;
        if family.is_none() {
            return Err(Error::NotFound("Family not found".to_string()));
        }

        if let Some(other) = member_family(&tx, voter_id)? {
            return Err(Error::Conflict(format!(
                "Voter {} already belongs to family {}",
                voter_id, other
            )));
        }

        tx.execute(
            "INSERT INTO family_members (family_id, voter_id, voter_name, age, gender) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![family_id, voter_id, member.voter_name, member.age, member.gender],
        )
        .map_err(|e| conflict_on_unique(e.into(), "Voter already belongs to a family"))?;

        let updated = tx.execute("UPDATE voters SET is_linked = 1 WHERE id = ?1", [voter_id])?;
        if updated == 0 {
            tracing::warn!(voter_id, family_id, "No voter updated for added member");
        }

        tx.commit()?;
        tracing::info!(family_id, voter_id, "Added family member");
        Ok(())
    }
}

/// Family currently holding `voter_id`, if any
fn member_family(tx: &Transaction<'_>, voter_id: i64) -> Result<Option<i64>> {
    tx.query_row(
        "SELECT family_id FROM family_members WHERE voter_id = ?1",
        [voter_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

/// A UNIQUE violation means another writer got there first
fn conflict_on_unique(err: Error, message: &str) -> Error {
    if err.is_unique_violation() {
        Error::Conflict(message.to_string())
    } else {
        err
    }
}

//! Family read models

use rusqlite::params_from_iter;
use rusqlite::types::Value;

use super::{FamilyFilter, FamilyMember, FamilySummary};
use crate::Result;
use crate::storage::SqliteStore;

impl SqliteStore {
    /// Families with member counts, ordered by family name.
    ///
    /// A family without its own panchayat takes the one of its booth.
    pub fn list_families(&self, filter: &FamilyFilter) -> Result<Vec<FamilySummary>> {
        let mut sql = String::from(
            r#"
            SELECT f.family_id, f.family_name, f.contact_no, f.party_support,
                   f.village_name, f.booth_no, c.caste_name, p.panchayat_name,
                   COUNT(DISTINCT m.voter_id) AS member_count
            FROM families f
            LEFT JOIN family_members m ON f.family_id = m.family_id
            LEFT JOIN castes c ON f.caste_code = c.caste_code
            LEFT JOIN booths b ON f.booth_no = b.booth_no
            LEFT JOIN panchayats p ON COALESCE(f.panchayat_id, b.panchayat_id) = p.panchayat_id
            WHERE 1=1
            "#,
        );
        let mut args: Vec<Value> = Vec::new();

        if let Some(panchayat_id) = filter.panchayat_id {
            sql.push_str(" AND COALESCE(f.panchayat_id, b.panchayat_id) = ?");
            args.push(Value::Integer(panchayat_id));
        }
        if let Some(booth_no) = filter.booth_no {
            sql.push_str(" AND f.booth_no = ?");
            args.push(Value::Integer(booth_no));
        }
        if let Some(village) = filter.village_name.as_deref().filter(|v| !v.is_empty()) {
            sql.push_str(" AND f.village_name = ?");
            args.push(Value::Text(village.to_string()));
        }
        sql.push_str(" GROUP BY f.family_id ORDER BY f.family_name ASC");

        let mut stmt = self.conn().prepare(&sql)?;
        let families = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(FamilySummary {
                    family_id: row.get(0)?,
                    family_name: row.get(1)?,
                    contact_no: row.get(2)?,
                    party_support: row.get(3)?,
                    village_name: row.get(4)?,
                    booth_no: row.get(5)?,
                    caste_name: row.get(6)?,
                    panchayat_name: row.get(7)?,
                    member_count: row.get::<_, i64>(8)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(families)
    }

    /// Members of a family, ordered by voter name.
    ///
    /// Falls back to the name copied onto the link when the voter record is gone.
    pub fn family_members(&self, family_id: i64) -> Result<Vec<FamilyMember>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT fm.voter_id, v.epic_no, COALESCE(v.name, fm.voter_name) AS voter_name,
                   v.relative_name, COALESCE(v.age, fm.age), COALESCE(v.gender, fm.gender)
            FROM family_members fm
            LEFT JOIN voters v ON fm.voter_id = v.id
            WHERE fm.family_id = ?1
            ORDER BY voter_name ASC
            "#,
        )?;

        let members = stmt
            .query_map([family_id], |row| {
                Ok(FamilyMember {
                    voter_id: row.get(0)?,
                    epic_no: row.get(1)?,
                    voter_name: row.get(2)?,
                    relative_name: row.get(3)?,
                    age: row.get(4)?,
                    gender: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(family_id, count = members.len(), "Loaded family members");
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use crate::family::{FamilyFilter, FamilyLinker, NewFamily, SelectedVoter};
    use crate::records::{NewBooth, NewCaste};
    use crate::storage::SqliteStore;
    use crate::voter::NewVoter;

    #[test]
    fn test_list_families_with_counts_and_names() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.add_caste(&NewCaste::new("Backward Class", Some("BC"))).unwrap();
        let panchayat_id = store.add_panchayat("Alangulam").unwrap();

        let a = store.insert_voter(&NewVoter::new("Zara", 1)).unwrap();
        let b = store.insert_voter(&NewVoter::new("Anbu", 1)).unwrap();
        let c = store.insert_voter(&NewVoter::new("Meena", 2)).unwrap();

        let mut linker = FamilyLinker::new(&mut store);
        linker
            .create_family(
                &NewFamily::new(1, "Velu", vec![SelectedVoter::new(a, "Zara"), SelectedVoter::new(b, "Anbu")])
                    .with_caste("BC")
                    .with_panchayat(panchayat_id),
            )
            .unwrap();
        linker
            .create_family(&NewFamily::new(2, "Arul", vec![SelectedVoter::new(c, "Meena")]))
            .unwrap();

        let all = store.list_families(&FamilyFilter::default()).unwrap();
        let names: Vec<&str> = all.iter().map(|f| f.family_name.as_str()).collect();
        assert_eq!(names, vec!["Arul", "Velu"]);
        assert_eq!(all[1].member_count, 2);
        assert_eq!(all[1].caste_name.as_deref(), Some("Backward Class"));
        assert_eq!(all[1].panchayat_name.as_deref(), Some("Alangulam"));
        assert_eq!(all[0].party_support, "OTHERS");

        let booth_one = store
            .list_families(&FamilyFilter {
                booth_no: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(booth_one.len(), 1);

        let members = store.family_members(all[1].family_id).unwrap();
        let names: Vec<_> = members.iter().map(|m| m.voter_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Anbu", "Zara"]);
    }

    #[test]
    fn test_family_takes_panchayat_from_booth() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let panchayat_id = store.add_panchayat("Pavoor").unwrap();
        store
            .add_booth(&NewBooth {
                booth_no: Some(7),
                panchayat_id: Some(panchayat_id),
                total_villages: Some(2),
            })
            .unwrap();
        let voter = store.insert_voter(&NewVoter::new("Kani", 7)).unwrap();

        FamilyLinker::new(&mut store)
            .create_family(&NewFamily::new(7, "Raman", vec![SelectedVoter::new(voter, "Kani")]))
            .unwrap();

        let filtered = store
            .list_families(&FamilyFilter {
                panchayat_id: Some(panchayat_id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].panchayat_name.as_deref(), Some("Pavoor"));
    }
}

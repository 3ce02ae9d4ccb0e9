//! Master data and office record operations

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};

use super::SqliteStore;
use crate::Result;
use crate::records::{
    Booth, Caste, Event, Leader, LeaderFilter, LeaderInput, NewBooth, NewCaste, NewEvent,
    NewVillage, NewVisitor, Panchayat, User, Village, Visitor,
};

impl SqliteStore {
    // ========== Master Data ==========

    /// Insert a panchayat if absent; returns its id either way
    pub fn add_panchayat(&self, name: &str) -> Result<i64> {
        self.conn().execute(
            "INSERT OR IGNORE INTO panchayats (panchayat_name) VALUES (?1)",
            [name],
        )?;
        let id = self.conn().query_row(
            "SELECT panchayat_id FROM panchayats WHERE panchayat_name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn list_panchayats(&self) -> Result<Vec<Panchayat>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT panchayat_id, panchayat_name FROM panchayats ORDER BY panchayat_name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Panchayat {
                    panchayat_id: row.get(0)?,
                    panchayat_name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Insert a booth if its number is new
    pub fn add_booth(&self, booth: &NewBooth) -> Result<()> {
        let booth_no = booth.validate()?;
        self.conn().execute(
            "INSERT OR IGNORE INTO booths (booth_no, panchayat_id, total_villages) VALUES (?1, ?2, ?3)",
            params![booth_no, booth.panchayat_id, booth.total_villages.unwrap_or(0)],
        )?;
        Ok(())
    }

    pub fn list_booths(&self, panchayat_id: Option<i64>) -> Result<Vec<Booth>> {
        let mut sql = String::from(
            "SELECT booth_id, booth_no, panchayat_id, total_villages FROM booths WHERE 1=1",
        );
        let mut args = Vec::new();
        if let Some(id) = panchayat_id {
            sql.push_str(" AND panchayat_id = ?");
            args.push(Value::Integer(id));
        }
        sql.push_str(" ORDER BY booth_no ASC");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(Booth {
                    booth_id: row.get(0)?,
                    booth_no: row.get(1)?,
                    panchayat_id: row.get(2)?,
                    total_villages: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn add_village(&self, village: &NewVillage) -> Result<()> {
        let (booth_no, name) = village.validate()?;
        self.conn().execute(
            "INSERT OR IGNORE INTO villages (booth_no, village_name) VALUES (?1, ?2)",
            params![booth_no, name],
        )?;
        Ok(())
    }

    pub fn villages_in_booth(&self, booth_no: i64) -> Result<Vec<Village>> {
        let mut stmt = self.conn().prepare(
            "SELECT village_id, village_name, booth_no FROM villages WHERE booth_no = ?1 ORDER BY village_name",
        )?;
        let rows = stmt
            .query_map([booth_no], |row| {
                Ok(Village {
                    village_id: row.get(0)?,
                    village_name: row.get(1)?,
                    booth_no: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn add_caste(&self, caste: &NewCaste) -> Result<()> {
        let name = caste.validate()?;
        self.conn().execute(
            "INSERT OR IGNORE INTO castes (caste_name, caste_code) VALUES (?1, ?2)",
            params![name, caste.caste_code],
        )?;
        Ok(())
    }

    pub fn list_castes(&self) -> Result<Vec<Caste>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT caste_id, caste_name, caste_code FROM castes ORDER BY caste_name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Caste {
                    caste_id: row.get(0)?,
                    caste_name: row.get(1)?,
                    caste_code: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========== Events ==========

    pub fn add_event(&self, event: &NewEvent) -> Result<i64> {
        let (name, date) = event.validate()?;
        self.conn().execute(
            r#"
            INSERT INTO events (name, native_place, mobile, panchayat, event_date, description)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![name, event.native_place, event.mobile, event.panchayat, date, event.description],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Events dated within `[from, to]`, soonest first
    pub fn events_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        self.query_events(
            "SELECT id, name, native_place, mobile, panchayat, event_date, description FROM events \
             WHERE event_date BETWEEN ?1 AND ?2 ORDER BY event_date ASC",
            params![from, to],
        )
    }

    /// Every event, latest first
    pub fn all_events(&self) -> Result<Vec<Event>> {
        self.query_events(
            "SELECT id, name, native_place, mobile, panchayat, event_date, description FROM events \
             ORDER BY event_date DESC",
            [],
        )
    }

    fn query_events(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok(Event {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    native_place: row.get(2)?,
                    mobile: row.get(3)?,
                    panchayat: row.get(4)?,
                    event_date: row.get(5)?,
                    description: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_event(&self, id: i64) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM events WHERE id = ?1", [id])?)
    }

    // ========== Visitors ==========

    pub fn add_visitor(&self, visitor: &NewVisitor, at: NaiveDateTime) -> Result<i64> {
        let (name, mobile) = visitor.validate()?;
        self.conn().execute(
            "INSERT INTO visitors (name, native_place, village, mobile, visit_date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, visitor.native_place, visitor.village, mobile, at],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Visitor log, latest visit first
    pub fn list_visitors(&self) -> Result<Vec<Visitor>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, native_place, village, mobile, visit_date FROM visitors ORDER BY visit_date DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Visitor {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    native_place: row.get(2)?,
                    village: row.get(3)?,
                    mobile: row.get(4)?,
                    visit_date: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_visitor(&self, id: i64) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM visitors WHERE id = ?1", [id])?)
    }

    // ========== Party Leadership ==========

    /// Leadership roster ordered by serial number, optionally filtered
    pub fn list_leaders(&self, filter: &LeaderFilter) -> Result<Vec<Leader>> {
        let mut sql = String::from(
            "SELECT s_no, union_name, panchayat_name, branch_name, leader_name, phone_number \
             FROM party_leadership WHERE 1=1",
        );
        let mut args = Vec::new();
        for (column, value) in [
            ("union_name", &filter.union_name),
            ("panchayat_name", &filter.panchayat_name),
            ("branch_name", &filter.branch_name),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                sql.push_str(&format!(" AND {} = ?", column));
                args.push(Value::Text(v.to_string()));
            }
        }
        sql.push_str(" ORDER BY s_no ASC");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(Leader {
                    s_no: row.get(0)?,
                    union_name: row.get(1)?,
                    panchayat_name: row.get(2)?,
                    branch_name: row.get(3)?,
                    leader_name: row.get(4)?,
                    phone_number: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn add_leader(&self, leader: &LeaderInput) -> Result<i64> {
        let (name, phone) = leader.validate()?;
        self.conn().execute(
            r#"
            INSERT INTO party_leadership (union_name, panchayat_name, branch_name, leader_name, phone_number)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![leader.union_name, leader.panchayat_name, leader.branch_name, name, phone],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Overwrite a roster row; returns rows affected
    pub fn update_leader(&self, s_no: i64, leader: &LeaderInput) -> Result<usize> {
        let (name, phone) = leader.validate()?;
        let n = self.conn().execute(
            r#"
            UPDATE party_leadership
            SET union_name = ?1, panchayat_name = ?2, branch_name = ?3, leader_name = ?4, phone_number = ?5
            WHERE s_no = ?6
            "#,
            params![leader.union_name, leader.panchayat_name, leader.branch_name, name, phone, s_no],
        )?;
        Ok(n)
    }

    pub fn delete_leader(&self, s_no: i64) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM party_leadership WHERE s_no = ?1", [s_no])?)
    }

    /// Insert roster rows in one transaction, as-is (imports keep blank names)
    pub fn insert_leaders(&self, leaders: &[LeaderInput]) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO party_leadership (union_name, panchayat_name, branch_name, leader_name, phone_number) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for l in leaders {
                stmt.execute(params![
                    l.union_name,
                    l.panchayat_name,
                    l.branch_name,
                    l.leader_name.as_deref().unwrap_or(""),
                    l.phone_number.as_deref().unwrap_or(""),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn clear_leaders(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM party_leadership", [])?)
    }

    // ========== Users & Messages ==========

    pub fn add_user(&self, username: &str, password: &str, role: &str) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3)",
            params![username, password, role],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// User matching both username and password
    pub fn find_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, username, role FROM users WHERE username = ?1 AND password = ?2",
                [username, password],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        role: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Record one outgoing wish-portal message
    pub fn log_message(&self, phone: &str, message: &str, image_url: Option<&str>, sent_by: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO message_log (phone, message, image_url, source, status, sent_by) \
             VALUES (?1, ?2, ?3, 'wish_portal', 'logged', ?4)",
            params![phone, message, image_url, sent_by],
        )?;
        Ok(())
    }

    pub fn count_messages(&self) -> Result<usize> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM message_log", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_masters_are_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.add_panchayat("Alangulam").unwrap();
        assert_eq!(store.add_panchayat("Alangulam").unwrap(), a);
        store.add_panchayat("Ambur").unwrap();
        assert_eq!(store.list_panchayats().unwrap().len(), 2);

        let booth = NewBooth {
            booth_no: Some(12),
            panchayat_id: Some(a),
            total_villages: None,
        };
        store.add_booth(&booth).unwrap();
        store.add_booth(&booth).unwrap();
        assert_eq!(store.list_booths(Some(a)).unwrap().len(), 1);
        assert!(store.list_booths(Some(a + 1)).unwrap().is_empty());

        store
            .add_village(&NewVillage {
                booth_no: Some(12),
                village_name: Some("Kadayam".into()),
            })
            .unwrap();
        assert_eq!(store.villages_in_booth(12).unwrap()[0].village_name, "Kadayam");

        assert!(matches!(store.add_caste(&NewCaste::default()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_events_window() {
        let store = SqliteStore::open_in_memory().unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2026, 10, d).unwrap();
        for (name, d) in [("Wedding", 17), ("Funeral", 18), ("Meeting", 25)] {
            store
                .add_event(&NewEvent {
                    name: Some(name.into()),
                    event_date: Some(day(d)),
                    ..Default::default()
                })
                .unwrap();
        }

        let soon = store.events_between(day(17), day(18)).unwrap();
        assert_eq!(soon.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["Wedding", "Funeral"]);
        assert_eq!(store.all_events().unwrap()[0].name, "Meeting");
        assert_eq!(store.delete_event(soon[0].id).unwrap(), 1);
        assert_eq!(store.all_events().unwrap().len(), 2);
    }

    #[test]
    fn test_leadership_roster() {
        let store = SqliteStore::open_in_memory().unwrap();
        let leader = LeaderInput {
            union_name: Some("Kadayam".into()),
            leader_name: Some("Murugan".into()),
            phone_number: Some("9000000002".into()),
            ..Default::default()
        };
        let s_no = store.add_leader(&leader).unwrap();
        store
            .add_leader(&LeaderInput {
                union_name: Some("Alangulam".into()),
                ..leader.clone()
            })
            .unwrap();

        let filter = LeaderFilter {
            union_name: Some("Kadayam".into()),
            ..Default::default()
        };
        assert_eq!(store.list_leaders(&filter).unwrap().len(), 1);

        let renamed = LeaderInput {
            leader_name: Some("Selvam".into()),
            ..leader
        };
        assert_eq!(store.update_leader(s_no, &renamed).unwrap(), 1);
        assert_eq!(store.list_leaders(&filter).unwrap()[0].leader_name, "Selvam");
        assert_eq!(store.delete_leader(s_no).unwrap(), 1);
        assert_eq!(store.list_leaders(&LeaderFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_find_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_user("admin", "secret", "admin").unwrap();
        assert_eq!(store.find_user("admin", "secret").unwrap().unwrap().role, "admin");
        assert!(store.find_user("admin", "wrong").unwrap().is_none());
    }
}

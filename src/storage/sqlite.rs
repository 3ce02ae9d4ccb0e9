//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::schema;
use crate::Result;
use crate::election::BoothResult;
use crate::voter::{
    AgeGroups, GenderCount, LISTING_PAGE_SIZE, NewVoter, Page, SummaryFilter, UNLINKED_PAGE_SIZE,
    UnlinkedQuery, Voter, VoterFilter, VoterListing, VoterSummary, paging,
};

const VOTER_COLUMNS: &str = "id, epic_no, name, relative_name, age, gender, mobile_number, booth_no, \
                             village_name, panchayat_id, caste_code, linked_mobile, is_linked";

const RESULT_COLUMNS: &str = "booth_station, dravida_munnetra_kazhagam, desiya_murpokku_dravidar_kazhagam, \
                              all_india_anna_dravidar_munnetra_kazhagam, indiya_jananayaka_katchi, \
                              naam_tamilar_katchi, total_valid_votes, rejected_votes, nota, total_votes";

/// SQLite-backed storage for constituency data
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a database file with a busy timeout for contended writes
    /// and WAL journaling so pooled readers don't block the writer
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "Opened pooled connection");

        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ========== Voter Operations ==========

    /// Insert a voter, returning its id
    pub fn insert_voter(&self, voter: &NewVoter) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO voters (epic_no, name, relative_name, age, gender, mobile_number, booth_no, village_name, panchayat_id, caste_code)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                voter.epic_no,
                voter.name,
                voter.relative_name,
                voter.age,
                voter.gender,
                voter.mobile_number,
                voter.booth_no,
                voter.village_name,
                voter.panchayat_id,
                voter.caste_code,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a voter by id
    pub fn get_voter(&self, id: i64) -> Result<Option<Voter>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM voters WHERE id = ?1", VOTER_COLUMNS),
                [id],
                row_to_voter,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Unlinked voters of one booth, optionally narrowed by a search term
    /// over name, EPIC number and relative name
    pub fn unlinked_voters(&self, booth_no: i64, query: &UnlinkedQuery) -> Result<Page<Voter>> {
        let (page, limit, offset) = paging(query.page, query.limit, UNLINKED_PAGE_SIZE);

        let mut clause = String::from("WHERE booth_no = ? AND is_linked = 0");
        let mut args = vec![Value::Integer(booth_no)];
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clause.push_str(
                " AND (LOWER(name) LIKE LOWER(?) OR LOWER(epic_no) LIKE LOWER(?) OR LOWER(relative_name) LIKE LOWER(?))",
            );
            let pattern = format!("%{}%", search);
            args.extend(std::iter::repeat_n(Value::Text(pattern), 3));
        }

        let total = self.count_where("SELECT COUNT(*) FROM voters", &clause, &args)?;

        let sql = format!(
            "SELECT {} FROM voters {} ORDER BY id ASC LIMIT ? OFFSET ?",
            VOTER_COLUMNS, clause
        );
        let mut paged = args;
        paged.push(Value::Integer(limit as i64));
        paged.push(Value::Integer(offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let voters = stmt
            .query_map(params_from_iter(paged), row_to_voter)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(voters, total, page, limit))
    }

    /// Full voter listing with optional filters, joined to panchayat names
    pub fn list_voters(&self, filter: &VoterFilter) -> Result<Page<VoterListing>> {
        let (page, limit, offset) = paging(filter.page, filter.limit, LISTING_PAGE_SIZE);

        let mut conditions = Vec::new();
        let mut args = Vec::new();
        if let Some(panchayat_id) = filter.panchayat_id {
            conditions.push("v.panchayat_id = ?");
            args.push(Value::Integer(panchayat_id));
        }
        if let Some(booth_no) = filter.booth_no {
            conditions.push("v.booth_no = ?");
            args.push(Value::Integer(booth_no));
        }
        if let Some(village) = non_empty(&filter.village_name) {
            conditions.push("v.village_name = ?");
            args.push(Value::Text(village.to_string()));
        }
        if let Some(name) = non_empty(&filter.name) {
            conditions.push("LOWER(v.name) LIKE LOWER(?)");
            args.push(Value::Text(format!("%{}%", name)));
        }
        if let Some(relative) = non_empty(&filter.relative_name) {
            conditions.push("LOWER(v.relative_name) LIKE LOWER(?)");
            args.push(Value::Text(format!("%{}%", relative)));
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let total = self.count_where("SELECT COUNT(*) FROM voters v", &clause, &args)?;

        let sql = format!(
            r#"
            SELECT v.id, v.epic_no, v.name, v.relative_name, v.age, v.gender, v.mobile_number,
                   v.booth_no, v.village_name, p.panchayat_name
            FROM voters v
            LEFT JOIN panchayats p ON v.panchayat_id = p.panchayat_id
            {}
            ORDER BY v.id ASC
            LIMIT ? OFFSET ?
            "#,
            clause
        );
        let mut paged = args;
        paged.push(Value::Integer(limit as i64));
        paged.push(Value::Integer(offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(paged), |row| {
                Ok(VoterListing {
                    id: row.get(0)?,
                    epic_no: row.get(1)?,
                    name: row.get(2)?,
                    relative_name: row.get(3)?,
                    age: row.get(4)?,
                    gender: row.get(5)?,
                    mobile_number: row.get(6)?,
                    booth_no: row.get(7)?,
                    village_name: row.get(8)?,
                    panchayat_name: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(rows, total, page, limit))
    }

    /// Set a voter's mobile number; returns rows affected
    pub fn update_mobile(&self, voter_id: i64, mobile_number: &str) -> Result<usize> {
        let n = self.conn.execute(
            "UPDATE voters SET mobile_number = ?1 WHERE id = ?2",
            params![mobile_number, voter_id],
        )?;
        Ok(n)
    }

    /// Gender counts and age bands for a booth / panchayat / village slice
    pub fn voter_summary(&self, filter: &SummaryFilter) -> Result<VoterSummary> {
        let mut clause = String::from("WHERE 1=1");
        let mut args = Vec::new();
        if let Some(booth_no) = filter.booth_no {
            clause.push_str(" AND booth_no = ?");
            args.push(Value::Integer(booth_no));
        }
        if let Some(panchayat_id) = filter.panchayat_id {
            clause.push_str(" AND panchayat_id = ?");
            args.push(Value::Integer(panchayat_id));
        }
        if let Some(village) = non_empty(&filter.village_name) {
            clause.push_str(" AND village_name = ?");
            args.push(Value::Text(village.to_string()));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT gender, COUNT(*) FROM voters {} GROUP BY gender ORDER BY gender",
            clause
        ))?;
        let gender = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(GenderCount {
                    gender: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let age_groups = self.conn.query_row(
            &format!(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN age BETWEEN 18 AND 25 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN age BETWEEN 26 AND 50 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN age BETWEEN 51 AND 75 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN age > 75 THEN 1 ELSE 0 END), 0)
                FROM voters {}
                "#,
                clause
            ),
            params_from_iter(args.iter()),
            |row| {
                Ok(AgeGroups {
                    age_18_25: row.get::<_, i64>(0)? as u64,
                    age_26_50: row.get::<_, i64>(1)? as u64,
                    age_51_75: row.get::<_, i64>(2)? as u64,
                    age_75_plus: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;

        Ok(VoterSummary { gender, age_groups })
    }

    /// Distinct non-empty mobile numbers on the roll
    pub fn recipient_phones(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT mobile_number FROM voters WHERE mobile_number IS NOT NULL AND mobile_number != '' ORDER BY mobile_number",
        )?;
        let phones = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(phones)
    }

    fn count_where(&self, select: &str, clause: &str, args: &[Value]) -> Result<u64> {
        let total: i64 = self.conn.query_row(
            &format!("{} {}", select, clause),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    // ========== Election Result Operations ==========

    /// All booth results, ordered by booth station
    pub fn booth_results(&self) -> Result<Vec<BoothResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM election_results ORDER BY booth_station",
            RESULT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], row_to_booth_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Result row for one booth station
    pub fn booth_result(&self, booth_station: &str) -> Result<Option<BoothResult>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM election_results WHERE booth_station = ?1 LIMIT 1",
                    RESULT_COLUMNS
                ),
                [booth_station],
                row_to_booth_result,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Distinct booth stations with results
    pub fn booth_stations(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT booth_station FROM election_results WHERE booth_station IS NOT NULL ORDER BY booth_station ASC",
        )?;
        let booths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(booths)
    }

    /// Insert result rows in one transaction
    pub fn insert_booth_results(&self, rows: &[BoothResult]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO election_results ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                RESULT_COLUMNS
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.booth_station,
                    row.dmk as i64,
                    row.dmdk as i64,
                    row.admk as i64,
                    row.ijk as i64,
                    row.ntk as i64,
                    row.total_valid_votes as i64,
                    row.rejected_votes as i64,
                    row.nota as i64,
                    row.total_votes as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove every result row ahead of a re-import
    pub fn clear_booth_results(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM election_results", [])?)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        let linked: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM voters WHERE is_linked = 1", [], |row| row.get(0))?;

        Ok(DbStats {
            voters: count("voters")?,
            linked_voters: linked as usize,
            families: count("families")?,
            booth_results: count("election_results")?,
            leaders: count("party_leadership")?,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn row_to_voter(row: &rusqlite::Row) -> rusqlite::Result<Voter> {
    Ok(Voter {
        id: row.get(0)?,
        epic_no: row.get(1)?,
        name: row.get(2)?,
        relative_name: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        mobile_number: row.get(6)?,
        booth_no: row.get(7)?,
        village_name: row.get(8)?,
        panchayat_id: row.get(9)?,
        caste_code: row.get(10)?,
        linked_mobile: row.get(11)?,
        is_linked: row.get::<_, i64>(12)? != 0,
    })
}

/// NULL and negative counts read as 0
fn count_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let value: Option<i64> = row.get(idx)?;
    Ok(value.unwrap_or(0).max(0) as u64)
}

fn row_to_booth_result(row: &rusqlite::Row) -> rusqlite::Result<BoothResult> {
    let station: Option<String> = row.get(0)?;
    Ok(BoothResult {
        booth_station: station.unwrap_or_default(),
        dmk: count_at(row, 1)?,
        dmdk: count_at(row, 2)?,
        admk: count_at(row, 3)?,
        ijk: count_at(row, 4)?,
        ntk: count_at(row, 5)?,
        total_valid_votes: count_at(row, 6)?,
        rejected_votes: count_at(row, 7)?,
        nota: count_at(row, 8)?,
        total_votes: count_at(row, 9)?,
    })
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub voters: usize,
    pub linked_voters: usize,
    pub families: usize,
    pub booth_results: usize,
    pub leaders: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Voters: {} ({} linked)", self.voters, self.linked_voters)?;
        writeln!(f, "  Families: {}", self.families)?;
        writeln!(f, "  Booth results: {}", self.booth_results)?;
        writeln!(f, "  Leaders: {}", self.leaders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::Party;

    fn roll(store: &SqliteStore) {
        store
            .insert_voter(&NewVoter::new("Anbu", 12).with_age(22).with_gender("M").with_epic("TN001"))
            .unwrap();
        store
            .insert_voter(&NewVoter::new("Bala", 12).with_age(45).with_gender("F"))
            .unwrap();
        store
            .insert_voter(&NewVoter::new("Chitra", 12).with_age(80).with_gender("F"))
            .unwrap();
        store
            .insert_voter(&NewVoter::new("Devi", 13).with_age(30).with_gender("F").with_village("Kadayam"))
            .unwrap();
    }

    #[test]
    fn test_voter_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_voter(&NewVoter::new("Anbu", 12).with_age(22)).unwrap();

        let voter = store.get_voter(id).unwrap().unwrap();
        assert_eq!(voter.name, "Anbu");
        assert!(!voter.is_linked);

        assert_eq!(store.update_mobile(id, "9000000001").unwrap(), 1);
        assert_eq!(store.update_mobile(999, "9000000001").unwrap(), 0);
        assert_eq!(
            store.get_voter(id).unwrap().unwrap().mobile_number.as_deref(),
            Some("9000000001")
        );
        assert!(store.get_voter(999).unwrap().is_none());
    }

    #[test]
    fn test_unlinked_voters_search_and_paging() {
        let store = SqliteStore::open_in_memory().unwrap();
        roll(&store);

        let all = store.unlinked_voters(12, &UnlinkedQuery::default()).unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.per_page, 200);

        let search = UnlinkedQuery {
            search: Some("tn0".into()),
            ..Default::default()
        };
        let found = store.unlinked_voters(12, &search).unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.data[0].name, "Anbu");

        let second = UnlinkedQuery {
            page: Some(2),
            limit: Some(2),
            ..Default::default()
        };
        let page = store.unlinked_voters(12, &second).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_list_voters_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        roll(&store);

        let filter = VoterFilter {
            village_name: Some("Kadayam".into()),
            ..Default::default()
        };
        let page = store.list_voters(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "Devi");

        let by_name = VoterFilter {
            name: Some("ch".into()),
            ..Default::default()
        };
        assert_eq!(store.list_voters(&by_name).unwrap().data[0].name, "Chitra");
    }

    #[test]
    fn test_voter_summary() {
        let store = SqliteStore::open_in_memory().unwrap();
        roll(&store);

        let summary = store
            .voter_summary(&SummaryFilter {
                booth_no: Some(12),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            summary.gender,
            vec![
                GenderCount { gender: Some("F".into()), count: 2 },
                GenderCount { gender: Some("M".into()), count: 1 },
            ]
        );
        assert_eq!(summary.age_groups.age_18_25, 1);
        assert_eq!(summary.age_groups.age_26_50, 1);
        assert_eq!(summary.age_groups.age_75_plus, 1);
    }

    #[test]
    fn test_booth_results_coerce_nulls() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO election_results (booth_station, naam_tamilar_katchi) VALUES ('3', 17)",
                [],
            )
            .unwrap();

        let row = store.booth_result("3").unwrap().unwrap();
        assert_eq!(row.votes(Party::Ntk), 17);
        assert_eq!(row.votes(Party::Dmk), 0);
        assert_eq!(row.total_valid_votes, 0);
        assert_eq!(store.booth_stations().unwrap(), vec!["3".to_string()]);
    }

    #[test]
    fn test_stats() {
        let store = SqliteStore::open_in_memory().unwrap();
        roll(&store);
        let stats = store.stats().unwrap();
        assert_eq!(stats.voters, 4);
        assert_eq!(stats.linked_voters, 0);
    }
}

//! Bulk CSV import of election results and the leadership roster
//!
//! Rows are inserted in batches of [`BATCH_SIZE`], each batch in its own
//! transaction. A failed batch is set aside and the import carries on; all
//! set-aside rows are written as JSON to a side file at the end.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Result;
use crate::election::{BoothResult, Party};
use crate::records::LeaderInput;
use crate::storage::SqliteStore;

pub const BATCH_SIZE: usize = 200;

const BOOTH_HEADERS: &[&str] = &[
    "Booth_Number",
    "Booth Station",
    "Booth_Station",
    "booth_station",
    "booth_number",
];

/// Spreadsheet header for each party's column
fn party_header(party: Party) -> &'static str {
    match party {
        Party::Dmk => "Dravida Munnetra Kazhagam",
        Party::Dmdk => "Desiya Murpokku Dravida Kazhagam",
        Party::Admk => "All India Anna Dravida Munnetra Kazhagam",
        Party::Ijk => "Indiya Jananayaka Katchi",
        Party::Ntk => "Naam Tamilar Katchi",
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total: usize,
    pub inserted: usize,
    pub failed: usize,
    pub failed_log: Option<PathBuf>,
}

/// Header lookup tolerant of spacing and case
struct Columns {
    headers: csv::StringRecord,
}

impl Columns {
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
    }
}

fn text(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("").to_string()
}

/// Blank or unparseable counts read as 0
fn count(record: &csv::StringRecord, idx: Option<usize>) -> u64 {
    let raw = text(record, idx).replace(',', "");
    raw.parse::<u64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.max(0.0) as u64))
        .unwrap_or(0)
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Parse per-booth result rows from CSV
pub fn read_election_results(reader: impl Read) -> Result<Vec<BoothResult>> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns {
        headers: csv.headers()?.clone(),
    };

    let booth = columns.find(BOOTH_HEADERS);
    let parties: Vec<(Party, Option<usize>)> = Party::all()
        .iter()
        .map(|p| (*p, columns.find(&[party_header(*p)])))
        .collect();
    let total_valid = columns.find(&["Total of Valid Votes"]);
    let rejected = columns.find(&["No. Of Rejected Votes"]);
    let nota = columns.find(&["NOTA"]);
    let total = columns.find(&["Total"]);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let mut row = parties.iter().fold(
            BoothResult::new(text(&record, booth)),
            |row, (party, idx)| row.with_votes(*party, count(&record, *idx)),
        );
        row.total_valid_votes = count(&record, total_valid);
        row.rejected_votes = count(&record, rejected);
        row.nota = count(&record, nota);
        row.total_votes = count(&record, total);
        rows.push(row);
    }
    Ok(rows)
}

/// Parse leadership roster rows from CSV
pub fn read_leaders(reader: impl Read) -> Result<Vec<LeaderInput>> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns {
        headers: csv.headers()?.clone(),
    };
    let union = columns.find(&["Union"]);
    let panchayat = columns.find(&["Panchayat"]);
    let branch = columns.find(&["Branch(KIZHAI)", "Branch"]);
    let name = columns.find(&["Name"]);
    let phone = columns.find(&["Phone number"]);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        rows.push(LeaderInput {
            union_name: optional(text(&record, union)),
            panchayat_name: optional(text(&record, panchayat)),
            branch_name: optional(text(&record, branch)),
            leader_name: Some(text(&record, name)),
            phone_number: Some(text(&record, phone)),
        });
    }
    Ok(rows)
}

/// Insert `rows` batch by batch, collecting failed batches into `failed_log`
pub fn import_in_batches<T: Serialize>(
    rows: &[T],
    failed_log: &Path,
    mut insert: impl FnMut(&[T]) -> Result<()>,
    mut on_batch: impl FnMut(usize),
) -> Result<ImportReport> {
    let mut report = ImportReport {
        total: rows.len(),
        ..Default::default()
    };
    let mut failed: Vec<&T> = Vec::new();

    for batch in rows.chunks(BATCH_SIZE) {
        match insert(batch) {
            Ok(()) => {
                report.inserted += batch.len();
                tracing::info!("Inserted {}/{}", report.inserted, report.total);
            }
            Err(e) => {
                tracing::warn!(rows = batch.len(), "Batch insert failed: {}", e);
                failed.extend(batch);
            }
        }
        on_batch(batch.len());
    }

    if !failed.is_empty() {
        std::fs::write(failed_log, serde_json::to_string_pretty(&failed)?)?;
        tracing::warn!(
            "{} rows failed to insert. Logged to {}",
            failed.len(),
            failed_log.display()
        );
        report.failed = failed.len();
        report.failed_log = Some(failed_log.to_path_buf());
    }
    Ok(report)
}

/// Replace `election_results` with the rows of a CSV file
pub fn import_election_results(
    store: &SqliteStore,
    csv_path: &Path,
    failed_log: &Path,
    on_batch: impl FnMut(usize),
) -> Result<ImportReport> {
    let rows = read_election_results(std::fs::File::open(csv_path)?)?;
    tracing::info!("Total rows found in file: {}", rows.len());

    let cleared = store.clear_booth_results()?;
    tracing::info!(cleared, "Old data cleared from election_results");

    import_in_batches(&rows, failed_log, |batch| store.insert_booth_results(batch), on_batch)
}

/// Replace `party_leadership` with the rows of a CSV file
pub fn import_party_leadership(
    store: &SqliteStore,
    csv_path: &Path,
    failed_log: &Path,
    on_batch: impl FnMut(usize),
) -> Result<ImportReport> {
    let rows = read_leaders(std::fs::File::open(csv_path)?)?;
    tracing::info!("Total rows found in file: {}", rows.len());

    let cleared = store.clear_leaders()?;
    tracing::info!(cleared, "Old data cleared from party_leadership");

    import_in_batches(&rows, failed_log, |batch| store.insert_leaders(batch), on_batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::records::LeaderFilter;

    const RESULTS_CSV: &str = "\
Booth Station,Dravida Munnetra Kazhagam,Desiya Murpokku Dravida Kazhagam,All India Anna Dravida Munnetra Kazhagam,Indiya Jananayaka Katchi,Naam Tamilar Katchi,Total of Valid Votes,No. Of Rejected Votes,NOTA,Total
1,420,35,380,12,60,907,3,9,919
2,,10,\"1,200\",0,44,1254,0,2,1256
";

    #[test]
    fn test_read_results_with_aliases_and_blanks() {
        let rows = read_election_results(RESULTS_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].booth_station, "1");
        assert_eq!(rows[0].votes(Party::Dmk), 420);
        assert_eq!(rows[0].total_votes, 919);
        assert_eq!(rows[1].votes(Party::Dmk), 0);
        assert_eq!(rows[1].votes(Party::Admk), 1200);
    }

    #[test]
    fn test_import_results_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        std::fs::write(&csv_path, RESULTS_CSV).unwrap();
        let log = dir.path().join("failed_rows.log");

        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_booth_results(&[BoothResult::new("old")]).unwrap();

        let mut batches = 0;
        let report = import_election_results(&store, &csv_path, &log, |_| batches += 1).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(batches, 1);
        assert!(!log.exists());
        assert_eq!(store.booth_stations().unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_failed_batch_is_logged_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("failed_rows.log");
        let rows: Vec<u32> = (0..450).collect();

        let mut call = 0;
        let report = import_in_batches(
            &rows,
            &log,
            |_| {
                call += 1;
                if call == 2 {
                    Err(Error::Validation("boom".into()))
                } else {
                    Ok(())
                }
            },
            |_| {},
        )
        .unwrap();

        assert_eq!(report.total, 450);
        assert_eq!(report.inserted, 250);
        assert_eq!(report.failed, 200);
        let logged: Vec<u32> = serde_json::from_str(&std::fs::read_to_string(&log).unwrap()).unwrap();
        assert_eq!(logged.first(), Some(&200));
        assert_eq!(logged.len(), 200);
    }

    #[test]
    fn test_import_leadership() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("leaders.csv");
        std::fs::write(
            &csv_path,
            "Union,Panchayat,Branch(KIZHAI),Name,Phone number\nKadayam,Alangulam,North,Murugan,9000000003\n",
        )
        .unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let report =
            import_party_leadership(&store, &csv_path, &dir.path().join("failed.log"), |_| {}).unwrap();
        assert_eq!(report.inserted, 1);

        let leaders = store.list_leaders(&LeaderFilter::default()).unwrap();
        assert_eq!(leaders[0].branch_name.as_deref(), Some("North"));
        assert_eq!(leaders[0].leader_name, "Murugan");
    }
}

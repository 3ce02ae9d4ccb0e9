//! Disk-backed upload directory
//!
//! Files land under the configured upload dir as `{millis}_{sanitized name}`
//! and are served statically under `/uploads`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::records::Visitor;
use crate::{Error, Result};

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/jpeg",
    "image/png",
    "image/jpg",
];

pub const VISITORS_SNAPSHOT: &str = "visitors.csv";

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: String,
    pub date: String,
    pub url: String,
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w.\-]").expect("valid regex"))
}

/// Collapse whitespace runs to `_` and drop anything outside `[\w.-]`
pub fn sanitize_filename(original: &str) -> String {
    let underscored = whitespace().replace_all(original, "_");
    unsafe_chars().replace_all(&underscored, "").into_owned()
}

pub fn stored_name(timestamp_ms: i64, original: &str) -> String {
    format!("{}_{}", timestamp_ms, sanitize_filename(original))
}

pub fn file_url(public_url: &str, name: &str) -> String {
    format!("{}/uploads/{}", public_url.trim_end_matches('/'), name)
}

pub fn is_allowed_type(content_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&content_type)
}

/// Validate and write an uploaded file, returning its stored name
pub fn save_upload(
    dir: &Path,
    original: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<String> {
    let content_type = content_type.unwrap_or("application/octet-stream");
    if !is_allowed_type(content_type) {
        return Err(Error::Upload(
            "Invalid file type. Only PDF, Excel, or images allowed.".into(),
        ));
    }
    if bytes.len() > max_bytes {
        return Err(Error::Upload(format!(
            "File too large (max {} bytes)",
            max_bytes
        )));
    }

    std::fs::create_dir_all(dir)?;
    let name = stored_name(Local::now().timestamp_millis(), original);
    std::fs::write(dir.join(&name), bytes)?;
    tracing::info!(file = %name, bytes = bytes.len(), "Stored upload");
    Ok(name)
}

/// List files in the upload dir, sorted by name
pub fn list_uploads(dir: &Path, public_url: &str) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let modified: DateTime<Local> = meta.modified()?.into();
        files.push(UploadedFile {
            url: file_url(public_url, &name),
            size: format!("{:.1} KB", meta.len() as f64 / 1024.0),
            date: modified.format("%d/%m/%Y, %I:%M:%S %p").to_string(),
            name,
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Resolve a client-supplied name to a path inside `dir`
fn resolve(dir: &Path, filename: &str) -> Result<PathBuf> {
    let traversal = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.contains("..");
    if traversal {
        return Err(Error::Validation("Invalid file name".into()));
    }
    Ok(dir.join(filename))
}

pub fn delete_upload(dir: &Path, filename: &str) -> Result<()> {
    let path = resolve(dir, filename)?;
    if !path.is_file() {
        return Err(Error::NotFound("File not found".into()));
    }
    std::fs::remove_file(&path)?;
    tracing::info!(file = filename, "Deleted upload");
    Ok(())
}

/// Rewrite the visitor snapshot in the upload dir
pub fn write_visitors_csv(dir: &Path, visitors: &[Visitor]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(VISITORS_SNAPSHOT);
    let mut writer = csv::Writer::from_path(&path)?;
    for visitor in visitors {
        writer.serialize(visitor)?;
    }
    writer.flush()?;
    tracing::debug!(rows = visitors.len(), "Wrote visitor snapshot");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Report (final).pdf"), "My_Report_final.pdf");
        assert_eq!(sanitize_filename("a  b\tc.png"), "a_b_c.png");
        assert_eq!(stored_name(1700000000000, "x y.pdf"), "1700000000000_x_y.pdf");
    }

    #[test]
    fn test_save_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let name = save_upload(dir.path(), "notice board.pdf", Some("application/pdf"), &[0u8; 2048], 4096)
            .unwrap();
        assert!(name.ends_with("_notice_board.pdf"));

        let files = list_uploads(dir.path(), "http://host:4000/").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, "2.0 KB");
        assert_eq!(files[0].url, format!("http://host:4000/uploads/{}", name));

        delete_upload(dir.path(), &name).unwrap();
        assert!(matches!(delete_upload(dir.path(), &name), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            save_upload(dir.path(), "run.sh", Some("text/x-shellscript"), b"echo", 100),
            Err(Error::Upload(_))
        ));
        assert!(matches!(
            save_upload(dir.path(), "big.png", Some("image/png"), &[0u8; 101], 100),
            Err(Error::Upload(_))
        ));
        assert!(matches!(
            delete_upload(dir.path(), "../secret.db"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_visitor_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let visitors = vec![Visitor {
            id: 1,
            name: "Selvi".into(),
            native_place: None,
            village: Some("Kila".into()),
            mobile: "9000000004".into(),
            visit_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }];
        let path = write_visitors_csv(dir.path(), &visitors).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("id,name,native_place,village,mobile,visit_date"));
        assert!(contents.contains("Selvi"));
    }
}

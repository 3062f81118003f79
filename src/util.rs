use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

pub fn rfc3339_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// Runs without --run-id are labelled by their UTC start second.
pub fn default_run_id(started: DateTime<Utc>) -> String {
    format!("run-{}", started.format("%Y%m%dT%H%M%SZ"))
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn ensure_parent_directory(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_directory(path)?;
    let file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("failed to finalize json file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .expect("timestamp should be valid")
    }

    #[test]
    fn default_run_id_uses_compact_start_time() {
        assert_eq!(default_run_id(sample_ts()), "run-20240309T070501Z");
        assert_eq!(rfc3339_utc(sample_ts()), "2024-03-09T07:05:01Z");
    }

    #[test]
    fn ensure_parent_directory_accepts_bare_file_names() {
        ensure_parent_directory(Path::new("result.csv"))
            .expect("bare name should need no parent directory");

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("a").join("b").join("result.csv");
        ensure_parent_directory(&path).expect("parents should be created");
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn write_json_pretty_appends_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("summary.json");
        write_json_pretty(&path, &serde_json::json!({ "run_id": "r1" }))
            .expect("json should be written");
        let text = fs::read_to_string(&path).expect("json should be readable");
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"run_id\": \"r1\""));
    }
}

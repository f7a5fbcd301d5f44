use crate::domain::model::SkippedRow;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub first_row: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowWarning {
    pub row_number: usize,
    pub message: String,
}

/// JSON summary written next to the workbook after every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub job: String,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub skipped: Vec<SkippedRow>,
    pub sheets: Vec<SheetSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RowWarning>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status_counts: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn new(job: &str, command: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            job: job.to_string(),
            command: command.to_string(),
            started_at,
            finished_at: started_at,
            processed: 0,
            skipped: Vec::new(),
            sheets: Vec::new(),
            warnings: Vec::new(),
            status_counts: BTreeMap::new(),
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub async fn save<S: Storage>(&self, storage: &S, filename: &str) -> Result<Vec<u8>> {
        let json = self.to_json()?;
        storage.write_file(filename, &json).await?;
        tracing::info!(
            "📋 Run report saved: {} ({} processed, {} skipped)",
            filename,
            self.processed,
            self.skipped.len()
        );
        Ok(json)
    }
}

/// `20260102T030405Z`, safe for file names.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Bundles named in-memory files into a ZIP archive.
pub fn build_archive(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    tracing::debug!("Creating ZIP file with {} files", entries.len());
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::workbook::encode_grid;
    use chrono::TimeZone;
    use std::io::Read;

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp(at), "20260102T030405Z");
    }

    #[test]
    fn test_report_json_omits_empty_sections() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut report = RunReport::new("spring", "generate", at);
        report.processed = 2;
        report.skipped.push(SkippedRow {
            row_number: 4,
            reason: "missing brand".to_string(),
        });

        let json: serde_json::Value = serde_json::from_slice(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["processed"], 2);
        assert_eq!(json["skipped"][0]["row_number"], 4);
        assert!(json.get("warnings").is_none());
        assert!(json.get("status_counts").is_none());
    }

    #[test]
    fn test_archive_contains_entries() {
        let csv = encode_grid(&[
            vec!["Title".to_string(), "Color".to_string()],
            vec![],
            vec!["Ace, white".to_string()],
        ])
        .unwrap();
        assert_eq!(String::from_utf8(csv.clone()).unwrap(), "Title,Color\n\"\"\n\"Ace, white\"\n");

        let bytes = build_archive(&[("sneakers.csv".to_string(), csv)]).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut content = String::new();
        archive
            .by_name("sneakers.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.starts_with("Title,Color"));
    }
}

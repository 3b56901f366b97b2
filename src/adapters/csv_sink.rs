use crate::domain::model::LookupRecord;
use crate::domain::ports::ResultSink;
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = "\u{feff}".as_bytes();

/// `results_{run_id}_{YYYYMMDD}_{HHMMSS}.csv`
pub fn results_file_name(run_id: &str, now: DateTime<Local>) -> String {
    format!(
        "results_{}_{}_{}.csv",
        run_id,
        now.format("%Y%m%d"),
        now.format("%H%M%S")
    )
}

/// 逐區段附加的 CSV 結果檔，每次附加後都會 fsync
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// 在目錄下建立新的結果檔並寫入標頭
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let file_name = results_file_name(&run_id[..8], Local::now());
        Self::create_at(dir.join(file_name))
    }

    pub fn create_at(path: PathBuf) -> Result<Self> {
        let mut file = File::create(&path)?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(LookupRecord::HEADER)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        tracing::debug!("Created results file {}", path.display());
        Ok(Self { path })
    }
}

#[async_trait::async_trait]
impl ResultSink for CsvSink {
    async fn append(&self, records: &[LookupRecord]) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        tracing::debug!(
            "Appended {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(domain: &str, country: Option<&str>) -> LookupRecord {
        LookupRecord {
            domain: domain.to_string(),
            country: country.map(str::to_string),
            isp: Some("Example ISP".to_string()),
            organization: None,
            as_number: Some("AS64500 Example".to_string()),
        }
    }

    fn read_back(path: &Path) -> (Vec<u8>, Vec<LookupRecord>) {
        let bytes = fs::read(path).unwrap();
        let records = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..])
            .deserialize()
            .collect::<std::result::Result<Vec<LookupRecord>, _>>()
            .unwrap();
        (bytes, records)
    }

    #[test]
    fn test_results_file_name_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            results_file_name("1a2b3c4d", now),
            "results_1a2b3c4d_20240307_090501.csv"
        );
    }

    #[test]
    fn test_create_writes_bom_and_header() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::create(&dir.path().join("results")).unwrap();

        let name = sink.location().file_name().unwrap().to_str().unwrap();
        let pattern = regex::Regex::new(r"^results_[0-9a-f]{8}_\d{8}_\d{6}\.csv$").unwrap();
        assert!(pattern.is_match(name), "unexpected file name {}", name);

        let bytes = fs::read(sink.location()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let content = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(content, "domain,country,isp,organization,as\n");
    }

    #[tokio::test]
    async fn test_append_accumulates_chunks_without_repeating_header() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::create_at(dir.path().join("out.csv")).unwrap();

        sink.append(&[record("a.com", Some("NL"))]).await.unwrap();
        sink.append(&[]).await.unwrap();
        sink.append(&[record("b.com", None), record("c.com", Some("DE"))])
            .await
            .unwrap();

        let (bytes, records) = read_back(sink.location());
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("domain,country").count(), 1);
        assert_eq!(
            records,
            vec![
                record("a.com", Some("NL")),
                record("b.com", None),
                record("c.com", Some("DE")),
            ]
        );
    }

    #[tokio::test]
    async fn test_append_to_removed_file_fails() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::create_at(dir.path().join("gone.csv")).unwrap();
        fs::remove_file(sink.location()).unwrap();

        assert!(sink.append(&[record("a.com", None)]).await.is_err());
    }
}

//! Batch enrichment of photo records: download, analyse, write back.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::PhotoAnalyst;
use crate::download::PhotoDownloader;
use crate::types::{PictoError, PictoResult};

/// `content` value for records whose photo could not be downloaded.
pub const DOWNLOAD_FAILED_MARKER: &str = "Image download failed";

/// One photo record. Fields other than `photo_id` and `content` are kept as-is.
///
/// `photo_id` is kept as raw JSON so that a record with a missing or
/// malformed id fails on its own instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub photo_id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhotoRecord {
    /// The id as a non-negative integer, if the record has one.
    pub fn numeric_id(&self) -> Option<u64> {
        self.photo_id.as_u64()
    }
}

/// Counts from one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub analyzed: usize,
    pub download_failures: usize,
    pub analysis_failures: usize,
}

/// Read a JSON array of photo records.
pub fn read_records(path: &Path) -> PictoResult<Vec<PhotoRecord>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| {
        PictoError::InvalidInput(format!("{} is not a JSON array of photo records: {e}", path.display()))
    })
}

/// Write records as 2-space indented UTF-8 JSON.
pub fn write_records(path: &Path, records: &[PhotoRecord]) -> PictoResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(records)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Fill in `content` for every record. One record's failure never stops the
/// run; each temp image is deleted before moving on.
pub async fn enrich_records(
    records: &mut [PhotoRecord],
    downloader: &PhotoDownloader,
    analyst: &PhotoAnalyst,
) -> BatchReport {
    let mut report = BatchReport {
        total: records.len(),
        ..BatchReport::default()
    };

    for record in records.iter_mut() {
        let Some(photo_id) = record.numeric_id() else {
            tracing::warn!("Skipping record without a numeric photo_id: {}", record.photo_id);
            record.content = Some(DOWNLOAD_FAILED_MARKER.to_string());
            report.download_failures += 1;
            continue;
        };
        tracing::info!("Processing photo_id {photo_id}");

        let image = match downloader.download(photo_id).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                record.content = Some(DOWNLOAD_FAILED_MARKER.to_string());
                report.download_failures += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Download of photo {photo_id} failed: {e}");
                record.content = Some(DOWNLOAD_FAILED_MARKER.to_string());
                report.download_failures += 1;
                continue;
            }
        };

        match analyst.analyze(image.path(), None).await {
            Ok(text) => {
                tracing::info!("photo_id {photo_id} analysed");
                tracing::debug!("content: {text}");
                record.content = Some(text);
                report.analyzed += 1;
            }
            Err(e) => {
                tracing::warn!("Analysis of photo_id {photo_id} failed: {e}");
                record.content = Some(format!("Analysis error: {e}"));
                report.analysis_failures += 1;
            }
        }

        if let Err(e) = image.remove() {
            tracing::warn!("Could not delete temp image for photo_id {photo_id}: {e}");
        }
    }

    report
}

/// Read `input`, enrich every record, and write the whole array to `output`.
pub async fn run_batch(
    input: &Path,
    output: &Path,
    downloader: &PhotoDownloader,
    analyst: &PhotoAnalyst,
) -> PictoResult<BatchReport> {
    let mut records = read_records(input)?;
    tracing::info!("Loaded {} records from {}", records.len(), input.display());

    let report = enrich_records(&mut records, downloader, analyst).await;

    write_records(output, &records)?;
    tracing::info!("Wrote updated records to {}", output.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_extra_fields() {
        let json = r#"[{"photo_id": 3, "title": "강변 산책", "tags": ["river"]}]"#;
        let records: Vec<PhotoRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].numeric_id(), Some(3));
        assert!(records[0].content.is_none());
        assert_eq!(records[0].extra["title"], "강변 산책");

        let back = serde_json::to_value(&records).unwrap();
        assert_eq!(back[0]["tags"][0], "river");
        assert!(back[0].get("content").is_none());
    }

    #[test]
    fn test_write_keeps_non_ascii_and_indents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/json_updated.txt");
        let records = vec![PhotoRecord {
            photo_id: Value::from(1),
            content: Some("따뜻한 색감".to_string()),
            extra: Map::new(),
        }];
        write_records(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("따뜻한 색감"));
        assert!(text.contains("\n  {"));
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_read_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("json.txt");
        std::fs::write(&path, r#"{"photo_id": 1}"#).unwrap();
        assert!(matches!(read_records(&path), Err(PictoError::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_ids_parse_per_record() {
        let json = r#"[{"photo_id": 1}, {"photo_id": "2"}, {"title": "no id"}, {"photo_id": -4}]"#;
        let records: Vec<PhotoRecord> = serde_json::from_str(json).unwrap();
        let ids: Vec<Option<u64>> = records.iter().map(PhotoRecord::numeric_id).collect();
        assert_eq!(ids, vec![Some(1), None, None, None]);

        let back = serde_json::to_value(&records).unwrap();
        assert_eq!(back[1]["photo_id"], "2");
        assert!(back[2].get("photo_id").is_none());
        assert_eq!(back[3]["photo_id"], -4);
    }

    #[tokio::test]
    async fn test_records_without_numeric_id_are_marked_and_skipped() {
        use std::sync::Arc;

        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use crate::analysis::testing::ScriptedBackend;
        use crate::config::Settings;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .expect(1)
            .mount(&server)
            .await;

        let downloader =
            PhotoDownloader::new(format!("{}/photos/{{photo_id}}", server.uri()), None).unwrap();
        let backend = Arc::new(ScriptedBackend::ok("Sharp and well lit."));
        let analyst = PhotoAnalyst::new(backend.clone(), &Settings::default());

        let mut records: Vec<PhotoRecord> =
            serde_json::from_str(r#"[{"photo_id": 1}, {"photo_id": "2"}, {"title": "no id"}]"#)
                .unwrap();
        let report = enrich_records(&mut records, &downloader, &analyst).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.analyzed, 1);
        assert_eq!(report.download_failures, 2);
        assert_eq!(backend.request_count(), 1);
        assert_eq!(records[0].content.as_deref(), Some("Sharp and well lit."));
        assert_eq!(records[1].content.as_deref(), Some(DOWNLOAD_FAILED_MARKER));
        assert_eq!(records[2].content.as_deref(), Some(DOWNLOAD_FAILED_MARKER));
        assert_eq!(records[2].extra["title"], "no id");
    }
}

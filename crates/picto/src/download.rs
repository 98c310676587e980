//! Photo download from the remote photo store into scoped temp files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::Settings;
use crate::llm::build_http_client;
use crate::types::PictoResult;

/// A downloaded image on disk. The file is removed when this is dropped.
#[derive(Debug)]
pub struct DownloadedImage {
    file: tempfile::TempPath,
}

impl DownloadedImage {
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Delete the file now, reporting any error.
    pub fn remove(self) -> std::io::Result<()> {
        self.file.close()
    }
}

/// Fetches photos by numeric id from a URL template.
#[derive(Clone)]
pub struct PhotoDownloader {
    http: reqwest::Client,
    url_template: String,
    temp_dir: Option<PathBuf>,
}

impl PhotoDownloader {
    /// `url_template` must contain `{photo_id}`.
    pub fn new(url_template: impl Into<String>, timeout: Option<Duration>) -> PictoResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            url_template: url_template.into(),
            temp_dir: None,
        })
    }

    pub fn from_settings(settings: &Settings) -> PictoResult<Self> {
        let downloader = Self::new(
            settings.photo_store_url.clone(),
            settings.request_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(match &settings.download_dir {
            Some(dir) => downloader.with_temp_dir(dir),
            None => downloader,
        })
    }

    /// Write downloads into `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn url_for(&self, photo_id: u64) -> String {
        self.url_template
            .replace("{photo_id}", &photo_id.to_string())
    }

    /// Stream the photo into a fresh `.jpg` temp file.
    ///
    /// Returns `Ok(None)` for any non-success status; nothing is written in
    /// that case. Transport failures are errors.
    pub async fn download(&self, photo_id: u64) -> PictoResult<Option<DownloadedImage>> {
        let url = self.url_for(photo_id);
        let mut response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Download of photo {photo_id} failed, status_code: {}",
                status.as_u16()
            );
            return Ok(None);
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("picto-").suffix(".jpg");
        let mut file = match &self.temp_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            written += chunk.len();
        }
        file.flush()?;

        let image = DownloadedImage {
            file: NamedTempFile::into_temp_path(file),
        };
        tracing::debug!(
            "Downloaded photo {photo_id} ({written} bytes) to {}",
            image.path().display()
        );
        Ok(Some(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(server: &MockServer) -> PhotoDownloader {
        PhotoDownloader::new(format!("{}/photos/download/{{photo_id}}", server.uri()), None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_writes_exact_bytes() {
        let server = MockServer::start().await;
        let body = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4];
        Mock::given(method("GET"))
            .and(path("/photos/download/7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let image = downloader(&server).download(7).await.unwrap().unwrap();
        assert!(image.path().exists());
        assert_eq!(image.path().extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(image.path()).unwrap(), body);

        let kept = image.path().to_path_buf();
        drop(image);
        assert!(!kept.exists());
    }

    #[tokio::test]
    async fn test_not_found_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/download/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = downloader(&server).download(404).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_explicit_remove() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let image = downloader(&server).download(1).await.unwrap().unwrap();
        let kept = image.path().to_path_buf();
        image.remove().unwrap();
        assert!(!kept.exists());
    }

    #[test]
    fn test_url_substitution() {
        let d = PhotoDownloader::new("http://store/{photo_id}/raw", None).unwrap();
        assert_eq!(d.url_for(12), "http://store/12/raw");
    }

    #[tokio::test]
    async fn test_downloads_go_to_configured_dir() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8, 8, 7]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("downloads");
        let image = downloader(&server)
            .with_temp_dir(&scratch)
            .download(5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(image.path().parent().unwrap(), scratch.as_path());
        assert!(image
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("picto-"));

        drop(image);
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }
}

use crate::client::HttpClientConfig;
use crate::config::DownloadConfig;
use crate::Result;
use futures::StreamExt;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Minimum plausible PDF size; anything smaller is a publisher error page
const MIN_PDF_BYTES: u64 = 1000;

/// Downloads resolved full-text PDFs to local disk.
///
/// Files are named `{pmid}_{sanitized_procedure}.pdf`; existing files are
/// reused, transient failures retried a fixed number of times, and a random
/// politeness delay precedes every network fetch.
pub struct PdfDownloader {
    client: reqwest::Client,
    save_dir: PathBuf,
    retry_attempts: u32,
    delay_range: (f64, f64),
}

impl PdfDownloader {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let http = HttpClientConfig {
            timeout: Duration::from_secs(config.timeout_secs),
            ..HttpClientConfig::default()
        };
        Ok(Self {
            client: http.build()?,
            save_dir: config.directory.clone(),
            retry_attempts: config.retry_attempts.max(1),
            delay_range: (config.delay_min_secs, config.delay_max_secs),
        })
    }

    /// Download a PDF, returning the saved path or `None` on failure.
    ///
    /// Failures are logged, never raised; a missing full text degrades the
    /// pipeline rather than aborting it.
    pub async fn download(&self, pdf_url: &str, pmid: &str, procedure: &str) -> Option<PathBuf> {
        let filename = format!("{}_{}.pdf", pmid, sanitize_component(procedure));
        let filepath = self.save_dir.join(&filename);

        if filepath.exists() {
            info!("PDF already exists: {}", filename);
            return Some(filepath);
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.save_dir).await {
            error!("Could not create download directory: {}", e);
            return None;
        }

        info!("Downloading PDF: {}", filename);

        let delay = rand::thread_rng().gen_range(self.delay_range.0..=self.delay_range.1);
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;

        for attempt in 1..=self.retry_attempts {
            match self.fetch_to_file(pdf_url, &filepath).await {
                Ok(size) if size >= MIN_PDF_BYTES => {
                    info!("Downloaded: {} ({} bytes)", filename, size);
                    return Some(filepath);
                }
                Ok(size) => {
                    warn!("Downloaded file too small ({} bytes): {}", size, filename);
                    let _ = tokio::fs::remove_file(&filepath).await;
                    return None;
                }
                Err(e) => {
                    warn!("Download error (attempt {}): {}", attempt, e);
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        }

        error!(
            "Failed to download after {} attempts: {}",
            self.retry_attempts, pdf_url
        );
        None
    }

    async fn fetch_to_file(&self, pdf_url: &str, filepath: &Path) -> Result<u64> {
        let response = self.client.get(pdf_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::Error::ServiceUnavailable {
                service: "pdf download".to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        // Some publishers mislabel PDFs; log and accept anyway
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.to_lowercase().contains("pdf") {
            debug!("Response is not labeled as PDF: {}", content_type);
        }

        let mut file = tokio::fs::File::create(filepath).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// Keep alphanumerics, spaces, dashes and underscores; map spaces to
/// underscores so filenames stay shell-friendly.
pub(crate) fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("DIEP flap"), "DIEP_flap");
        assert_eq!(
            sanitize_component("Botox (glabella)"),
            "Botox_glabella"
        );
        assert_eq!(sanitize_component("a/b\\c"), "abc");
        assert_eq!(sanitize_component("  lift  "), "lift");
    }

    #[tokio::test]
    async fn test_existing_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let config = DownloadConfig {
            directory: dir.path().to_path_buf(),
            delay_min_secs: 0.0,
            delay_max_secs: 0.0,
            ..Default::default()
        };
        let existing = dir.path().join("42_Rhinoplasty.pdf");
        std::fs::write(&existing, b"%PDF-1.4 stub").unwrap();

        let downloader = PdfDownloader::new(&config).unwrap();
        let path = downloader
            .download("http://127.0.0.1:1/unreachable", "42", "Rhinoplasty")
            .await;
        assert_eq!(path, Some(existing));
    }

    #[tokio::test]
    async fn test_undersized_body_is_discarded() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(b"<html>Access denied</html>".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = DownloadConfig {
            directory: dir.path().to_path_buf(),
            retry_attempts: 1,
            delay_min_secs: 0.0,
            delay_max_secs: 0.0,
            ..Default::default()
        };
        let downloader = PdfDownloader::new(&config).unwrap();

        let result = downloader
            .download(&format!("{}/article.pdf", server.uri()), "7", "Facelift")
            .await;

        // An error page masquerading as a PDF never reaches disk
        assert_eq!(result, None);
        assert!(!dir.path().join("7_Facelift.pdf").exists());
    }
}

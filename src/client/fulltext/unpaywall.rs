use super::{FullTextSource, SourceKind};
use crate::client::{Article, Doi, HttpClientConfig};
use crate::config::FullTextConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Unpaywall lookup by DOI for a legal open-access PDF copy
pub struct UnpaywallSource {
    client: reqwest::Client,
    base_url: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UnpaywallRecord {
    #[serde(default)]
    is_oa: bool,
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url_for_pdf: Option<String>,
}

impl UnpaywallSource {
    pub fn new(fulltext: &FullTextConfig, email: &str) -> Result<Self> {
        let http = HttpClientConfig {
            timeout: Duration::from_secs(fulltext.timeout_secs),
            ..HttpClientConfig::default()
        };
        Ok(Self {
            client: http.build()?,
            base_url: fulltext.unpaywall_base_url.clone(),
            email: email.to_string(),
        })
    }
}

#[async_trait]
impl FullTextSource for UnpaywallSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Unpaywall
    }

    async fn resolve(&self, article: &Article) -> Result<Option<String>> {
        let Some(raw_doi) = article.doi.as_deref() else {
            return Ok(None);
        };
        let doi = Doi::new(raw_doi)?;
        debug!("Checking Unpaywall for DOI: {}", doi);

        let url = format!("{}/{}", self.base_url, doi.as_str());
        let response = self
            .client
            .get(&url)
            .query(&[("email", &self.email)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("DOI not found in Unpaywall: {}", doi);
                return Ok(None);
            }
            status if !status.is_success() => {
                warn!("Unpaywall API error {}: {}", status, doi);
                return Err(Error::ServiceUnavailable {
                    service: "unpaywall".to_string(),
                    reason: format!("HTTP {status}"),
                });
            }
            _ => {}
        }

        let record: UnpaywallRecord = response.json().await?;

        if !record.is_oa {
            debug!("Not open access: {}", doi);
            return Ok(None);
        }

        match record.best_oa_location.and_then(|loc| loc.url_for_pdf) {
            Some(pdf_url) => {
                info!("Found OA PDF via Unpaywall: {}", doi);
                Ok(Some(pdf_url))
            }
            None => {
                debug!("OA article found but no PDF URL: {}", doi);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_with_pdf() {
        let json = r#"{"is_oa":true,"best_oa_location":{"url_for_pdf":"https://x/y.pdf"}}"#;
        let record: UnpaywallRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_oa);
        assert_eq!(
            record.best_oa_location.unwrap().url_for_pdf.as_deref(),
            Some("https://x/y.pdf")
        );
    }

    #[test]
    fn test_closed_access_record() {
        let json = r#"{"is_oa":false,"best_oa_location":null}"#;
        let record: UnpaywallRecord = serde_json::from_str(json).unwrap();
        assert!(!record.is_oa);
    }

    #[test]
    fn test_oa_without_pdf_field() {
        let json = r#"{"is_oa":true,"best_oa_location":{"url_for_pdf":null}}"#;
        let record: UnpaywallRecord = serde_json::from_str(json).unwrap();
        assert!(record.best_oa_location.unwrap().url_for_pdf.is_none());
    }
}

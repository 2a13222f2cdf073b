pub mod download;
pub mod fulltext;
pub mod pubmed;

pub use download::PdfDownloader;
pub use fulltext::{FullTextResolver, FullTextSource, ResolvedFullText, SourceKind};
pub use pubmed::PubMedClient;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration shared by the retrieval integrations
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: "surgical-scout/0.3 (Literature Research Tool)".to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn build(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

/// DOI (Digital Object Identifier) wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Doi(String);

impl Doi {
    /// Create a new DOI from a string, validating the format
    pub fn new(doi: &str) -> Result<Self> {
        let cleaned = doi
            .trim()
            .trim_start_matches("doi:")
            .trim_start_matches("https://doi.org/");

        if cleaned.is_empty() {
            return Err(crate::Error::InvalidInput {
                field: "doi".to_string(),
                reason: "DOI cannot be empty".to_string(),
            });
        }

        // Basic DOI format validation (simplified)
        if !cleaned.contains('/') {
            return Err(crate::Error::InvalidInput {
                field: "doi".to_string(),
                reason: "DOI must contain a '/' character".to_string(),
            });
        }

        Ok(Self(cleaned.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to a URL-safe format
    #[must_use]
    pub fn url_encoded(&self) -> String {
        urlencoding::encode(&self.0).to_string()
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A flattened PubMed article record.
///
/// All fields are free text as returned by the vendor; identity is the PMID
/// string. Records are built per search call and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// "LastName Initials et al." summary of the author list
    pub authors: String,
    pub journal: String,
    pub date: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub pmid: String,
    pub doi: Option<String>,
    pub url: Option<String>,
}

impl Article {
    /// Canonical PubMed landing URL for a PMID
    #[must_use]
    pub fn pubmed_url(pmid: &str) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_normalization() {
        let doi = Doi::new("https://doi.org/10.1097/PRS.0000000000010023").unwrap();
        assert_eq!(doi.as_str(), "10.1097/PRS.0000000000010023");

        let doi = Doi::new("doi:10.1371/journal.pone.0308208").unwrap();
        assert_eq!(doi.as_str(), "10.1371/journal.pone.0308208");
    }

    #[test]
    fn test_doi_rejects_invalid() {
        assert!(Doi::new("").is_err());
        assert!(Doi::new("not-a-doi").is_err());
    }

    #[test]
    fn test_doi_url_encoding() {
        let doi = Doi::new("10.1002/(SICI)1096-9101").unwrap();
        assert!(doi.url_encoded().contains("%28"));
    }

    #[test]
    fn test_pubmed_url() {
        assert_eq!(
            Article::pubmed_url("38000000"),
            "https://pubmed.ncbi.nlm.nih.gov/38000000/"
        );
    }
}

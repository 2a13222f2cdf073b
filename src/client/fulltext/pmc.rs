use super::{FullTextSource, SourceKind};
use crate::client::{Article, HttpClientConfig};
use crate::config::{FullTextConfig, PubMedConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// PubMed Central lookup: elink the PMID to a PMC ID, then HEAD-check that a
/// PDF actually exists at the canonical PMC URL.
pub struct PmcSource {
    client: reqwest::Client,
    eutils_base: String,
    article_base: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct ELinkResponse {
    #[serde(default)]
    linksets: Vec<LinkSet>,
}

#[derive(Debug, Deserialize, Default)]
struct LinkSet {
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Deserialize, Default)]
struct LinkSetDb {
    #[serde(default)]
    links: Vec<String>,
}

impl PmcSource {
    pub fn new(pubmed: &PubMedConfig, fulltext: &FullTextConfig) -> Result<Self> {
        let http = HttpClientConfig {
            timeout: Duration::from_secs(fulltext.timeout_secs),
            ..HttpClientConfig::default()
        };
        Ok(Self {
            client: http.build()?,
            eutils_base: pubmed.base_url.clone(),
            article_base: fulltext.pmc_article_base_url.clone(),
            email: pubmed.email.clone(),
        })
    }

    /// Cross-reference a PMID to a PMC ID, if the article has a PMC version
    async fn pmc_id(&self, pmid: &str) -> Result<Option<String>> {
        debug!("Checking for PMC ID for PMID: {}", pmid);

        let url = format!("{}/elink.fcgi", self.eutils_base);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("dbfrom", "pubmed"),
                ("db", "pmc"),
                ("id", pmid),
                ("retmode", "json"),
                ("email", &self.email),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PubMed {
                code: status.as_u16(),
                message: format!("elink failed for PMID {pmid}"),
            });
        }

        let payload: ELinkResponse = response.json().await?;
        let id = payload
            .linksets
            .into_iter()
            .next()
            .and_then(|ls| ls.linksetdbs.into_iter().next())
            .and_then(|db| db.links.into_iter().next());

        match &id {
            Some(pmc) => info!("Found PMC ID: PMC{} for PMID {}", pmc, pmid),
            None => debug!("No PMC version for PMID {}", pmid),
        }
        Ok(id)
    }

    /// Verify the PMC PDF exists before handing the URL out
    async fn pdf_url(&self, pmc_id: &str) -> Result<Option<String>> {
        let pdf_url = format!("{}/PMC{}/pdf/", self.article_base, pmc_id);
        debug!("PMC PDF URL: {}", pdf_url);

        let response = self.client.head(&pdf_url).send().await?;

        if response.status().is_success() {
            info!("PMC PDF available: PMC{}", pmc_id);
            Ok(Some(pdf_url))
        } else {
            debug!(
                "PMC PDF not available (status {}): PMC{}",
                response.status(),
                pmc_id
            );
            Ok(None)
        }
    }
}

#[async_trait]
impl FullTextSource for PmcSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Pmc
    }

    async fn resolve(&self, article: &Article) -> Result<Option<String>> {
        if article.pmid.is_empty() {
            return Ok(None);
        }
        let Some(pmc_id) = self.pmc_id(&article.pmid).await? else {
            return Ok(None);
        };
        self.pdf_url(&pmc_id).await
    }
}

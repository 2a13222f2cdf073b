use crate::client::{Article, HttpClientConfig};
use crate::config::PubMedConfig;
use crate::query::normalize_query;
use crate::{Error, Result};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// PubMed E-utilities client with the two-pass query relaxation strategy.
///
/// Pass 1 restricts the search to the configured target journals; pass 2 runs
/// only when pass 1 finds nothing, swapping the journal filter for a generic
/// specialty filter. Results from the two passes are never merged.
pub struct PubMedClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    target_journals: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize, Default)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl PubMedClient {
    pub fn new(config: &PubMedConfig) -> Result<Self> {
        let http = HttpClientConfig {
            timeout: Duration::from_secs(config.timeout_secs),
            ..HttpClientConfig::default()
        };
        Ok(Self {
            client: http.build()?,
            base_url: config.base_url.clone(),
            email: config.email.clone(),
            target_journals: config.target_journals.clone(),
        })
    }

    /// Search PubMed for recent articles about a procedure.
    ///
    /// Every failure is logged and converted to an empty list; callers never
    /// see an error from this method.
    pub async fn search(&self, raw_query: &str, months_back: u32, max_results: u32) -> Vec<Article> {
        match self.try_search(raw_query, months_back, max_results).await {
            Ok(articles) => articles,
            Err(e) => {
                error!("Error searching PubMed for '{}': {}", raw_query, e);
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        raw_query: &str,
        months_back: u32,
        max_results: u32,
    ) -> Result<Vec<Article>> {
        let clean_query = normalize_query(raw_query);
        let date_filter = self.date_filter(months_back);

        // Pass 1: restricted to the target journals
        let first_pass = self.first_pass_query(&clean_query, &date_filter);
        info!("Searching PubMed (pass 1, with journals): {}", clean_query);
        let mut id_list = self.esearch(&first_pass, max_results).await?;

        // Pass 2: broadened to any journal with a specialty filter
        if id_list.is_empty() {
            let broadened = self.broadened_query(&clean_query, &date_filter);
            info!("Searching PubMed (pass 2, broadened): {}", clean_query);
            id_list = self.esearch(&broadened, max_results).await?;
        }

        if id_list.is_empty() {
            warn!("No results found for: {}", raw_query);
            return Ok(Vec::new());
        }

        self.efetch(&id_list).await
    }

    fn date_filter(&self, months_back: u32) -> String {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(months_back) * 30);
        format!(
            "{}:{}[DP]",
            start.format("%Y/%m/%d"),
            end.format("%Y/%m/%d")
        )
    }

    fn journal_filter(&self) -> String {
        self.target_journals
            .iter()
            .map(|j| format!("\"{j}\"[Journal]"))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    fn first_pass_query(&self, clean_query: &str, date_filter: &str) -> String {
        format!(
            "({clean_query}) AND ({}) AND ({date_filter})",
            self.journal_filter()
        )
    }

    fn broadened_query(&self, clean_query: &str, date_filter: &str) -> String {
        format!("({clean_query}) AND (plastic surgery OR aesthetic OR cosmetic) AND ({date_filter})")
    }

    /// Execute an esearch and return the PMID list
    async fn esearch(&self, term: &str, max_results: u32) -> Result<Vec<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("term", term),
                ("retmax", &max_results.to_string()),
                ("sort", "relevance"),
                ("retmode", "json"),
                ("email", &self.email),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PubMed {
                code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let payload: ESearchResponse = response.json().await?;
        debug!("esearch returned {} ids", payload.esearchresult.idlist.len());
        Ok(payload.esearchresult.idlist)
    }

    /// Fetch and flatten article records for a PMID list
    async fn efetch(&self, id_list: &[String]) -> Result<Vec<Article>> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("id", &id_list.join(",")),
                ("rettype", "abstract"),
                ("retmode", "xml"),
                ("email", &self.email),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PubMed {
                code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let xml = response.text().await?;
        let articles = parse_efetch(&xml)?;
        info!("Successfully parsed {} articles", articles.len());
        Ok(articles)
    }
}

/// Flatten a PubmedArticleSet XML payload into article records.
///
/// A malformed article skips that article only; a malformed document is an
/// error the caller converts to an empty result.
pub(crate) fn parse_efetch(xml: &str) -> Result<Vec<Article>> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| Error::Parse {
        context: "pubmed efetch".to_string(),
        message: e.to_string(),
    })?;

    let mut articles = Vec::new();

    for node in doc
        .descendants()
        .filter(|n| n.has_tag_name("PubmedArticle"))
    {
        match parse_article(&node) {
            Some(article) => articles.push(article),
            None => warn!("Skipping article with missing citation data"),
        }
    }

    Ok(articles)
}

fn parse_article(node: &roxmltree::Node) -> Option<Article> {
    let citation = node
        .children()
        .find(|n| n.has_tag_name("MedlineCitation"))?;
    let article = citation.children().find(|n| n.has_tag_name("Article"))?;

    let pmid = citation
        .children()
        .find(|n| n.has_tag_name("PMID"))
        .and_then(|n| n.text())
        .unwrap_or_default()
        .to_string();

    let title = child_text(&article, "ArticleTitle").unwrap_or_else(|| "No title".to_string());

    // First author as "LastName Initials et al."
    let authors = article
        .children()
        .find(|n| n.has_tag_name("AuthorList"))
        .and_then(|list| list.children().find(|n| n.has_tag_name("Author")))
        .map(|first| {
            let last = child_text(&first, "LastName").unwrap_or_default();
            let initials = child_text(&first, "Initials").unwrap_or_default();
            format!("{} {} et al.", last, initials).trim().to_string()
        })
        .filter(|s| s != "et al.")
        .unwrap_or_else(|| "Unknown".to_string());

    let journal = article.children().find(|n| n.has_tag_name("Journal"));
    let journal_title = journal
        .and_then(|j| child_text(&j, "Title"))
        .unwrap_or_else(|| "Unknown Journal".to_string());

    let date = journal
        .and_then(|j| j.children().find(|n| n.has_tag_name("JournalIssue")))
        .and_then(|i| i.children().find(|n| n.has_tag_name("PubDate")))
        .map(|d| {
            let month = child_text(&d, "Month").unwrap_or_default();
            let year = child_text(&d, "Year").unwrap_or_default();
            format!("{month} {year}").trim().to_string()
        })
        .unwrap_or_default();

    // Abstract segments joined with spaces
    let abstract_text = article
        .children()
        .find(|n| n.has_tag_name("Abstract"))
        .map(|a| {
            a.children()
                .filter(|n| n.has_tag_name("AbstractText"))
                .filter_map(|n| n.text())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "No abstract available".to_string());

    // DOI from the PubmedData article id list
    let doi = node
        .children()
        .find(|n| n.has_tag_name("PubmedData"))
        .and_then(|d| d.children().find(|n| n.has_tag_name("ArticleIdList")))
        .and_then(|list| {
            list.children()
                .find(|n| n.has_tag_name("ArticleId") && n.attribute("IdType") == Some("doi"))
        })
        .and_then(|n| n.text())
        .map(str::to_string);

    let url = if pmid.is_empty() {
        None
    } else {
        Some(Article::pubmed_url(&pmid))
    };

    Some(Article {
        title,
        authors,
        journal: journal_title,
        date,
        abstract_text,
        pmid,
        doi,
        url,
    })
}

fn child_text(node: &roxmltree::Node, tag: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

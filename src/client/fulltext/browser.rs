use super::{FullTextSource, SourceKind};
use crate::client::{Article, Doi};
use crate::config::FullTextConfig;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Authenticated publisher-page lookup.
///
/// Resolves the article's DOI through doi.org with an institutional cookie
/// session, then greps the rendered landing page for the first anchor whose
/// href looks like a PDF. Slowest source, so it sits last in the cascade and
/// is disabled unless cookies are configured.
pub struct BrowserSource {
    client: reqwest::Client,
    resolver_base: String,
}

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl BrowserSource {
    pub fn new(fulltext: &FullTextConfig) -> Result<Self> {
        Self::with_resolver_base(fulltext, "https://doi.org")
    }

    /// Custom DOI resolver endpoint, used by tests
    pub fn with_resolver_base(fulltext: &FullTextConfig, resolver_base: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookies) = &fulltext.browser_cookies {
            if let Ok(value) = HeaderValue::from_str(cookies) {
                headers.insert(COOKIE, value);
            } else {
                warn!("Configured browser cookies contain invalid header bytes, ignoring");
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fulltext.timeout_secs.max(30)))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            resolver_base: resolver_base.to_string(),
        })
    }

    /// Pull the first PDF-looking anchor out of a landing page
    fn find_pdf_link(html: &str, page_url: &url::Url) -> Option<String> {
        let document = Html::parse_document(html);
        let anchors = Selector::parse("a[href]").expect("valid selector");

        for anchor in document.select(&anchors) {
            let href = anchor.value().attr("href")?;
            let lowered = href.to_lowercase();
            if lowered.contains(".pdf") || lowered.contains("/pdf") {
                if let Ok(absolute) = page_url.join(href) {
                    return Some(absolute.to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl FullTextSource for BrowserSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Browser
    }

    async fn resolve(&self, article: &Article) -> Result<Option<String>> {
        let Some(raw_doi) = article.doi.as_deref() else {
            return Ok(None);
        };
        let doi = Doi::new(raw_doi)?;

        let doi_url = format!("{}/{}", self.resolver_base, doi.as_str());
        info!("Navigating to: {}", doi_url);

        let response = self.client.get(&doi_url).send().await?;
        let final_url = response.url().clone();
        debug!("Landed on: {}", final_url);

        let html = response.text().await?;
        match Self::find_pdf_link(&html, &final_url) {
            Some(pdf_url) => {
                info!("Found PDF link: {}", pdf_url);
                Ok(Some(pdf_url))
            }
            None => {
                warn!("No PDF link found for DOI: {}", doi);
                Ok(None)
            }
        }
    }
}

pub mod browser;
pub mod pmc;
pub mod unpaywall;

pub use browser::BrowserSource;
pub use pmc::PmcSource;
pub use unpaywall::UnpaywallSource;

use crate::client::Article;
use crate::config::{FullTextConfig, PubMedConfig};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Which provider produced a full-text hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    Pmc,
    Unpaywall,
    Browser,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Pmc => write!(f, "PMC"),
            SourceKind::Unpaywall => write!(f, "Unpaywall"),
            SourceKind::Browser => write!(f, "Browser"),
        }
    }
}

/// A resolved full-text location
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedFullText {
    pub pdf_url: String,
    pub source: SourceKind,
}

/// A single independently fallible full-text lookup
#[async_trait]
pub trait FullTextSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Look up a PDF URL for the article. `Ok(None)` means "not available
    /// here"; an error is treated the same way by the cascade.
    async fn resolve(&self, article: &Article) -> Result<Option<String>>;
}

/// Ordered short-circuit cascade over the full-text sources.
///
/// Sources run strictly in construction order (PMC, Unpaywall, then the
/// optional browser session); the first hit wins and a failing source never
/// aborts the cascade.
pub struct FullTextResolver {
    sources: Vec<Box<dyn FullTextSource>>,
}

impl FullTextResolver {
    pub fn new(pubmed: &PubMedConfig, fulltext: &FullTextConfig) -> Result<Self> {
        let mut sources: Vec<Box<dyn FullTextSource>> = vec![
            Box::new(PmcSource::new(pubmed, fulltext)?),
            Box::new(UnpaywallSource::new(fulltext, &pubmed.email)?),
        ];
        if fulltext.use_browser {
            sources.push(Box::new(BrowserSource::new(fulltext)?));
        }
        Ok(Self { sources })
    }

    /// Custom source list, used by tests and callers with special needs
    #[must_use]
    pub fn with_sources(sources: Vec<Box<dyn FullTextSource>>) -> Self {
        Self { sources }
    }

    /// Try each source in priority order, returning the first hit
    pub async fn resolve(&self, article: &Article) -> Option<ResolvedFullText> {
        info!("Trying to get full text for PMID {}", article.pmid);

        for source in &self.sources {
            match source.resolve(article).await {
                Ok(Some(pdf_url)) => {
                    info!("Found full text via {}", source.kind());
                    return Some(ResolvedFullText {
                        pdf_url,
                        source: source.kind(),
                    });
                }
                Ok(None) => {
                    debug!("{} has no full text for PMID {}", source.kind(), article.pmid);
                }
                Err(e) => {
                    warn!("{} lookup failed for PMID {}: {}", source.kind(), article.pmid, e);
                }
            }
        }

        info!("No full text available for PMID {}", article.pmid);
        None
    }
}

use crate::client::{Article, FullTextResolver, PdfDownloader, PubMedClient};
use crate::config::Config;
use crate::delivery::{EmailSender, SheetsClient};
use crate::llm::{
    AnthropicClient, CaseExtraction, CaseParser, GeminiClient, Finding, Summarizer,
    SynthesisService,
};
use crate::pdf::{Figure, PdfExtractor};
use crate::report::SynthesisReport;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Smart search casts a wider net than topic reports
const SMART_SEARCH_MONTHS_BACK: u32 = 24;
const SMART_SEARCH_MAX_RESULTS: u32 = 10;

/// Inline images per emailed digest
const DIGEST_MAX_FIGURES: usize = 8;

/// Result of one case-driven smart search
#[derive(Debug, Serialize)]
pub struct SmartSearchOutcome {
    pub ai_extraction: CaseExtraction,
    pub articles: Vec<Article>,
    pub ai_summary: String,
    pub detailed_findings: Vec<Finding>,
}

/// Result of one sheet synchronization run
#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub status: String,
    pub results: Vec<String>,
}

/// Result of one emailed digest run
#[derive(Debug, Serialize)]
pub struct DigestOutcome {
    pub procedure: String,
    pub articles: usize,
    pub full_texts: usize,
    pub figures: usize,
}

/// Wires the search, synthesis, and delivery components into the three
/// top-level operations the service exposes.
pub struct IntelligenceService {
    pubmed: PubMedClient,
    fulltext: FullTextResolver,
    downloader: PdfDownloader,
    case_parser: CaseParser,
    summarizer: Summarizer,
    synthesis: SynthesisService,
    sheets: Option<SheetsClient>,
    email: Option<EmailSender>,
    default_months_back: u32,
    default_max_results: u32,
}

impl IntelligenceService {
    pub fn from_config(config: &Config) -> Result<Self> {
        let claude = Arc::new(AnthropicClient::new(&config.llm)?);
        let gemini = Arc::new(GeminiClient::new(&config.llm)?);

        let sheets = if config.sheets.spreadsheet_id.is_empty() {
            info!("Sheets sync disabled: no spreadsheet configured");
            None
        } else {
            Some(SheetsClient::new(&config.sheets)?)
        };

        let email = if config.email.sender.is_empty() {
            info!("Email digest disabled: no sender configured");
            None
        } else {
            Some(EmailSender::new(&config.email)?)
        };

        Ok(Self {
            pubmed: PubMedClient::new(&config.pubmed)?,
            fulltext: FullTextResolver::new(&config.pubmed, &config.fulltext)?,
            downloader: PdfDownloader::new(&config.downloads)?,
            case_parser: CaseParser::new(claude.clone()),
            summarizer: Summarizer::new(claude),
            synthesis: SynthesisService::new(gemini),
            sheets,
            email,
            default_months_back: config.pubmed.months_back,
            default_max_results: config.pubmed.max_results,
        })
    }

    /// Search recent literature on a topic and synthesize it into a report.
    pub async fn generate_report(
        &self,
        query: &str,
        months_back: Option<u32>,
    ) -> Result<SynthesisReport> {
        let months_back = months_back.unwrap_or(self.default_months_back);
        let articles = self
            .pubmed
            .search(query, months_back, self.default_max_results)
            .await;
        self.synthesis.generate_report(query, &articles).await
    }

    /// Full case-driven search: parse the case, search with the generated
    /// terms, then summarize.
    pub async fn smart_search(&self, case_description: &str) -> Result<SmartSearchOutcome> {
        let case_description = case_description.trim();
        if case_description.is_empty() {
            return Err(Error::InvalidInput {
                field: "case_description".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        let extraction = self.case_parser.parse_case(case_description).await;
        info!(
            "Searching with {} generated terms",
            extraction.search_terms.len()
        );

        let query = combined_query(&extraction.search_terms);
        let articles = self
            .pubmed
            .search(&query, SMART_SEARCH_MONTHS_BACK, SMART_SEARCH_MAX_RESULTS)
            .await;
        info!("Found {} articles", articles.len());

        let ai_summary = self
            .summarizer
            .generate_summary(&articles, &extraction.procedure)
            .await;
        let detailed_findings = self
            .summarizer
            .detailed_findings(&articles, &extraction.procedure)
            .await;

        Ok(SmartSearchOutcome {
            ai_extraction: extraction,
            articles,
            ai_summary,
            detailed_findings,
        })
    }

    /// Generate and write back a report for each tracked procedure.
    ///
    /// Per-procedure failures are recorded and the run continues; only a
    /// failure to read the procedure list aborts.
    pub async fn sync_sheet(&self, limit: usize) -> Result<SyncOutcome> {
        let Some(sheets) = &self.sheets else {
            return Err(Error::Config(
                "sheet sync requested but no spreadsheet is configured".to_string(),
            ));
        };

        let procedures = sheets.procedures().await?;
        let mut results = Vec::new();

        for item in procedures.into_iter().take(limit) {
            let outcome = async {
                let report = self.generate_report(&item.name, None).await?;
                sheets.update_procedure(item.row, &report).await
            }
            .await;

            match outcome {
                Ok(()) => results.push(format!("Updated {}", item.name)),
                Err(e) => {
                    warn!("Sheet sync failed for {}: {}", item.name, e);
                    results.push(format!("Failed {}: {e}", item.name));
                }
            }
        }

        Ok(SyncOutcome {
            status: "completed".to_string(),
            results,
        })
    }

    /// Research one procedure end to end and email the digest: search,
    /// summarize, resolve and extract full texts, deliver over SMTP.
    pub async fn send_digest(&self, procedure: &str) -> Result<DigestOutcome> {
        let Some(email) = &self.email else {
            return Err(Error::Config(
                "digest requested but no email sender is configured".to_string(),
            ));
        };

        let articles = self
            .pubmed
            .search(procedure, self.default_months_back, self.default_max_results)
            .await;
        let summary = self.summarizer.generate_summary(&articles, procedure).await;
        let findings = self.summarizer.detailed_findings(&articles, procedure).await;

        let mut full_texts = 0usize;
        let mut figures: Vec<(String, Figure)> = Vec::new();
        for article in &articles {
            if figures.len() >= DIGEST_MAX_FIGURES {
                break;
            }
            let Some(resolved) = self.fulltext.resolve(article).await else {
                continue;
            };
            let Some(path) = self
                .downloader
                .download(&resolved.pdf_url, &article.pmid, procedure)
                .await
            else {
                continue;
            };
            full_texts += 1;

            // lopdf is synchronous; keep it off the async workers
            let extracted =
                tokio::task::spawn_blocking(move || PdfExtractor::open(&path).map(|x| x.extract_figures()))
                    .await;
            let article_figures = match extracted {
                Ok(Ok(figs)) => figs,
                Ok(Err(e)) => {
                    warn!("Could not extract figures for PMID {}: {}", article.pmid, e);
                    continue;
                }
                Err(e) => {
                    warn!("Figure extraction task failed: {}", e);
                    continue;
                }
            };

            for figure in article_figures {
                if figures.len() >= DIGEST_MAX_FIGURES {
                    break;
                }
                // Inline parts are declared image/jpeg, so only attach those
                if figure.format == "jpeg" {
                    let cid = format!("fig{}", figures.len() + 1);
                    figures.push((cid, figure));
                }
            }
        }

        let subject = format!("Surgical Scout Digest: {procedure}");
        let body = digest_html(procedure, &summary, &findings, &figures);
        let images: Vec<(String, Vec<u8>)> = figures
            .iter()
            .map(|(cid, figure)| (cid.clone(), figure.data.clone()))
            .collect();

        if images.is_empty() {
            email.send_digest(&subject, &body).await?;
        } else {
            email.send_digest_with_images(&subject, &body, &images).await?;
        }

        Ok(DigestOutcome {
            procedure: procedure.to_string(),
            articles: articles.len(),
            full_texts,
            figures: figures.len(),
        })
    }
}

fn digest_html(
    procedure: &str,
    summary: &str,
    findings: &[Finding],
    figures: &[(String, Figure)],
) -> String {
    let mut html = format!("<h2>{procedure} Literature Digest</h2>\n<p>{summary}</p>\n<hr>\n");

    if findings.is_empty() {
        html.push_str(
            "<p>No significant technique or product updates found in recent literature.</p>\n",
        );
    }
    for finding in findings {
        html.push_str(&format!("<h3>{}</h3>\n", finding.title));
        html.push_str(&format!(
            "<p><strong>Authors:</strong> {}<br>\n<strong>Journal:</strong> {}, {}<br>\n<strong>Takeaway:</strong> {}</p>\n",
            finding.authors, finding.journal, finding.date, finding.takeaway
        ));
        if !finding.url.is_empty() {
            html.push_str(&format!("<p><a href='{}'>View on PubMed</a></p>\n", finding.url));
        }
        html.push_str("<hr>\n");
    }

    for (cid, figure) in figures {
        html.push_str(&format!("<div><img src=\"cid:{cid}\" alt=\"Figure\">"));
        if let Some(caption) = &figure.caption {
            html.push_str(&format!("<p><em>{caption}</em></p>"));
        }
        html.push_str("</div>\n");
    }

    html
}

/// OR-join generated search terms so one query covers all of them
fn combined_query(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("({t})"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

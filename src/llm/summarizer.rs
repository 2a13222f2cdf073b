use super::{articles_context, ChatModel, ChatOptions};
use crate::client::Article;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Abstracts fed into the overview summary
const SUMMARY_ARTICLE_LIMIT: usize = 10;
/// Abstracts given a per-article takeaway
const FINDINGS_ARTICLE_LIMIT: usize = 8;

/// One article with its single-sentence clinical takeaway
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub date: String,
    pub url: String,
    pub pmid: String,
    pub takeaway: String,
}

/// Generates clinical summaries and per-article takeaways from abstracts.
pub struct Summarizer {
    model: Arc<dyn ChatModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// A 2-3 sentence clinical summary across the top abstracts.
    ///
    /// Never fails: zero articles and model errors both produce fixed
    /// degraded text.
    pub async fn generate_summary(&self, articles: &[Article], procedure: &str) -> String {
        if articles.is_empty() {
            return "No recent literature found for this procedure.".to_string();
        }

        let capped = &articles[..articles.len().min(SUMMARY_ARTICLE_LIMIT)];
        let prompt = summary_prompt(capped, procedure);
        info!("Generating clinical summary from {} articles", articles.len());

        let options = ChatOptions {
            max_tokens: 512,
            temperature: 0.5,
        };

        match self.model.complete(&prompt, options).await {
            Ok(summary) => {
                let summary = summary.trim().to_string();
                let preview: String = summary.chars().take(100).collect();
                info!("Generated summary: {}", preview);
                summary
            }
            Err(e) => {
                error!("Error generating summary: {}", e);
                format!(
                    "Unable to generate AI summary. Found {} relevant articles on {}.",
                    articles.len(),
                    procedure
                )
            }
        }
    }

    /// One actionable takeaway per article. Articles the model flags with
    /// "SKIP" or that error out are dropped from the result.
    pub async fn detailed_findings(&self, articles: &[Article], procedure: &str) -> Vec<Finding> {
        let mut findings = Vec::new();

        for article in articles.iter().take(FINDINGS_ARTICLE_LIMIT) {
            let prompt = takeaway_prompt(article, procedure);
            let options = ChatOptions {
                max_tokens: 150,
                temperature: 0.3,
            };

            let takeaway = match self.model.complete(&prompt, options).await {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    let preview: String = article.title.chars().take(50).collect();
                    error!("Error processing article {}: {}", preview, e);
                    continue;
                }
            };

            if takeaway.contains("SKIP") {
                continue;
            }

            findings.push(Finding {
                title: article.title.clone(),
                authors: article.authors.clone(),
                journal: article.journal.clone(),
                date: article.date.clone(),
                url: article.url.clone().unwrap_or_default(),
                pmid: article.pmid.clone(),
                takeaway,
            });
        }

        info!("Generated {} one-line takeaways", findings.len());
        findings
    }
}

fn summary_prompt(articles: &[Article], procedure: &str) -> String {
    format!(
        r#"You are an expert plastic surgeon reviewing recent literature on {procedure}.

Analyze the abstracts below and create a 2-3 sentence CLINICAL SUMMARY that:
1. Highlights key complication rates or outcome data (with specific percentages/numbers)
2. Mentions important technical considerations or best practices
3. Notes any emerging trends or recent findings

Focus on ACTIONABLE information a surgeon would want to know before performing this procedure.

Be specific with numbers/percentages when available. Write in a clear, professional tone.

Return ONLY the 2-3 sentence summary. No preamble, no markdown, no section headers.

Articles to analyze:
{}"#,
        articles_context(articles, false)
    )
}

fn takeaway_prompt(article: &Article, procedure: &str) -> String {
    format!(
        r#"You are an expert plastic surgeon analyzing a research article on {procedure}.

Review this abstract and extract ONE KEY ACTIONABLE TAKEAWAY in a single sentence.

Article Title: {}
Authors: {}
Abstract: {}

Write ONE sentence (max 150 characters) that captures the most important clinical finding or technique from this study. Focus on:
- Specific outcome data with numbers/percentages
- Novel techniques or technical modifications
- Key complications or prevention strategies
- Important patient selection criteria

If the abstract doesn't contain actionable clinical information, return: "SKIP"

Return ONLY the single sentence. No preamble, no explanation."#,
        article.title, article.authors, article.abstract_text
    )
}

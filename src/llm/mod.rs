pub mod anthropic;
pub mod case_parser;
pub mod gemini;
pub mod summarizer;
pub mod synthesis;

pub use anthropic::AnthropicClient;
pub use case_parser::{CaseExtraction, CaseParser};
pub use gemini::GeminiClient;
pub use summarizer::{Finding, Summarizer};
pub use synthesis::SynthesisService;

use crate::client::Article;
use crate::Result;
use async_trait::async_trait;

/// Per-request generation parameters
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.5,
        }
    }
}

/// A chat-completion backend. Orchestrators depend on this trait so the
/// provider can be swapped or mocked.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable provider name, used in error reporting
    fn provider(&self) -> &'static str;

    async fn complete(&self, prompt: &str, options: ChatOptions) -> Result<String>;
}

/// Strip Markdown code fences that models sometimes wrap JSON in,
/// despite being told not to.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Flatten articles into the numbered-block context format shared by the
/// orchestrator prompts.
pub(crate) fn articles_context(articles: &[Article], include_url: bool) -> String {
    let mut out = String::new();
    for (i, article) in articles.iter().enumerate() {
        out.push_str(&format!("\n--- Article {} ---\n", i + 1));
        out.push_str(&format!("Title: {}\n", article.title));
        out.push_str(&format!("Authors: {}\n", article.authors));
        out.push_str(&format!("Journal: {} ({})\n", article.journal, article.date));
        out.push_str(&format!("Abstract: {}\n", article.abstract_text));
        if include_url {
            if let Some(url) = &article.url {
                out.push_str(&format!("URL: {url}\n"));
            }
        }
    }
    out
}

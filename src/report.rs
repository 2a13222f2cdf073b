use serde::{Deserialize, Serialize};

/// Where a technique or product stands in current practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictStatus {
    In,
    Out,
    Evolving,
}

/// One synthesized publication card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCard {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub date: String,
    /// Problem or gap the paper addresses
    pub why: String,
    /// Technique or device details
    pub how: String,
    /// Key findings, effect sizes, p-values
    pub stats: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// One row of the verdict table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub topic: String,
    pub verdict: VerdictStatus,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// The full synthesized digest for one topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub header: String,
    pub articles: Vec<ArticleCard>,
    pub verdicts: Vec<Verdict>,
}

impl SynthesisReport {
    /// Placeholder report for topics with no recent publications
    pub fn empty(query: &str) -> Self {
        Self {
            header: format!("{query} Update - No Recent Data"),
            articles: Vec::new(),
            verdicts: vec![Verdict {
                topic: query.to_string(),
                verdict: VerdictStatus::Evolving,
                reasoning: Some("No recent publications found in target journals.".to_string()),
            }],
        }
    }

    /// Render the report as scannable Markdown: numbered publication cards
    /// followed by the verdict table.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.header);

        out.push_str("## Key Publications\n\n");
        for (idx, article) in self.articles.iter().enumerate() {
            out.push_str(&format!("### {}. {}\n", idx + 1, article.title));
            out.push_str(&format!(
                "**Source:** {} ({}) | **Authors:** {}\n\n",
                article.journal, article.date, article.authors
            ));
            out.push_str(&format!("**The Why:** {}\n\n", article.why));
            out.push_str(&format!("**The How:** {}\n\n", article.how));
            out.push_str(&format!("**The Stats:** {}\n\n", article.stats));
            if let Some(url) = &article.url {
                out.push_str(&format!("[Read Full Paper]({url})\n\n"));
            }
            out.push_str("---\n\n");
        }

        out.push_str("## The Resident's Verdict\n\n");
        out.push_str("| Topic | What's In | What's Out/Evolving |\n");
        out.push_str("| :--- | :--- | :--- |\n");

        for verdict in &self.verdicts {
            let reasoning = verdict.reasoning.as_deref().unwrap_or("");
            let (in_cell, out_cell) = match verdict.verdict {
                VerdictStatus::In => (format!("✅ **YES**<br>{reasoning}"), String::new()),
                VerdictStatus::Out => (String::new(), format!("❌ **NO**<br>{reasoning}")),
                VerdictStatus::Evolving => (String::new(), format!("⚠️ **WATCH**<br>{reasoning}")),
            };
            out.push_str(&format!("| {} | {} | {} |\n", verdict.topic, in_cell, out_cell));
        }

        out
    }
}

impl VerdictStatus {
    /// Emoji form used in spreadsheet verdict cells
    pub fn emoji(&self) -> &'static str {
        match self {
            VerdictStatus::In => "✅",
            VerdictStatus::Out => "❌",
            VerdictStatus::Evolving => "⚠️",
        }
    }
}

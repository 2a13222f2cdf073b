use super::{articles_context, strip_code_fences, ChatModel, ChatOptions};
use crate::client::Article;
use crate::report::SynthesisReport;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Synthesizes a batch of abstracts into a structured intelligence report.
pub struct SynthesisService {
    model: Arc<dyn ChatModel>,
}

impl SynthesisService {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Build the full report for a topic.
    ///
    /// Zero articles short-circuits to the placeholder report. A response the
    /// model produced but that fails schema validation is an error; the
    /// caller decides whether to retry or surface it.
    pub async fn generate_report(
        &self,
        query: &str,
        articles: &[Article],
    ) -> Result<SynthesisReport> {
        if articles.is_empty() {
            info!("No articles for '{}', returning placeholder report", query);
            return Ok(SynthesisReport::empty(query));
        }

        let prompt = synthesis_prompt(query, articles);
        info!("Synthesizing {} articles for '{}'", articles.len(), query);

        let options = ChatOptions {
            max_tokens: 4096,
            temperature: 0.5,
        };
        let response = self.model.complete(&prompt, options).await?;

        serde_json::from_str::<SynthesisReport>(strip_code_fences(&response)).map_err(|e| {
            error!("Failed to parse synthesis output: {}", e);
            Error::Parse {
                context: "synthesis report".to_string(),
                message: e.to_string(),
            }
        })
    }
}

fn synthesis_prompt(query: &str, articles: &[Article]) -> String {
    format!(
        r#"You are "The Aesthetic Intel Architect" - a surgical intelligence system for a Plastic Surgery Resident.

Your Mission: Extract OR-READY INTEL from recent literature on "{query}".

Input Data:
{}

Critical Instructions:
You are NOT writing a literature review. You are providing ACTIONABLE INTELLIGENCE for tomorrow's OR.

Focus on extracting:
1. **NEW SURGICAL TECHNIQUES**: Novel incision patterns, procedural modifications, surgical approaches
   - Example: "L-shaped vs J-shaped breast reduction", "Dual-plane pocket dissection"

2. **SPECIFIC PROTOCOLS**: Exact steps, settings, sequences that can be replicated
   - Example: "30-pass emulsification through 2.4->1.2mm connectors", "VASER at 60% power, 36kHz"

3. **DEVICES & PRODUCTS**: Brand names, specific implants, mesh types, instruments
   - Example: "Allergan Inspira SRX 350cc", "TiLOOP Bra mesh", "Tulip GEMS connectors"

4. **NOVEL APPLICATIONS**: New uses for existing techniques
   - Example: "Nanofat for skin quality (not volume)", "Mesh for lower pole support in revision"

5. **OPTIMIZATION STRATEGIES**: How to get better outcomes with current techniques
   - Example: "Add PRP 10% v/v to improve retention", "Pre-op 3D imaging reduces revision rate"

For each article card, the "how" field MUST include:
- Exact technique/protocol (step-by-step if available)
- Specific devices/products/settings
- Patient selection criteria or contraindications

The "stats" field MUST include:
- Quantitative outcomes (retention %, complication rates, p-values)
- Comparison to standard technique if available

Output Format:
Return ONLY valid JSON matching this schema:
{{
    "header": "{query} Update - [Current Date]",
    "articles": [
        {{
            "title": "Title of paper",
            "authors": "First author et al.",
            "journal": "Journal Name",
            "date": "Pub Date",
            "why": "What clinical problem does this solve? What's the innovation?",
            "how": "SPECIFIC technique/protocol/device. Include: exact steps, settings, product names, contraindications.",
            "stats": "Quantitative outcomes: retention %, complication %, p-values, comparison to standard.",
            "url": "Link to paper"
        }}
    ],
    "verdicts": [
        {{
            "topic": "{query}",
            "verdict": "In" | "Out" | "Evolving",
            "reasoning": "Is this ready for the OR? What's the evidence level?"
        }}
    ]
}}

CRITICAL: Return ONLY the JSON. No markdown, no backticks, no explanations."#,
        articles_context(articles, true)
    )
}

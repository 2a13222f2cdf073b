use super::{strip_code_fences, ChatModel, ChatOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Structured clinical data extracted from a free-text case description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExtraction {
    pub procedure: String,
    pub patient_factors: Vec<String>,
    pub timing: String,
    pub search_terms: Vec<String>,
}

impl CaseExtraction {
    /// Degraded extraction when the model is unreachable or returns garbage:
    /// the raw description becomes both the procedure and the only search term.
    pub fn fallback(case_description: &str) -> Self {
        Self {
            procedure: case_description.to_string(),
            patient_factors: vec!["Unable to extract specific factors".to_string()],
            timing: "not specified".to_string(),
            search_terms: vec![case_description.to_string()],
        }
    }
}

/// Turns shorthand case descriptions like "58F, DIEP flap, prior radiation"
/// into a structured extraction with optimized search terms.
pub struct CaseParser {
    model: Arc<dyn ChatModel>,
}

impl CaseParser {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Parse a case description. Never fails: any model or parse error
    /// degrades to [`CaseExtraction::fallback`].
    pub async fn parse_case(&self, case_description: &str) -> CaseExtraction {
        let prompt = build_prompt(case_description);
        let preview: String = case_description.chars().take(100).collect();
        info!("Parsing case description: {}", preview);

        let options = ChatOptions {
            max_tokens: 1024,
            temperature: 0.3,
        };

        let response = match self.model.complete(&prompt, options).await {
            Ok(text) => text,
            Err(e) => {
                error!("Error parsing case description: {}", e);
                return CaseExtraction::fallback(case_description);
            }
        };

        match serde_json::from_str::<CaseExtraction>(strip_code_fences(&response)) {
            Ok(extraction) => {
                info!(
                    "Parsed case - procedure: {}, {} search terms",
                    extraction.procedure,
                    extraction.search_terms.len()
                );
                extraction
            }
            Err(e) => {
                error!("Model returned unparseable extraction: {}", e);
                CaseExtraction::fallback(case_description)
            }
        }
    }
}

fn build_prompt(case_description: &str) -> String {
    format!(
        r#"You are an expert plastic surgeon and medical literature researcher.

Analyze this surgical case description and extract structured clinical data:

CASE: {case_description}

Your task:
1. Identify the PRIMARY PROCEDURE/SURGERY TYPE
2. Extract PATIENT DEMOGRAPHICS and KEY FACTORS (age, sex, comorbidities, prior surgeries, anatomical variations)
3. Identify TIMING INDICATORS (immediate, delayed, revision, etc.)
4. Generate 4-6 OPTIMIZED PUBMED SEARCH TERMS that will find the most clinically relevant literature

For search terms:
- Combine procedure with key modifiers (e.g., "DIEP flap radiation complications")
- Include common medical synonyms (e.g., "autologous breast reconstruction")
- Focus on complications, outcomes, and technical considerations
- Use MeSH-like terminology that PubMed will recognize

Return ONLY valid JSON matching this exact structure:
{{
    "procedure": "Full procedural name",
    "patient_factors": ["factor 1", "factor 2", "factor 3"],
    "timing": "timing descriptor or 'not specified'",
    "search_terms": [
        "search term 1",
        "search term 2",
        "search term 3",
        "search term 4"
    ]
}}

CRITICAL: Return ONLY the JSON object. No markdown, no backticks, no explanations."#
    )
}

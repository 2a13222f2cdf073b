use crate::config::SheetsConfig;
use crate::report::{SynthesisReport, VerdictStatus};
use crate::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

/// One tracked procedure and the 1-based sheet row it lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureRow {
    pub name: String,
    pub row: u32,
}

/// Google Sheets values API client for the procedure tracking sheet.
///
/// Column A holds procedure names; the verdict and article-link columns are
/// configurable because the sheet layout belongs to its owner, not to us.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
    verdict_column: u32,
    links_column: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self> {
        if config.spreadsheet_id.is_empty() {
            return Err(Error::Config("sheets spreadsheet_id is not set".to_string()));
        }
        if config.token.is_empty() {
            return Err(Error::Config("sheets token is not set".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            token: config.token.clone(),
            verdict_column: config.verdict_column,
            links_column: config.links_column,
        })
    }

    /// Read all procedures from column A, skipping the header row.
    pub async fn procedures(&self) -> Result<Vec<ProcedureRow>> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/A:A",
            self.base_url, self.spreadsheet_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let payload: ValueRange = self.check(response).await?.json().await?;

        let mut result = Vec::new();
        for (idx, row) in payload.values.iter().enumerate().skip(1) {
            if let Some(name) = row.first() {
                let name = name.trim();
                if !name.is_empty() {
                    result.push(ProcedureRow {
                        name: name.to_string(),
                        row: (idx + 1) as u32,
                    });
                }
            }
        }

        info!("Read {} procedures from sheet", result.len());
        Ok(result)
    }

    /// Write the verdict and article links for one procedure row.
    pub async fn update_procedure(&self, row: u32, report: &SynthesisReport) -> Result<()> {
        let verdict_text = format_verdict(report);
        let links_text = format_links(report);

        self.update_cell(row, self.verdict_column, &verdict_text)
            .await?;
        self.update_cell(row, self.links_column, &links_text).await?;

        info!(
            "Updated row {} for {}",
            row,
            report
                .verdicts
                .first()
                .map(|v| v.topic.as_str())
                .unwrap_or("Unknown")
        );
        Ok(())
    }

    async fn update_cell(&self, row: u32, column: u32, value: &str) -> Result<()> {
        let range = format!("{}{}", column_letter(column), row);
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        );
        let body = json!({ "values": [[value]] });

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    /// Map auth failures to a fatal error; callers must not retry those.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("Sheets API rejected credentials ({})", response.status());
                Err(Error::AuthenticationFailed(
                    "Google Sheets API rejected the configured token".to_string(),
                ))
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Sheet(format!("HTTP {status}: {body}")))
            }
            _ => Ok(response),
        }
    }
}

fn format_verdict(report: &SynthesisReport) -> String {
    match report.verdicts.first() {
        Some(v) => {
            let label = match v.verdict {
                VerdictStatus::In => "IN",
                VerdictStatus::Out => "OUT",
                VerdictStatus::Evolving => "EVOLVING",
            };
            format!(
                "{} {}: {}",
                v.verdict.emoji(),
                label,
                v.reasoning.as_deref().unwrap_or("")
            )
        }
        None => "No verdict available.".to_string(),
    }
}

fn format_links(report: &SynthesisReport) -> String {
    let mut links = String::new();
    for article in report.articles.iter().take(3) {
        links.push_str(&format!(
            "• {} ({})\n  {}\n\n",
            article.title,
            article.journal,
            article.url.as_deref().unwrap_or("")
        ));
    }
    links.trim().to_string()
}

/// 1-based column number to A1-notation letters
fn column_letter(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ArticleCard, Verdict};

    fn report() -> SynthesisReport {
        SynthesisReport {
            header: "X".to_string(),
            articles: vec![ArticleCard {
                title: "Paper".to_string(),
                authors: "A".to_string(),
                journal: "PRS".to_string(),
                date: "2026".to_string(),
                why: String::new(),
                how: String::new(),
                stats: String::new(),
                url: Some("https://example.com/p".to_string()),
            }],
            verdicts: vec![Verdict {
                topic: "Lipofilling".to_string(),
                verdict: VerdictStatus::Evolving,
                reasoning: Some("Early data.".to_string()),
            }],
        }
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(5), "E");
        assert_eq!(column_letter(10), "J");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
    }

    #[test]
    fn test_format_verdict() {
        assert_eq!(format_verdict(&report()), "⚠️ EVOLVING: Early data.");

        let mut r = report();
        r.verdicts.clear();
        assert_eq!(format_verdict(&r), "No verdict available.");
    }

    #[test]
    fn test_format_links() {
        let links = format_links(&report());
        assert_eq!(links, "• Paper (PRS)\n  https://example.com/p");
    }

    #[test]
    fn test_value_range_shape() {
        let json = r#"{"range":"Sheet1!A1:A4","values":[["Procedure"],["Rhinoplasty"],[""],["Facelift"]]}"#;
        let parsed: ValueRange = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.values.len(), 4);
    }

    #[test]
    fn test_missing_config_rejected() {
        let config = SheetsConfig::default();
        assert!(SheetsClient::new(&config).is_err());
    }

    fn config_for(server: &wiremock::MockServer) -> SheetsConfig {
        SheetsConfig {
            base_url: server.uri(),
            spreadsheet_id: "sheet-1".to_string(),
            token: "test-token".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_procedures_skips_header_and_blank_rows() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/A:A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "Sheet1!A1:A5",
                "values": [["Procedure"], ["Rhinoplasty"], [""], ["Facelift"], ["   "]]
            })))
            .mount(&server)
            .await;

        let client = SheetsClient::new(&config_for(&server)).unwrap();
        let rows = client.procedures().await.unwrap();

        assert_eq!(
            rows,
            vec![
                ProcedureRow {
                    name: "Rhinoplasty".to_string(),
                    row: 2,
                },
                ProcedureRow {
                    name: "Facelift".to_string(),
                    row: 4,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_token_is_fatal() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = SheetsClient::new(&config_for(&server)).unwrap();
        let err = client.procedures().await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed(_)));
        assert!(!err.is_retryable());
    }
}

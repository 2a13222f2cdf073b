use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration.
///
/// Defaults cover everything except secrets, which come from the environment
/// (optionally via a `.env` file loaded by the binary).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub pubmed: PubMedConfig,
    pub fulltext: FullTextConfig,
    pub downloads: DownloadConfig,
    pub llm: LlmConfig,
    pub sheets: SheetsConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            graceful_shutdown_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
    /// Contact email, required by NCBI E-utilities
    pub email: String,
    /// E-utilities endpoint base
    pub base_url: String,
    /// Journals searched in the first pass
    pub target_journals: Vec<String>,
    /// Rolling window in months for the date filter
    pub months_back: u32,
    /// Maximum records per search
    pub max_results: u32,
    pub timeout_secs: u64,
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            target_journals: vec![
                "Plastic and Reconstructive Surgery".to_string(),
                "Aesthetic Surgery Journal".to_string(),
                "Journal of Plastic, Reconstructive & Aesthetic Surgery".to_string(),
                "Annals of Plastic Surgery".to_string(),
                "Dermatologic Surgery".to_string(),
                "JAMA Facial Plastic Surgery".to_string(),
                "Facial Plastic Surgery & Aesthetic Medicine".to_string(),
                "Clinics in Plastic Surgery".to_string(),
                "Aesthetic Plastic Surgery".to_string(),
            ],
            months_back: 18,
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FullTextConfig {
    pub unpaywall_base_url: String,
    pub pmc_article_base_url: String,
    /// Enables the authenticated browser-session resolver
    pub use_browser: bool,
    /// Cookie header value for the authenticated session
    pub browser_cookies: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FullTextConfig {
    fn default() -> Self {
        Self {
            unpaywall_base_url: "https://api.unpaywall.org/v2".to_string(),
            pmc_article_base_url: "https://www.ncbi.nlm.nih.gov/pmc/articles".to_string(),
            use_browser: false,
            browser_cookies: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub directory: PathBuf,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    /// Random politeness delay bounds between downloads, in seconds
    pub delay_min_secs: f64,
    pub delay_max_secs: f64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        let directory = dirs::download_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pdfs");
        Self {
            directory,
            timeout_secs: 30,
            retry_attempts: 2,
            delay_min_secs: 2.0,
            delay_max_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub anthropic_model: String,
    pub google_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            anthropic_model: "claude-3-haiku-20240307".to_string(),
            google_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    /// OAuth bearer token for the Sheets REST API
    pub token: String,
    /// 1-based column written with the verdict text
    pub verdict_column: u32,
    /// 1-based column written with the article links
    pub links_column: u32,
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            spreadsheet_id: String::new(),
            token: String::new(),
            verdict_column: 5,
            links_column: 10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
            max_retries: 3,
            retry_delay_secs: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pubmed: PubMedConfig::default(),
            fulltext: FullTextConfig::default(),
            downloads: DownloadConfig::default(),
            llm: LlmConfig::default(),
            sheets: SheetsConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Config {
    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(email) = std::env::var("PUBMED_EMAIL") {
            config.pubmed.email = email;
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = key;
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            config.llm.google_api_key = key;
        }
        if let Ok(id) = std::env::var("SHEET_ID") {
            config.sheets.spreadsheet_id = id;
        }
        if let Ok(token) = std::env::var("SHEETS_TOKEN") {
            config.sheets.token = token;
        }
        if let Ok(sender) = std::env::var("SENDER_EMAIL") {
            config.email.sender = sender;
        }
        if let Ok(password) = std::env::var("SENDER_PASSWORD") {
            config.email.password = password;
        }
        if let Ok(recipient) = std::env::var("RECIPIENT_EMAIL") {
            config.email.recipient = recipient;
        }
        if let Ok(cookies) = std::env::var("BROWSER_COOKIES") {
            config.fulltext.use_browser = true;
            config.fulltext.browser_cookies = Some(cookies);
        }
        if let Ok(dir) = std::env::var("PDF_DIR") {
            config.downloads.directory = PathBuf::from(dir);
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }

        config
    }

    /// Validate invariants that would otherwise fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::InvalidInput {
                field: "server.port".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.pubmed.target_journals.is_empty() {
            return Err(Error::InvalidInput {
                field: "pubmed.target_journals".to_string(),
                reason: "at least one target journal is required".to_string(),
            });
        }
        if self.pubmed.max_results == 0 {
            return Err(Error::InvalidInput {
                field: "pubmed.max_results".to_string(),
                reason: "max_results must be non-zero".to_string(),
            });
        }
        if self.pubmed.months_back == 0 {
            return Err(Error::InvalidInput {
                field: "pubmed.months_back".to_string(),
                reason: "months_back must be non-zero".to_string(),
            });
        }
        if self.downloads.delay_min_secs > self.downloads.delay_max_secs {
            return Err(Error::InvalidInput {
                field: "downloads.delay_min_secs".to_string(),
                reason: "minimum delay exceeds maximum delay".to_string(),
            });
        }
        Ok(())
    }
}

pub mod client;
pub mod config;
pub mod delivery;
pub mod error;
pub mod llm;
pub mod pdf;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod resilience;
pub mod server;

pub use client::{Article, Doi, FullTextResolver, PdfDownloader, PubMedClient};
pub use config::Config;
pub use error::{Error, Result};
pub use pdf::{PdfContent, PdfExtractor};
pub use pipeline::IntelligenceService;
pub use report::{ArticleCard, SynthesisReport, Verdict, VerdictStatus};
pub use server::Server;

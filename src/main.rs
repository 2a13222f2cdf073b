use clap::{Parser, Subcommand};
use surgical_scout::{Config, IntelligenceService, Server};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "surgical-scout", version, about = "Plastic surgery literature intelligence service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve,
    /// Generate a report for one topic and print it as Markdown
    Report {
        /// Topic to search for, e.g. "Nanofat"
        query: String,
        /// Override the search window in months
        #[arg(long)]
        months_back: Option<u32>,
    },
    /// Refresh the tracked procedures in the configured spreadsheet
    SyncSheet {
        /// Maximum number of procedures to process
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Research one procedure and email the digest, with full-text figures
    /// where a PDF could be resolved
    Digest {
        /// Procedure to research, e.g. "DIEP flap"
        procedure: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; the environment may be set by the supervisor
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.validate()?;

    match cli.command {
        Command::Serve => {
            Server::new(config).run().await?;
        }
        Command::Report { query, months_back } => {
            let service = IntelligenceService::from_config(&config)?;
            let report = service.generate_report(&query, months_back).await?;
            println!("{}", report.to_markdown());
        }
        Command::SyncSheet { limit } => {
            let service = IntelligenceService::from_config(&config)?;
            let outcome = service.sync_sheet(limit).await?;
            for line in &outcome.results {
                println!("{line}");
            }
        }
        Command::Digest { procedure } => {
            let service = IntelligenceService::from_config(&config)?;
            let outcome = service.send_digest(&procedure).await?;
            println!(
                "Sent digest for {}: {} articles, {} full texts, {} figures",
                outcome.procedure, outcome.articles, outcome.full_texts, outcome.figures
            );
        }
    }

    Ok(())
}

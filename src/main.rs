//! Newsbrief CLI - news article summarisation
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments, rendering output and handling top-level errors.

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use newsbrief::backend::GeminiClient;
use newsbrief::summarizer::{self, RateLimiter};
use newsbrief::{cleaner, fetcher, Config, SummaryLength, SummaryRequest, SummaryStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "newsbrief")]
#[command(author, version, about = "CLI for news article summarisation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a news article by URL
    Summarise {
        /// URL of the article
        url: String,
        /// Summary voice
        #[arg(long, value_enum, default_value_t = StyleArg::Simple)]
        style: StyleArg,
        /// Summary size
        #[arg(long, value_enum, default_value_t = LengthArg::Concise)]
        length: LengthArg,
        /// Show the extracted article text instead of a summary
        #[arg(long)]
        raw: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    /// Plain vocabulary, short sentences
    Simple,
    /// Domain terminology, full depth
    Technical,
}

#[derive(Clone, Copy, ValueEnum)]
enum LengthArg {
    /// A handful of single-sentence bullet points
    Concise,
    /// Several substantial paragraphs
    Detailed,
}

impl From<StyleArg> for SummaryStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Simple => SummaryStyle::Simple,
            StyleArg::Technical => SummaryStyle::Technical,
        }
    }
}

impl From<LengthArg> for SummaryLength {
    fn from(arg: LengthArg) -> Self {
        match arg {
            LengthArg::Concise => SummaryLength::Concise,
            LengthArg::Detailed => SummaryLength::Detailed,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsbrief=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Commands::Summarise {
        url,
        style,
        length,
        raw,
    } = cli.command;

    let config = Config::load()?;

    println!("Fetching: {}", url);
    let article = match fetcher::extract_article(
        &url,
        Duration::from_secs(config.fetch.timeout_secs),
        config.fetch.min_content_len,
    )
    .await
    {
        Ok(article) => article,
        // failure detail is logged inside the fetcher; the user only
        // needs to know there was no article text at that link
        Err(_) => {
            eprintln!(
                "{}",
                "Could not extract article text from that link. Try a different source.".yellow()
            );
            std::process::exit(1);
        }
    };

    let title = article
        .title
        .clone()
        .unwrap_or_else(|| "No title".to_string());

    if raw {
        println!("\n=== {} ===\n", title);
        println!("{}", cleaner::normalize_for_display(&article.text));
        println!("\n--- Extracted {} characters ---", article.text.len());
        return Ok(());
    }

    let cleaned = cleaner::normalize_for_machine(&article.text);
    println!("Summarising {} characters...\n", article.text.len());

    let backend = GeminiClient::new(config.api_key()?)?;
    let limiter = RateLimiter::new(Duration::from_millis(config.agent.min_interval_ms));
    let request = SummaryRequest {
        text: cleaned,
        style: style.into(),
        length: length.into(),
    };

    match summarizer::summarize(&backend, &limiter, &config.agent, &request).await {
        Ok(summary) => {
            println!("=== {} ===\n", title.bold());
            println!("{}", summary);
        }
        Err(err) => {
            eprintln!("{}", err.to_string().yellow());
            std::process::exit(1);
        }
    }

    Ok(())
}

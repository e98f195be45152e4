// src/main.rs
//! Binary entrypoint: generate an AI digest from a FreshRSS database and
//! deliver it to Telegram.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use freshrss_digest::config::Settings;
use freshrss_digest::notify::{DeliveryChannel, TelegramNotifier};
use freshrss_digest::pipeline::{DigestPipeline, RunOptions};
use freshrss_digest::summarize::client::{CompletionBackend, OpenAiCompatClient};

#[derive(Parser, Debug)]
#[command(author, version, about = "RSS feed digest generator", long_about = None)]
struct Cli {
    /// Look this many hours back for entries (overrides HOURS_BACK).
    #[arg(long)]
    hours: Option<u64>,

    /// Generate the digest but skip Telegram delivery.
    #[arg(long)]
    no_send: bool,

    /// Write the digest to digest_YYYYMMDD_HHMMSS.txt in the working directory.
    #[arg(long)]
    save: bool,

    /// Enable debug logging (RUST_LOG still takes precedence).
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    init_tracing(args.debug);
    debug!(?args, "parsed command line");

    let settings = Settings::from_env().context("loading configuration")?;

    let backend: Arc<dyn CompletionBackend> = Arc::new(OpenAiCompatClient::new(
        &settings.ai_base_url,
        &settings.ai_api_key,
        &settings.ai_model,
    ));
    let channel: Option<Arc<dyn DeliveryChannel>> =
        TelegramNotifier::from_env().map(|n| Arc::new(n) as Arc<dyn DeliveryChannel>);

    let pipeline = DigestPipeline::new(settings, backend, channel);
    let report = pipeline
        .run(RunOptions {
            hours_back: args.hours,
            send: !args.no_send,
        })
        .await?;

    if args.save {
        let filename = format!("digest_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
        fs::write(&filename, &report.digest)
            .with_context(|| format!("saving digest to {filename}"))?;
        info!(file = %filename, "digest saved");
    }

    println!(
        "Digest generation completed. Length: {} characters",
        report.digest.chars().count()
    );
    Ok(())
}

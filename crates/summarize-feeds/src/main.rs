use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use shared::{
    Config, FeedFetcher, FeedLists, OllamaSummarizer, OutputWriter, Pipeline, SpeechRenderer,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "summarize-feeds")]
#[command(about = "Summarize the latest articles from a list of RSS feeds with a local model")]
struct Args {
    /// Path to config.json (defaults to $FEED_SUMMARIES_CONFIG, ./config.json,
    /// then ~/.config/feed-summaries/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let feeds = FeedLists::load(&config.feeds_file, &config.removed_feeds_file)?;
    println!(
        "📚 {} active feeds, {} articles each",
        feeds.active_urls().len(),
        config.num_articles
    );

    let summarizer = OllamaSummarizer::new(&config)?;
    println!("\n🤖 Checking model {}...", config.ollama_model);
    summarizer
        .ensure_model_available()
        .await
        .context("Failed to ensure model availability")?;

    let fetcher = FeedFetcher::new(Duration::from_secs(config.request_timeout_secs))?;
    let writer = OutputWriter::new(&config.output_folder);

    let speech = if config.text_to_speech.enabled {
        Some(SpeechRenderer::new(config.text_to_speech.clone())?)
    } else {
        None
    };

    let mut pipeline = Pipeline::new(&fetcher, &summarizer, writer, config.num_articles);
    if let Some(speech) = &speech {
        pipeline = pipeline.with_speech(speech);
    }

    println!("\n📰 Summarizing feeds...");
    let today = Local::now().date_naive();
    let report = pipeline.run(feeds, today).await?;

    println!(
        "✓ Summarized {} articles from {} feeds",
        report.articles_summarized, report.feeds_processed
    );
    if report.articles_skipped > 0 {
        println!("⚠ Skipped {} articles that failed to summarize", report.articles_skipped);
    }
    if !report.feeds_removed.is_empty() {
        println!(
            "\n⚠ Removed {} feed(s) due to lack of content:",
            report.feeds_removed.len()
        );
        for url in &report.feeds_removed {
            println!("  ✗ {}", url);
        }
    }

    if let Some(audio) = &report.audio_path {
        println!("\n🔊 Audio saved to: {}", audio.display());
    } else if config.text_to_speech.enabled {
        println!("\n⚠ Audio could not be generated (see log)");
    }

    println!("\n✅ Summaries saved to: {}", report.document_path.display());

    Ok(())
}

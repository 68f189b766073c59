use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::audio::SpeechSynthesizer;
use crate::document::SummaryDocument;
use crate::feed_list::FeedLists;
use crate::fetcher::FeedSource;
use crate::models::ArticleSummary;
use crate::output::OutputWriter;
use crate::summarizer::Summarize;

/// Mutable state of a single run: the feed lists and the growing document.
pub struct PipelineContext {
    pub feeds: FeedLists,
    pub document: SummaryDocument,
}

impl PipelineContext {
    pub fn new(feeds: FeedLists, date: NaiveDate) -> Self {
        Self {
            feeds,
            document: SummaryDocument::begin(date),
        }
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub document_path: PathBuf,
    pub audio_path: Option<PathBuf>,
    /// Feeds fetched successfully; removed feeds are not counted.
    pub feeds_processed: usize,
    pub feeds_removed: Vec<String>,
    pub articles_summarized: usize,
    pub articles_skipped: usize,
}

/// Drives one pass over the active feeds.
pub struct Pipeline<'a> {
    source: &'a dyn FeedSource,
    summarizer: &'a dyn Summarize,
    speech: Option<&'a dyn SpeechSynthesizer>,
    writer: OutputWriter,
    num_articles: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn FeedSource,
        summarizer: &'a dyn Summarize,
        writer: OutputWriter,
        num_articles: usize,
    ) -> Self {
        Self {
            source,
            summarizer,
            speech: None,
            writer,
            num_articles,
        }
    }

    /// Render audio after the document is compiled. Leave unset when TTS is disabled.
    pub fn with_speech(mut self, speech: &'a dyn SpeechSynthesizer) -> Self {
        self.speech = Some(speech);
        self
    }

    pub async fn run(&self, feeds: FeedLists, date: NaiveDate) -> Result<RunReport> {
        self.writer.prepare()?;

        let mut ctx = PipelineContext::new(feeds, date);
        let mut report = RunReport::default();

        let urls: Vec<String> = ctx.feeds.active_urls().to_vec();
        for url in &urls {
            self.process_feed(&mut ctx, url, &mut report).await;
        }

        if let Some(speech) = self.speech {
            report.audio_path = self.render_audio(&mut ctx.document, speech).await;
        }

        report.document_path = self
            .writer
            .write(date, &ctx.document.finalize(), &ctx.feeds)?;

        Ok(report)
    }

    async fn process_feed(&self, ctx: &mut PipelineContext, url: &str, report: &mut RunReport) {
        info!(feed = %url, "Processing feed");

        let feed = match self.source.fetch(url, self.num_articles).await {
            Ok(feed) => {
                report.feeds_processed += 1;
                feed
            }
            Err(e) => {
                warn!(feed = %url, error = %e, "Removing feed");
                if ctx.feeds.mark_removed(url) {
                    report.feeds_removed.push(url.to_string());
                }
                return;
            }
        };

        let mut articles = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            match self.summarizer.summarize(&entry.body).await {
                Ok(summary) => {
                    report.articles_summarized += 1;
                    articles.push(ArticleSummary {
                        title: entry.title,
                        link: entry.link,
                        summary,
                    });
                }
                Err(e) => {
                    report.articles_skipped += 1;
                    warn!(
                        feed = %url,
                        article = %entry.title,
                        error = %e,
                        "Failed to summarize article"
                    );
                }
            }
        }

        let label = feed.title.unwrap_or_else(|| url.to_string());
        if !ctx.document.append_feed_block(label, url, articles) {
            warn!(feed = %url, "No articles could be summarized, omitting section");
        }
    }

    /// Returns the audio path only when the bytes were rendered and saved.
    async fn render_audio(
        &self,
        document: &mut SummaryDocument,
        speech: &dyn SpeechSynthesizer,
    ) -> Option<PathBuf> {
        let text = document.finalize();

        let audio = match speech.render(&text).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "Audio rendering failed, continuing without audio");
                return None;
            }
        };

        match self
            .writer
            .write_audio(document.date(), speech.extension(), &audio)
        {
            Ok(filename) => {
                let path = self.writer.folder().join(&filename);
                document.set_audio_reference(filename);
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Could not save audio, continuing without it");
                None
            }
        }
    }
}

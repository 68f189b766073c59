// Public modules
pub mod audio;
pub mod config;
pub mod document;
pub mod feed_list;
pub mod fetcher;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod summarizer;

// Re-export commonly used types
pub use audio::{AudioError, SpeechRenderer, SpeechSynthesizer};
pub use config::{Config, TextToSpeechConfig};
pub use document::SummaryDocument;
pub use feed_list::FeedLists;
pub use fetcher::{FeedError, FeedFetcher, FeedSource};
pub use models::{ArticleSummary, FeedEntry, FeedRecord, FeedStatus, FetchedFeed, SummaryBlock};
pub use output::OutputWriter;
pub use pipeline::{Pipeline, PipelineContext, RunReport};
pub use summarizer::{OllamaSummarizer, Summarize, SummarizeError};

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    AudioError, FeedEntry, FeedError, FeedLists, FeedSource, FetchedFeed, OutputWriter, Pipeline,
    SpeechSynthesizer, Summarize, SummarizeError,
};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

enum FeedBehavior {
    Entries(Option<String>, Vec<FeedEntry>),
    Empty,
    Unavailable,
}

struct FakeSource {
    feeds: HashMap<String, FeedBehavior>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            feeds: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, url: &str, behavior: FeedBehavior) -> Self {
        self.feeds.insert(url.to_string(), behavior);
        self
    }
}

#[async_trait]
impl FeedSource for FakeSource {
    async fn fetch(&self, url: &str, max_articles: usize) -> Result<FetchedFeed, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.feeds.get(url) {
            Some(FeedBehavior::Entries(title, entries)) => Ok(FetchedFeed {
                title: title.clone(),
                entries: entries.iter().take(max_articles).cloned().collect(),
            }),
            Some(FeedBehavior::Empty) => Err(FeedError::Empty),
            Some(FeedBehavior::Unavailable) | None => {
                Err(FeedError::Unavailable("connection refused".to_string()))
            }
        }
    }
}

/// Summarizes by echoing the body; bodies containing "FAIL" fail.
struct FakeSummarizer;

#[async_trait]
impl Summarize for FakeSummarizer {
    async fn summarize(&self, article_text: &str) -> Result<String, SummarizeError> {
        if article_text.contains("FAIL") {
            return Err(SummarizeError::EmptyResponse);
        }
        Ok(format!("Summary of {}", article_text))
    }
}

struct FakeSpeech {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeSpeech {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn render(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AudioError::EmptyAudio);
        }
        Ok(format!("AUDIO:{}", text.len()).into_bytes())
    }

    fn extension(&self) -> &str {
        "mp3"
    }
}

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new(name: &str, active: &[&str], removed: &[&str]) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "pipeline-test-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        fs::write(dir.join("feeds.txt"), lines(active)).unwrap();
        if !removed.is_empty() {
            fs::write(dir.join("removed.txt"), lines(removed)).unwrap();
        }

        Self { dir }
    }

    fn feeds(&self) -> FeedLists {
        FeedLists::load(&self.dir.join("feeds.txt"), &self.dir.join("removed.txt")).unwrap()
    }

    fn writer(&self) -> OutputWriter {
        OutputWriter::new(self.output())
    }

    fn output(&self) -> PathBuf {
        self.dir.join("summaries")
    }

    fn active(&self) -> Vec<String> {
        read_lines(&self.dir.join("feeds.txt"))
    }

    fn removed(&self) -> Vec<String> {
        read_lines(&self.dir.join("removed.txt"))
    }
}

fn lines(urls: &[&str]) -> String {
    urls.iter().map(|u| format!("{}\n", u)).collect()
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn entry(n: usize, body: &str) -> FeedEntry {
    FeedEntry::new(
        format!("Article {}", n),
        format!("https://a.example/{}", n),
        body,
    )
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

const FEED_A: &str = "https://a.example/rss";
const FEED_B: &str = "https://b.example/rss";
const FEED_C: &str = "https://c.example/rss";

#[tokio::test]
async fn test_empty_feed_is_removed_and_omitted() {
    init_tracing();

    let ws = Workspace::new("scenario", &[FEED_A, FEED_B], &[]);
    let source = FakeSource::new()
        .with(
            FEED_A,
            FeedBehavior::Entries(
                Some("Feed A".to_string()),
                vec![entry(1, "alpha"), entry(2, "beta"), entry(3, "gamma")],
            ),
        )
        .with(FEED_B, FeedBehavior::Empty);

    let pipeline = Pipeline::new(&source, &FakeSummarizer, ws.writer(), 2);
    let report = pipeline.run(ws.feeds(), run_date()).await.unwrap();

    assert_eq!(report.feeds_removed, vec![FEED_B.to_string()]);
    assert_eq!(report.articles_summarized, 2);
    assert_eq!(report.feeds_processed, 1);
    assert_eq!(ws.active(), vec![FEED_A.to_string()]);
    assert_eq!(ws.removed(), vec![FEED_B.to_string()]);

    let doc = fs::read_to_string(&report.document_path).unwrap();
    assert_eq!(
        report.document_path,
        ws.output().join("2024-01-02_feed-summaries.md")
    );
    assert!(doc.starts_with("# News for Tuesday, January 2, 2024\n\n"));
    assert_eq!(doc.matches("\n## ").count(), 1);
    assert!(doc.contains("## Feed A"));
    assert_eq!(doc.matches("### [").count(), 2);
    assert!(doc.contains("### [Article 1](https://a.example/1)\n\nSummary of alpha"));
    assert!(doc.contains("### [Article 2](https://a.example/2)\n\nSummary of beta"));
    assert!(!doc.contains(FEED_B));
    assert!(!doc.contains("Listen to this summary"));
}

#[tokio::test]
async fn test_unavailable_feed_is_removed() {
    init_tracing();

    let ws = Workspace::new("unavailable", &[FEED_A, FEED_B, FEED_C], &["https://old.example/rss"]);
    let source = FakeSource::new()
        .with(FEED_A, FeedBehavior::Unavailable)
        .with(FEED_B, FeedBehavior::Entries(None, vec![entry(1, "body")]))
        .with(FEED_C, FeedBehavior::Empty);

    let pipeline = Pipeline::new(&source, &FakeSummarizer, ws.writer(), 5);
    let report = pipeline.run(ws.feeds(), run_date()).await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.feeds_processed, 1);
    assert_eq!(ws.active(), vec![FEED_B.to_string()]);
    assert_eq!(
        ws.removed(),
        vec![
            "https://old.example/rss".to_string(),
            FEED_A.to_string(),
            FEED_C.to_string()
        ]
    );

    // A feed without a title is labelled by its URL.
    let doc = fs::read_to_string(&report.document_path).unwrap();
    assert!(doc.contains(&format!("## {}", FEED_B)));
}

#[tokio::test]
async fn test_every_feed_ends_in_exactly_one_list() {
    init_tracing();

    let original_active = [FEED_A, FEED_B, FEED_C, "https://d.example/rss"];
    let original_removed = ["https://old.example/rss"];
    let ws = Workspace::new("partition", &original_active, &original_removed);
    let source = FakeSource::new()
        .with(FEED_A, FeedBehavior::Entries(None, vec![entry(1, "x")]))
        .with(FEED_B, FeedBehavior::Empty)
        .with(FEED_C, FeedBehavior::Entries(None, vec![entry(2, "FAIL")]));

    let pipeline = Pipeline::new(&source, &FakeSummarizer, ws.writer(), 3);
    pipeline.run(ws.feeds(), run_date()).await.unwrap();

    let active: BTreeSet<String> = ws.active().into_iter().collect();
    let removed: BTreeSet<String> = ws.removed().into_iter().collect();

    assert!(active.is_disjoint(&removed));

    let union: BTreeSet<String> = active.union(&removed).cloned().collect();
    let expected: BTreeSet<String> = original_active
        .iter()
        .chain(original_removed.iter())
        .map(|s| s.to_string())
        .collect();
    assert_eq!(union, expected);
}

#[tokio::test]
async fn test_article_failure_keeps_rest_of_feed() {
    init_tracing();

    let ws = Workspace::new("article-failure", &[FEED_A, FEED_C], &[]);
    let source = FakeSource::new()
        .with(
            FEED_A,
            FeedBehavior::Entries(
                Some("Feed A".to_string()),
                vec![entry(1, "ok one"), entry(2, "FAIL me"), entry(3, "ok three")],
            ),
        )
        .with(
            FEED_C,
            FeedBehavior::Entries(Some("Feed C".to_string()), vec![entry(4, "FAIL all")]),
        );

    let pipeline = Pipeline::new(&source, &FakeSummarizer, ws.writer(), 3);
    let report = pipeline.run(ws.feeds(), run_date()).await.unwrap();

    assert_eq!(report.articles_summarized, 2);
    assert_eq!(report.articles_skipped, 2);

    // Summarization failures are not grounds for removing a feed.
    assert!(report.feeds_removed.is_empty());
    assert_eq!(ws.active(), vec![FEED_A.to_string(), FEED_C.to_string()]);

    let doc = fs::read_to_string(&report.document_path).unwrap();
    assert!(doc.contains("Summary of ok one"));
    assert!(doc.contains("Summary of ok three"));
    assert!(!doc.contains("Article 2"));
    assert!(!doc.contains("## Feed C"));
}

#[tokio::test]
async fn test_audio_link_added_when_rendered() {
    init_tracing();

    let ws = Workspace::new("audio-ok", &[FEED_A], &[]);
    let source = FakeSource::new().with(
        FEED_A,
        FeedBehavior::Entries(Some("Feed A".to_string()), vec![entry(1, "alpha")]),
    );
    let speech = FakeSpeech::new(false);

    let pipeline =
        Pipeline::new(&source, &FakeSummarizer, ws.writer(), 2).with_speech(&speech);
    let report = pipeline.run(ws.feeds(), run_date()).await.unwrap();

    assert_eq!(speech.calls.load(Ordering::SeqCst), 1);

    let audio_path = report.audio_path.clone().unwrap();
    assert_eq!(audio_path, ws.output().join("2024-01-02_feed-summaries.mp3"));
    assert!(fs::read(&audio_path).unwrap().starts_with(b"AUDIO:"));

    let doc = fs::read_to_string(&report.document_path).unwrap();
    assert!(doc.contains("[Listen to this summary](2024-01-02_feed-summaries.mp3)"));
    assert!(doc.contains("## Feed A"));
}

#[tokio::test]
async fn test_audio_failure_still_writes_document() {
    init_tracing();

    let ws = Workspace::new("audio-fail", &[FEED_A], &[]);
    let source = FakeSource::new().with(
        FEED_A,
        FeedBehavior::Entries(
            Some("Feed A".to_string()),
            vec![entry(1, "alpha"), entry(2, "beta")],
        ),
    );
    let speech = FakeSpeech::new(true);

    let pipeline =
        Pipeline::new(&source, &FakeSummarizer, ws.writer(), 2).with_speech(&speech);
    let report = pipeline.run(ws.feeds(), run_date()).await.unwrap();

    assert_eq!(speech.calls.load(Ordering::SeqCst), 1);
    assert!(report.audio_path.is_none());

    let doc = fs::read_to_string(&report.document_path).unwrap();
    assert!(!doc.contains("Listen to this summary"));
    assert!(doc.contains("Summary of alpha"));
    assert!(doc.contains("Summary of beta"));
    assert!(!ws.output().join("2024-01-02_feed-summaries.mp3").exists());
}

#[tokio::test]
async fn test_rerun_same_day_overwrites() {
    init_tracing();

    let ws = Workspace::new("rerun", &[FEED_A], &[]);
    let source = FakeSource::new().with(
        FEED_A,
        FeedBehavior::Entries(Some("Feed A".to_string()), vec![entry(1, "alpha")]),
    );

    let first = Pipeline::new(&source, &FakeSummarizer, ws.writer(), 2)
        .run(ws.feeds(), run_date())
        .await
        .unwrap();
    let first_doc = fs::read_to_string(&first.document_path).unwrap();

    let second = Pipeline::new(&source, &FakeSummarizer, ws.writer(), 2)
        .run(ws.feeds(), run_date())
        .await
        .unwrap();
    let second_doc = fs::read_to_string(&second.document_path).unwrap();

    assert_eq!(first.document_path, second.document_path);
    assert_eq!(first_doc, second_doc);
    assert_eq!(second_doc.matches("# News for").count(), 1);

    let outputs = fs::read_dir(ws.output()).unwrap().count();
    assert_eq!(outputs, 1);
}

#[tokio::test]
async fn test_missing_feed_list_is_fatal() {
    init_tracing();

    let dir = std::env::temp_dir().join(format!("pipeline-test-nolist-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let result = FeedLists::load(&dir.join("feeds.txt"), &dir.join("removed.txt"));
    assert!(result.is_err());
}

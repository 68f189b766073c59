use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::feed_list::FeedLists;

const FILE_SUFFIX: &str = "feed-summaries";

/// `2024-01-02_feed-summaries.md`
pub fn document_filename(date: NaiveDate) -> String {
    format!("{}_{}.md", date.format("%Y-%m-%d"), FILE_SUFFIX)
}

/// `2024-01-02_feed-summaries.mp3`
pub fn audio_filename(date: NaiveDate, extension: &str) -> String {
    format!("{}_{}.{}", date.format("%Y-%m-%d"), FILE_SUFFIX, extension)
}

/// Write `content` to a sibling temp file, then rename it over `path`.
///
/// Either the old file or the new one is on disk afterwards, never a half-written one.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);

    fs::write(&tmp, content)
        .with_context(|| format!("Failed to write temp file: {}", tmp.display()))?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Writes the dated artifacts of a run into the output folder.
pub struct OutputWriter {
    folder: PathBuf,
}

impl OutputWriter {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Create the output folder if needed.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.folder).with_context(|| {
            format!("Failed to create output folder: {}", self.folder.display())
        })
    }

    /// Save the audio next to where the document will go. Returns the file name,
    /// which is what the document links to.
    pub fn write_audio(&self, date: NaiveDate, extension: &str, audio: &[u8]) -> Result<String> {
        let filename = audio_filename(date, extension);
        let filepath = self.folder.join(&filename);

        fs::write(&filepath, audio)
            .with_context(|| format!("Failed to write audio file: {}", filepath.display()))?;

        info!(path = %filepath.display(), bytes = audio.len(), "Audio written");
        Ok(filename)
    }

    /// Write the document, replacing any earlier one for the same date, and persist
    /// the feed lists.
    ///
    /// The document is staged first and only moved into place once the lists are saved,
    /// so a failed persist leaves no new document behind.
    pub fn write(&self, date: NaiveDate, document: &str, feeds: &FeedLists) -> Result<PathBuf> {
        let filepath = self.folder.join(document_filename(date));
        let staged = temp_sibling(&filepath);

        fs::write(&staged, document)
            .with_context(|| format!("Failed to write summary file: {}", staged.display()))?;

        if let Err(e) = feeds.persist() {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }

        fs::rename(&staged, &filepath)
            .with_context(|| format!("Failed to write summary file: {}", filepath.display()))?;

        info!(path = %filepath.display(), "Summaries written");
        Ok(filepath)
    }
}

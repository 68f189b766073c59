use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::FeedRecord;
use crate::output::write_atomic;

/// The active and removed feed lists for one run.
///
/// Both lists are held in memory, mutated only through [`FeedLists::mark_removed`],
/// and written back once with [`FeedLists::persist`].
#[derive(Debug, Clone)]
pub struct FeedLists {
    active_path: PathBuf,
    removed_path: PathBuf,
    active: Vec<String>,
    removed: Vec<String>,
}

impl FeedLists {
    /// Read both lists. A missing active list is fatal; a missing removed list is empty.
    pub fn load(active_path: &Path, removed_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(active_path).with_context(|| {
            format!("Failed to read feed list: {}", active_path.display())
        })?;
        let active = dedup(parse_feed_lines(&content));

        let mut removed = match fs::read_to_string(removed_path) {
            Ok(content) => parse_feed_lines(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %removed_path.display(), "No removed-feeds list yet");
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read removed feed list: {}", removed_path.display())
                })
            }
        };

        // A URL listed as active was put back on purpose; it no longer counts as removed.
        removed.retain(|url| {
            let readded = active.contains(url);
            if readded {
                warn!(feed = %url, "Feed is on both lists, keeping it active");
            }
            !readded
        });

        info!(
            active = active.len(),
            removed = removed.len(),
            "Loaded feed lists"
        );

        Ok(Self::from_parts(
            active_path.to_path_buf(),
            removed_path.to_path_buf(),
            active,
            removed,
        ))
    }

    pub fn from_parts(
        active_path: PathBuf,
        removed_path: PathBuf,
        active: Vec<String>,
        removed: Vec<String>,
    ) -> Self {
        Self {
            active_path,
            removed_path,
            active,
            removed,
        }
    }

    pub fn load_active(&self) -> Vec<FeedRecord> {
        self.active.iter().map(FeedRecord::active).collect()
    }

    pub fn load_removed(&self) -> Vec<FeedRecord> {
        self.removed.iter().map(FeedRecord::removed).collect()
    }

    pub fn active_urls(&self) -> &[String] {
        &self.active
    }

    pub fn removed_urls(&self) -> &[String] {
        &self.removed
    }

    /// Move `url` from the active list to the end of the removed list.
    ///
    /// Returns `true` if the lists changed. Marking an already-removed URL is a no-op.
    pub fn mark_removed(&mut self, url: &str) -> bool {
        let was_active = self.active.iter().any(|u| u == url);
        self.active.retain(|u| u != url);

        if self.removed.iter().any(|u| u == url) {
            return was_active;
        }

        self.removed.push(url.to_string());
        true
    }

    /// Write both lists back to their files, one URL per line.
    ///
    /// The removed list goes first: if the second write fails, a newly removed feed
    /// is still on the old active list rather than on neither.
    pub fn persist(&self) -> Result<()> {
        write_feed_lines(&self.removed_path, &self.removed).with_context(|| {
            format!(
                "Failed to write removed feed list: {}",
                self.removed_path.display()
            )
        })?;
        write_feed_lines(&self.active_path, &self.active)
            .with_context(|| format!("Failed to write feed list: {}", self.active_path.display()))?;

        debug!(
            active = self.active.len(),
            removed = self.removed.len(),
            "Persisted feed lists"
        );
        Ok(())
    }
}

/// One URL per line; surrounding whitespace and blank lines are ignored.
pub fn parse_feed_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn dedup(urls: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(urls.len());
    for url in urls {
        if !unique.contains(&url) {
            unique.push(url);
        }
    }
    unique
}

fn write_feed_lines(path: &Path, urls: &[String]) -> Result<()> {
    let mut content = String::new();
    for url in urls {
        content.push_str(url);
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())
}

use chrono::NaiveDate;

use crate::models::{ArticleSummary, SummaryBlock};

/// The dated markdown document built up over one run.
///
/// Blocks are append-only. The audio reference is the only thing that may be set after
/// blocks have been added, and only once the audio file is on disk.
#[derive(Debug, Clone)]
pub struct SummaryDocument {
    date: NaiveDate,
    blocks: Vec<SummaryBlock>,
    audio_reference: Option<String>,
}

impl SummaryDocument {
    pub fn begin(date: NaiveDate) -> Self {
        Self {
            date,
            blocks: Vec::new(),
            audio_reference: None,
        }
    }

    /// Add one feed's section. A feed with no summarized articles adds nothing.
    ///
    /// Returns `true` if a block was appended.
    pub fn append_feed_block(
        &mut self,
        label: impl Into<String>,
        url: impl Into<String>,
        articles: Vec<ArticleSummary>,
    ) -> bool {
        if articles.is_empty() {
            return false;
        }

        self.blocks.push(SummaryBlock {
            label: label.into(),
            url: url.into(),
            articles,
        });
        true
    }

    pub fn set_audio_reference(&mut self, reference: impl Into<String>) {
        self.audio_reference = Some(reference.into());
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn blocks(&self) -> &[SummaryBlock] {
        &self.blocks
    }

    pub fn audio_reference(&self) -> Option<&str> {
        self.audio_reference.as_deref()
    }

    pub fn heading(&self) -> String {
        format_heading(self.date)
    }

    /// Render the document as markdown.
    pub fn finalize(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# {}\n\n", self.heading()));

        if let Some(audio) = &self.audio_reference {
            md.push_str(&format!("[Listen to this summary]({})\n\n", audio));
        }

        for block in &self.blocks {
            md.push_str(&format!("## {}\n\n", block.label));
            if block.label != block.url {
                md.push_str(&format!("<{}>\n\n", block.url));
            }

            for article in &block.articles {
                if article.has_link() {
                    md.push_str(&format!(
                        "### [{}]({})\n\n",
                        escape_link_text(&article.title),
                        article.link
                    ));
                } else {
                    md.push_str(&format!("### {}\n\n", article.title));
                }
                md.push_str(&article.summary);
                md.push_str("\n\n");
            }
        }

        md
    }
}

/// "News for Tuesday, January 2, 2024"
pub fn format_heading(date: NaiveDate) -> String {
    format!("News for {}", date.format("%A, %B %-d, %Y"))
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

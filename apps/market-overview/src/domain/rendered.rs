//! Rendered View Tree
//!
//! Output of the snapshot renderer: a plain value with a deterministic text
//! form. Equal views always print to identical bytes.

use std::fmt;

use super::format::Trend;
use super::language::Language;
use super::sections::SectionId;

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Display text; never empty.
    pub text: String,
    /// Direction for signed columns.
    pub trend: Option<Trend>,
}

impl Cell {
    /// Plain cell.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            trend: None,
        }
    }

    /// Cell with a trend.
    #[must_use]
    pub fn signed(text: impl Into<String>, trend: Trend) -> Self {
        Self {
            text: text.into(),
            trend: Some(trend),
        }
    }
}

/// A table body row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    /// One cell per column.
    Cells(Vec<Cell>),
    /// A single message spanning every column.
    Empty {
        /// Number of columns spanned.
        colspan: usize,
        /// Localized message.
        message: String,
    },
}

/// Body of a rendered section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    /// Tabular feed.
    Table {
        /// Column headers.
        headers: Vec<String>,
        /// Body rows.
        rows: Vec<TableRow>,
    },
    /// Qualitative insight.
    Insight {
        /// Formatted generation time or the placeholder.
        generated_at: String,
        /// Summary text or the localized "no data" message.
        text: String,
    },
    /// Reasoning snapshot as captioned lines.
    Reasoning {
        /// `(caption, value)` pairs in display order.
        lines: Vec<(String, String)>,
        /// Bulleted lists (key signals, risks) with their captions.
        lists: Vec<(String, Vec<String>)>,
    },
    /// Section with nothing to show.
    Placeholder {
        /// Localized message.
        message: String,
    },
}

/// A rendered section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    /// Which section.
    pub id: SectionId,
    /// Localized title.
    pub title: String,
    /// Content.
    pub body: SectionBody,
}

/// The whole rendered snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    /// Language the view was rendered in.
    pub language: Language,
    /// Sections in display order.
    pub sections: Vec<SectionView>,
}

impl RenderedView {
    /// Find a section.
    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&SectionView> {
        self.sections.iter().find(|s| s.id == id)
    }
}

impl fmt::Display for RenderedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        match &self.body {
            SectionBody::Table { headers, rows } => {
                writeln!(f, "{}", headers.join(" | "))?;
                for row in rows {
                    match row {
                        TableRow::Cells(cells) => {
                            let texts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
                            writeln!(f, "{}", texts.join(" | "))?;
                        }
                        TableRow::Empty { message, .. } => writeln!(f, "{message}")?,
                    }
                }
            }
            SectionBody::Insight { generated_at, text } => {
                writeln!(f, "[{generated_at}]")?;
                writeln!(f, "{text}")?;
            }
            SectionBody::Reasoning { lines, lists } => {
                for (caption, value) in lines {
                    writeln!(f, "{caption}: {value}")?;
                }
                for (caption, items) in lists {
                    writeln!(f, "{caption}:")?;
                    for item in items {
                        writeln!(f, "  - {item}")?;
                    }
                }
            }
            SectionBody::Placeholder { message } => writeln!(f, "{message}")?,
        }
        Ok(())
    }
}

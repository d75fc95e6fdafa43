//! Snapshot Renderer
//!
//! Pure mapping from the snapshot store to a [`RenderedView`]. Reads feed
//! values only through the field resolver and the formatting helpers. Calling
//! it twice on the same store yields equal views, so a language switch is a
//! re-render rather than a refetch.

use std::borrow::Cow;

use serde_json::Value;

use super::snapshot_store::SnapshotStore;
use crate::domain::fields::{Row, resolve, value_decimal, value_text};
use crate::domain::format::{self, PLACEHOLDER, Trend};
use crate::domain::language::{Language, Locale, Message};
use crate::domain::overview::{Bias, ReasoningSnapshot};
use crate::domain::rendered::{Cell, RenderedView, SectionBody, SectionView, TableRow};
use crate::domain::sections::{ColumnFormat, ColumnSpec, SectionId, SectionRegistry, TableSpec};

/// Renders the snapshot store.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRenderer {
    registry: SectionRegistry,
}

impl SnapshotRenderer {
    /// Create a renderer over a section registry.
    #[must_use]
    pub const fn new(registry: SectionRegistry) -> Self {
        Self { registry }
    }

    /// Render every section: the six tables, the three insights, then the
    /// reasoning snapshot.
    #[must_use]
    pub fn render(&self, store: &SnapshotStore, locale: &Locale) -> RenderedView {
        let mut sections: Vec<SectionView> = self
            .registry
            .tables()
            .map(|(id, spec)| render_table(id, spec, store, locale))
            .collect();

        sections.extend(
            SectionId::INSIGHTS
                .iter()
                .map(|id| render_insight(*id, store, locale)),
        );
        sections.push(render_reasoning(store.reasoning(), locale));

        RenderedView {
            language: locale.language(),
            sections,
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

fn render_table(id: SectionId, spec: &TableSpec, store: &SnapshotStore, locale: &Locale) -> SectionView {
    let headers = spec
        .columns
        .iter()
        .map(|column| locale.label(&column.label).to_string())
        .collect();

    let source = table_rows(id, spec, store);
    let rows = if source.is_empty() {
        vec![TableRow::Empty {
            colspan: spec.column_count(),
            message: locale.text(Message::NoData).to_string(),
        }]
    } else {
        source
            .iter()
            .map(|row| {
                TableRow::Cells(
                    spec.columns
                        .iter()
                        .map(|column| render_cell(row, column, locale.language()))
                        .collect(),
                )
            })
            .collect()
    };

    SectionView {
        id,
        title: locale.label(&spec.title).to_string(),
        body: SectionBody::Table { headers, rows },
    }
}

/// Rows of a table section, already capped.
///
/// Index history is flattened in code order; each row is tagged with its code
/// unless it already carries one.
fn table_rows<'a>(id: SectionId, spec: &TableSpec, store: &'a SnapshotStore) -> Vec<Cow<'a, Row>> {
    let Some(payload) = store.overview() else {
        return Vec::new();
    };
    let cap = spec.max_rows.unwrap_or(usize::MAX);

    if id == SectionId::IndexHistory {
        let Some(history) = payload.index_history.as_ref() else {
            return Vec::new();
        };
        return history
            .iter()
            .flat_map(|(code, series)| {
                series.iter().take(cap).map(move |row| {
                    if resolve(row, "code").is_some() {
                        Cow::Borrowed(row)
                    } else {
                        let mut tagged = row.clone();
                        tagged.insert("code".to_string(), Value::String(code.clone()));
                        Cow::Owned(tagged)
                    }
                })
            })
            .collect();
    }

    payload
        .rows(id)
        .map(|rows| rows.iter().take(cap).map(Cow::Borrowed).collect())
        .unwrap_or_default()
}

fn render_cell(row: &Row, column: &ColumnSpec, language: Language) -> Cell {
    let placeholder = || Cell::text(PLACEHOLDER);
    let Some(value) = resolve(row, column.field) else {
        return placeholder();
    };

    let cell = match column.format {
        ColumnFormat::Text => value_text(value).map(Cell::text),
        ColumnFormat::Decimal(places) => {
            value_decimal(value).map(|d| Cell::text(format::decimal(d, places)))
        }
        ColumnFormat::SignedDecimal(places) => {
            value_decimal(value).map(|d| {
                Cell::signed(format::signed_decimal(d, places), Trend::at_places(d, places))
            })
        }
        ColumnFormat::Percent => {
            value_decimal(value).map(|d| Cell::signed(format::percent(d), Trend::at_places(d, 2)))
        }
        ColumnFormat::Amount => {
            value_decimal(value).map(|d| Cell::text(format::amount(d, language)))
        }
        ColumnFormat::Date => format::date(value).map(Cell::text),
    };

    cell.unwrap_or_else(placeholder)
}

// =============================================================================
// Insights
// =============================================================================

fn render_insight(id: SectionId, store: &SnapshotStore, locale: &Locale) -> SectionView {
    let title = id
        .message()
        .map_or_else(|| id.payload_key().to_string(), |m| locale.text(m).to_string());

    let body = match store.overview().and_then(|payload| payload.insight(id)) {
        Some(insight) => SectionBody::Insight {
            generated_at: insight
                .generated_at
                .as_ref()
                .map_or_else(|| PLACEHOLDER.to_string(), format::timestamp),
            text: insight
                .summary_text
                .clone()
                .unwrap_or_else(|| locale.text(Message::NoData).to_string()),
        },
        None => SectionBody::Placeholder {
            message: locale.text(Message::NoData).to_string(),
        },
    };

    SectionView { id, title, body }
}

// =============================================================================
// Reasoning
// =============================================================================

fn render_reasoning(snapshot: Option<&ReasoningSnapshot>, locale: &Locale) -> SectionView {
    let title = locale.text(Message::Reasoning).to_string();
    let Some(snapshot) = snapshot else {
        return SectionView {
            id: SectionId::Reasoning,
            title,
            body: SectionBody::Placeholder {
                message: locale.text(Message::NoReasoning).to_string(),
            },
        };
    };

    let or_placeholder = |text: Option<String>| text.unwrap_or_else(|| PLACEHOLDER.to_string());
    let line = |message: Message, value: String| (locale.text(message).to_string(), value);

    let mut lines = vec![
        line(
            Message::GeneratedAt,
            or_placeholder(snapshot.generated_at.as_ref().map(format::timestamp)),
        ),
        line(Message::Model, or_placeholder(snapshot.model.clone())),
    ];
    let mut lists = Vec::new();

    match &snapshot.summary {
        Some(summary) => {
            lines.push(line(
                Message::Bias,
                or_placeholder(summary.bias.as_ref().map(|b| bias_text(b, locale))),
            ));
            lines.push(line(
                Message::Confidence,
                or_placeholder(summary.confidence.map(format::confidence)),
            ));
            lines.push(line(Message::Summary, or_placeholder(summary.summary.clone())));
            lines.push(line(
                Message::PositionSuggestion,
                or_placeholder(summary.position_suggestion.clone()),
            ));

            if !summary.key_signals.is_empty() {
                let signals = summary
                    .key_signals
                    .iter()
                    .map(|s| match &s.detail {
                        Some(detail) => format!("{}: {detail}", s.signal),
                        None => s.signal.clone(),
                    })
                    .collect();
                lists.push((locale.text(Message::KeySignals).to_string(), signals));
            }
            if !summary.risks.is_empty() {
                lists.push((locale.text(Message::Risks).to_string(), summary.risks.clone()));
            }
        }
        None => lines.push(line(Message::Summary, locale.text(Message::NoData).to_string())),
    }

    SectionView {
        id: SectionId::Reasoning,
        title,
        body: SectionBody::Reasoning { lines, lists },
    }
}

fn bias_text(bias: &Bias, locale: &Locale) -> String {
    match bias {
        Bias::Bullish => locale.text(Message::Bullish).to_string(),
        Bias::Bearish => locale.text(Message::Bearish).to_string(),
        Bias::Neutral => locale.text(Message::Neutral).to_string(),
        Bias::Other(raw) => raw.clone(),
    }
}

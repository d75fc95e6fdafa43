//! Aggregate Payload Model
//!
//! Typed view of the `GET /market/overview` body. Sections are independent:
//! a missing or malformed section is `None` and never invalidates the others.
//! Parsing goes through the field resolver so the top-level keys, the insight
//! objects, and the reasoning snapshot all tolerate either key spelling.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::fields::{
    Row, resolve, resolve_decimal, resolve_in, resolve_list, resolve_str, value_text,
};
use super::format::timestamp_value;
use super::sections::SectionId;

// =============================================================================
// Source Insight
// =============================================================================

/// A qualitative insight blob (market, peripheral, or macro).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInsight {
    /// When the backend produced the insight.
    pub generated_at: Option<DateTime<Utc>>,
    /// Human-readable summary.
    pub summary_text: Option<String>,
    /// The untouched insight object.
    pub raw: Value,
}

impl SourceInsight {
    /// Parse an insight object; non-objects yield `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        Some(Self {
            generated_at: resolve(record, "generated_at").and_then(timestamp_value),
            summary_text: resolve_str(record, "summary_text").map(str::to_string),
            raw: value.clone(),
        })
    }
}

// =============================================================================
// Reasoning Snapshot
// =============================================================================

/// Directional bias of a reasoning summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bias {
    /// Expecting the market to rise.
    Bullish,
    /// Expecting the market to fall.
    Bearish,
    /// No directional view.
    Neutral,
    /// A value outside the known set, kept verbatim.
    Other(String),
}

impl Bias {
    /// Parse a bias label case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bullish" => Self::Bullish,
            "bearish" => Self::Bearish,
            "neutral" => Self::Neutral,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => f.write_str("bullish"),
            Self::Bearish => f.write_str("bearish"),
            Self::Neutral => f.write_str("neutral"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// One entry of a reasoning summary's key signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignal {
    /// Short signal name or the whole entry when it was plain text.
    pub signal: String,
    /// Optional elaboration.
    pub detail: Option<String>,
}

impl KeySignal {
    fn from_json(value: &Value) -> Option<Self> {
        if let Some(text) = value_text(value) {
            return Some(Self {
                signal: text,
                detail: None,
            });
        }

        let record = value.as_object()?;
        let signal = resolve_str(record, "signal")
            .or_else(|| resolve_str(record, "name"))
            .or_else(|| resolve_str(record, "title"))?;

        Some(Self {
            signal: signal.to_string(),
            detail: resolve_str(record, "detail")
                .or_else(|| resolve_str(record, "description"))
                .map(str::to_string),
        })
    }
}

/// Structured body of a reasoning snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningSummary {
    /// Directional bias.
    pub bias: Option<Bias>,
    /// Confidence, either a ratio or a percent.
    pub confidence: Option<Decimal>,
    /// Narrative summary.
    pub summary: Option<String>,
    /// Signals supporting the bias.
    pub key_signals: Vec<KeySignal>,
    /// Suggested positioning.
    pub position_suggestion: Option<String>,
    /// Risks to the view.
    pub risks: Vec<String>,
}

impl ReasoningSummary {
    /// Parse a summary object.
    ///
    /// Some backends store the summary as JSON text; a string that decodes to
    /// an object is accepted.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let decoded;
        let value = match value {
            Value::String(text) => {
                decoded = serde_json::from_str::<Value>(text).ok()?;
                &decoded
            }
            other => other,
        };
        let record = value.as_object()?;

        let key_signals = resolve_list(record, "key_signals")
            .map(|items| items.iter().filter_map(KeySignal::from_json).collect())
            .unwrap_or_default();

        let risks = resolve_list(record, "risks")
            .map(|items| items.iter().filter_map(value_text).collect())
            .unwrap_or_default();

        Some(Self {
            bias: resolve_str(record, "bias").map(Bias::parse),
            confidence: resolve_decimal(record, "confidence"),
            summary: resolve_str(record, "summary").map(str::to_string),
            key_signals,
            position_suggestion: resolve_str(record, "position_suggestion").map(str::to_string),
            risks,
        })
    }
}

/// A previously generated AI reasoning result.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningSnapshot {
    /// When the reasoning was generated.
    pub generated_at: Option<DateTime<Utc>>,
    /// Model that produced it.
    pub model: Option<String>,
    /// Structured result.
    pub summary: Option<ReasoningSummary>,
}

impl ReasoningSnapshot {
    /// Parse a reasoning snapshot object; non-objects yield `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        Some(Self {
            generated_at: resolve(record, "generated_at").and_then(timestamp_value),
            model: resolve_str(record, "model").map(str::to_string),
            summary: resolve(record, "summary").and_then(ReasoningSummary::from_json),
        })
    }
}

// =============================================================================
// Aggregate Payload
// =============================================================================

/// Everything the overview endpoint returns in one load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatePayload {
    /// Realtime index quotes.
    pub realtime_indices: Option<Vec<Row>>,
    /// Whole-market fund flow.
    pub market_fund_flow: Option<Vec<Row>>,
    /// Stock Connect fund flow.
    pub hsgt_fund_flow: Option<Vec<Row>>,
    /// Margin account balances.
    pub margin_account: Option<Vec<Row>>,
    /// Index history by code, ordered by code.
    pub index_history: Option<BTreeMap<String, Vec<Row>>>,
    /// Domestic market insight.
    pub market_insight: Option<SourceInsight>,
    /// Peripheral market insight.
    pub peripheral_insight: Option<SourceInsight>,
    /// Macro insight.
    pub macro_insight: Option<SourceInsight>,
    /// Market activity metrics.
    pub market_activity: Option<Vec<Row>>,
    /// Latest reasoning snapshot, if any was generated.
    pub latest_reasoning: Option<ReasoningSnapshot>,
}

impl AggregatePayload {
    /// Build the payload from a response body.
    ///
    /// A body wrapped as `{"data": {...}}` is unwrapped first.
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        let body = match resolve_in(body, "data") {
            Some(inner) if inner.is_object() => inner,
            _ => body,
        };

        let section = |id: SectionId| resolve_in(body, id.payload_key());
        let rows = |id: SectionId| section(id).and_then(rows_from_json);
        let insight = |id: SectionId| section(id).and_then(SourceInsight::from_json);

        Self {
            realtime_indices: rows(SectionId::RealtimeIndices),
            market_fund_flow: rows(SectionId::MarketFundFlow),
            hsgt_fund_flow: rows(SectionId::HsgtFundFlow),
            margin_account: rows(SectionId::MarginAccount),
            index_history: section(SectionId::IndexHistory).and_then(history_from_json),
            market_insight: insight(SectionId::MarketInsight),
            peripheral_insight: insight(SectionId::PeripheralInsight),
            macro_insight: insight(SectionId::MacroInsight),
            market_activity: rows(SectionId::MarketActivity),
            latest_reasoning: section(SectionId::Reasoning).and_then(ReasoningSnapshot::from_json),
        }
    }

    /// Rows of a flat table section.
    ///
    /// Index history is keyed by code and is not a flat table; use
    /// [`Self::index_history`].
    #[must_use]
    pub fn rows(&self, id: SectionId) -> Option<&[Row]> {
        match id {
            SectionId::RealtimeIndices => self.realtime_indices.as_deref(),
            SectionId::MarketFundFlow => self.market_fund_flow.as_deref(),
            SectionId::HsgtFundFlow => self.hsgt_fund_flow.as_deref(),
            SectionId::MarginAccount => self.margin_account.as_deref(),
            SectionId::MarketActivity => self.market_activity.as_deref(),
            _ => None,
        }
    }

    /// Insight for an insight section.
    #[must_use]
    pub const fn insight(&self, id: SectionId) -> Option<&SourceInsight> {
        match id {
            SectionId::MarketInsight => self.market_insight.as_ref(),
            SectionId::PeripheralInsight => self.peripheral_insight.as_ref(),
            SectionId::MacroInsight => self.macro_insight.as_ref(),
            _ => None,
        }
    }
}

fn rows_from_json(value: &Value) -> Option<Vec<Row>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|item| item.as_object().cloned()).collect())
}

fn history_from_json(value: &Value) -> Option<BTreeMap<String, Vec<Row>>> {
    let by_code = value.as_object()?;
    Some(
        by_code
            .iter()
            .filter_map(|(code, series)| rows_from_json(series).map(|rows| (code.clone(), rows)))
            .collect(),
    )
}

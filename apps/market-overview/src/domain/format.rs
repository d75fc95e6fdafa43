//! Cell Formatting
//!
//! Stateless conversions from resolved feed values to display text. Numeric
//! formatters take an already-parsed [`Decimal`]; a value that fails to parse
//! never reaches them and the renderer shows [`PLACEHOLDER`] instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::fields::{value_decimal, value_text};
use super::language::Language;

/// Text shown for any value that is missing or malformed.
pub const PLACEHOLDER: &str = "--";

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Smallest value read as epoch seconds (ten digits, 2001-09-09).
const EPOCH_SECONDS_MIN: i64 = 1_000_000_000;

/// Direction of a signed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Positive.
    Up,
    /// Negative.
    Down,
    /// Zero.
    Flat,
}

impl Trend {
    /// Trend of a decimal.
    #[must_use]
    pub fn of(value: Decimal) -> Self {
        if value.is_sign_positive() && !value.is_zero() {
            Self::Up
        } else if value.is_sign_negative() && !value.is_zero() {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// Trend of a decimal as displayed with `places` decimal places.
    #[must_use]
    pub fn at_places(value: Decimal, places: u32) -> Self {
        Self::of(value.round_dp(places))
    }
}

/// Fixed number of decimal places.
#[must_use]
pub fn decimal(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp(places);
    let mut text = rounded.to_string();
    pad_places(&mut text, places);
    text
}

/// Fixed decimal places with an explicit `+` on positive values.
#[must_use]
pub fn signed_decimal(value: Decimal, places: u32) -> String {
    let body = decimal(value, places);
    if Trend::at_places(value, places) == Trend::Up {
        format!("+{body}")
    } else {
        body
    }
}

/// Percent with sign, two places. The input is already in percent units.
#[must_use]
pub fn percent(value: Decimal) -> String {
    format!("{}%", signed_decimal(value, 2))
}

/// Large amount scaled to the language's customary units.
#[must_use]
pub fn amount(value: Decimal, language: Language) -> String {
    let scales: &[(i64, &str)] = match language {
        Language::Zh => &[(100_000_000, "亿"), (10_000, "万")],
        Language::En => &[(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")],
    };

    let magnitude = value.abs();
    for &(scale, unit) in scales {
        let scale = Decimal::from(scale);
        if magnitude >= scale {
            return format!("{}{unit}", decimal(value / scale, 2));
        }
    }

    decimal(value, 2)
}

/// Confidence as a percent; ratios in `[0, 1]` are scaled up.
#[must_use]
pub fn confidence(value: Decimal) -> String {
    let pct = if value.abs() <= Decimal::ONE {
        value * Decimal::ONE_HUNDRED
    } else {
        value
    };
    format!("{}%", decimal(pct, 0))
}

/// Date portion of a JSON value (`YYYY-MM-DD`).
///
/// Unparseable strings are shown as given; they are usually already a
/// human-readable date in some other layout.
#[must_use]
pub fn date(value: &Value) -> Option<String> {
    if let Some(ts) = timestamp_value(value) {
        return Some(ts.format("%Y-%m-%d").to_string());
    }
    value_text(value)
}

/// Timestamp as `YYYY-MM-DD HH:MM` in UTC.
#[must_use]
pub fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Parse a timestamp from a JSON value.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, `YYYYMMDD`, and epoch
/// seconds or milliseconds (as numbers or numeric strings).
#[must_use]
pub fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(_) => value_decimal(value).and_then(epoch),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // Eight-digit compact dates would otherwise read as epoch seconds.
    if raw.len() == 8
        && raw.chars().all(|c| c.is_ascii_digit())
        && let Ok(day) = NaiveDate::parse_from_str(raw, "%Y%m%d")
    {
        return day.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }

    if raw.chars().all(|c| c.is_ascii_digit()) {
        return super::fields::parse_decimal(raw).and_then(epoch);
    }

    None
}

fn epoch(value: Decimal) -> Option<DateTime<Utc>> {
    let whole = i64::try_from(value.trunc()).ok()?;
    if whole < EPOCH_SECONDS_MIN {
        return None;
    }
    if whole > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(whole)
    } else {
        DateTime::from_timestamp(whole, 0)
    }
}

fn pad_places(text: &mut String, places: u32) {
    if places == 0 {
        return;
    }
    let current = text.find('.').map_or(0, |dot| text.len() - dot - 1);
    if current == 0 && !text.contains('.') {
        text.push('.');
    }
    for _ in current..places as usize {
        text.push('0');
    }
}

//! Dual-Key Field Resolution
//!
//! Backend feeds disagree on key spelling: some rows arrive as
//! `{"trade_date": ...}`, others as `{"tradeDate": ...}`, sometimes both in
//! the same payload. Every lookup in the renderer and payload parser goes
//! through [`resolve`] so the tolerance lives in one place.
//!
//! Resolution order is fixed: the underscore spelling first, then the camel
//! spelling. JSON `null` counts as absent, so a `null` under the underscore
//! key falls through to a value under the camel key.
//!
//! An unresolved lookup is normal. Feeds omit optional fields and callers map
//! `None` to the placeholder cell.

use std::borrow::Cow;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// A single feed record.
pub type Row = Map<String, Value>;

// =============================================================================
// Spelling Conversion
// =============================================================================

/// Convert a field name to its underscore spelling.
///
/// Runs of capitals are treated as one word, so `runLLM` becomes `run_llm`
/// and `HTTPStatus` becomes `http_status`.
#[must_use]
pub fn snake_case(name: &str) -> Cow<'_, str> {
    if !name.chars().any(char::is_uppercase) {
        return Cow::Borrowed(name);
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // Inside a capital run: the last capital starts a new word
                // when followed by lowercase (`HTTPStatus` -> `http_status`).
                Some(_) => next.is_some_and(char::is_lowercase),
            };
            if starts_word {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

/// Convert a field name to its camel spelling.
#[must_use]
pub fn camel_case(name: &str) -> Cow<'_, str> {
    if !name.contains('_') {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == '_' {
            // Leading underscores are kept; they are part of the name.
            if out.is_empty() {
                out.push(c);
            } else {
                upper_next = true;
            }
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve a logical field against a record.
///
/// `field` may be passed in either spelling. Returns the first non-null value
/// found under the underscore spelling, then the camel spelling.
#[must_use]
pub fn resolve<'a>(record: &'a Row, field: &str) -> Option<&'a Value> {
    let snake = snake_case(field);
    let camel = if field.chars().any(char::is_uppercase) {
        Cow::Borrowed(field)
    } else {
        camel_case(field)
    };

    [snake.as_ref(), camel.as_ref()]
        .into_iter()
        .filter_map(|key| record.get(key))
        .find(|value| !value.is_null())
}

/// Resolve a field against any JSON value; non-objects never resolve.
#[must_use]
pub fn resolve_in<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    value.as_object().and_then(|record| resolve(record, field))
}

/// Resolve a field to a non-blank string slice.
#[must_use]
pub fn resolve_str<'a>(record: &'a Row, field: &str) -> Option<&'a str> {
    resolve(record, field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Resolve a field to display text.
///
/// Strings (non-blank), numbers, and booleans resolve; arrays and objects do
/// not, since they have no single-cell rendering.
#[must_use]
pub fn resolve_text(record: &Row, field: &str) -> Option<String> {
    value_text(resolve(record, field)?)
}

/// Resolve a field to a decimal.
///
/// Accepts JSON numbers and numeric strings. Malformed input resolves to
/// `None` instead of an error.
#[must_use]
pub fn resolve_decimal(record: &Row, field: &str) -> Option<Decimal> {
    value_decimal(resolve(record, field)?)
}

/// Resolve a field to a list.
#[must_use]
pub fn resolve_list<'a>(record: &'a Row, field: &str) -> Option<&'a Vec<Value>> {
    resolve(record, field).and_then(Value::as_array)
}

/// Resolve a field to a nested record.
#[must_use]
pub fn resolve_object<'a>(record: &'a Row, field: &str) -> Option<&'a Row> {
    resolve(record, field).and_then(Value::as_object)
}

/// Text form of a scalar JSON value.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Decimal form of a JSON value.
#[must_use]
pub fn value_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string())
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Parse a numeric string leniently.
///
/// Surrounding whitespace, thousands separators, a leading `+`, and a
/// trailing `%` are accepted. `NaN`, infinities, and anything else that is
/// not a finite number yield `None`.
#[must_use]
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

// =============================================================================
// Extension Trait
// =============================================================================

/// Method-style access to the resolver on a row.
pub trait FieldAccess {
    /// See [`resolve`].
    fn field(&self, name: &str) -> Option<&Value>;
    /// See [`resolve_str`].
    fn field_str(&self, name: &str) -> Option<&str>;
    /// See [`resolve_text`].
    fn field_text(&self, name: &str) -> Option<String>;
    /// See [`resolve_decimal`].
    fn field_decimal(&self, name: &str) -> Option<Decimal>;
}

impl FieldAccess for Row {
    fn field(&self, name: &str) -> Option<&Value> {
        resolve(self, name)
    }

    fn field_str(&self, name: &str) -> Option<&str> {
        resolve_str(self, name)
    }

    fn field_text(&self, name: &str) -> Option<String> {
        resolve_text(self, name)
    }

    fn field_decimal(&self, name: &str) -> Option<Decimal> {
        resolve_decimal(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test_case("trade_date", "trade_date" ; "already snake")]
    #[test_case("tradeDate", "trade_date" ; "simple camel")]
    #[test_case("mainNetInflowPct", "main_net_inflow_pct" ; "multi word")]
    #[test_case("runLLM", "run_llm" ; "trailing acronym")]
    #[test_case("HTTPStatus", "http_status" ; "leading acronym")]
    #[test_case("change5d", "change5d" ; "digits stay attached")]
    fn snake_case_conversion(input: &str, expected: &str) {
        assert_eq!(snake_case(input), expected);
    }

    #[test_case("trade_date", "tradeDate" ; "simple")]
    #[test_case("main_net_inflow_pct", "mainNetInflowPct" ; "multi word")]
    #[test_case("code", "code" ; "single word")]
    #[test_case("_private", "_private" ; "leading underscore kept")]
    fn camel_case_conversion(input: &str, expected: &str) {
        assert_eq!(camel_case(input), expected);
    }

    #[test]
    fn resolves_either_spelling() {
        let snake = row(json!({"trade_date": "2024-05-06"}));
        let camel = row(json!({"tradeDate": "2024-05-06"}));

        assert_eq!(resolve(&snake, "trade_date"), Some(&json!("2024-05-06")));
        assert_eq!(resolve(&camel, "trade_date"), Some(&json!("2024-05-06")));
        assert_eq!(resolve(&camel, "tradeDate"), Some(&json!("2024-05-06")));
    }

    #[test]
    fn underscore_spelling_wins_when_both_present() {
        let record = row(json!({"net_inflow": 1, "netInflow": 2}));
        assert_eq!(resolve(&record, "net_inflow"), Some(&json!(1)));
    }

    #[test]
    fn null_falls_through_to_other_spelling() {
        let record = row(json!({"net_inflow": null, "netInflow": 2}));
        assert_eq!(resolve(&record, "net_inflow"), Some(&json!(2)));
    }

    #[test]
    fn both_null_or_missing_is_none() {
        let record = row(json!({"net_inflow": null, "netInflow": null}));
        assert_eq!(resolve(&record, "net_inflow"), None);
        assert_eq!(resolve(&record, "something_else"), None);
    }

    #[test]
    fn camel_spelling_passed_verbatim_is_checked() {
        let record = row(json!({"runLLM": true}));
        assert_eq!(resolve(&record, "runLLM"), Some(&json!(true)));
    }

    #[test]
    fn resolve_in_non_object_is_none() {
        assert_eq!(resolve_in(&json!([1, 2]), "code"), None);
        assert_eq!(resolve_in(&json!("x"), "code"), None);
        assert_eq!(resolve_in(&json!({"code": "x"}), "code"), Some(&json!("x")));
    }

    #[test_case(json!(12.5), Some("12.5") ; "float")]
    #[test_case(json!(7), Some("7") ; "integer")]
    #[test_case(json!("1,234.50"), Some("1234.50") ; "thousands separators")]
    #[test_case(json!(" 3.2% "), Some("3.2") ; "percent suffix")]
    #[test_case(json!("+0.75"), Some("0.75") ; "explicit plus")]
    #[test_case(json!("1e3"), Some("1000") ; "scientific")]
    #[test_case(json!("NaN"), None ; "nan string")]
    #[test_case(json!("Infinity"), None ; "infinity string")]
    #[test_case(json!("n/a"), None ; "garbage")]
    #[test_case(json!(""), None ; "empty string")]
    #[test_case(json!(true), None ; "boolean")]
    fn decimal_parsing(value: Value, expected: Option<&str>) {
        let expected = expected.map(|s| Decimal::from_str(s).unwrap());
        assert_eq!(value_decimal(&value), expected);
    }

    #[test]
    fn text_resolution_skips_blank_and_structured_values() {
        let record = row(json!({"a": "  ", "b": [1], "c": {"x": 1}, "d": 3, "e": false}));
        assert_eq!(resolve_text(&record, "a"), None);
        assert_eq!(resolve_text(&record, "b"), None);
        assert_eq!(resolve_text(&record, "c"), None);
        assert_eq!(resolve_text(&record, "d").as_deref(), Some("3"));
        assert_eq!(resolve_text(&record, "e").as_deref(), Some("false"));
    }

    #[test]
    fn extension_trait_matches_free_functions() {
        let record = row(json!({"changePct": "1.5"}));
        assert_eq!(record.field("change_pct"), resolve(&record, "change_pct"));
        assert_eq!(record.field_str("change_pct"), Some("1.5"));
        assert_eq!(
            record.field_decimal("change_pct"),
            Some(Decimal::from_str("1.5").unwrap())
        );
    }

    fn snake_name() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z]{2,8}", 1..4).prop_map(|words| words.join("_"))
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn same_value_under_either_convention(name in snake_name(), value in scalar()) {
            let mut snake_row = Row::new();
            snake_row.insert(name.clone(), value.clone());
            let mut camel_row = Row::new();
            camel_row.insert(camel_case(&name).into_owned(), value.clone());

            prop_assert_eq!(resolve(&snake_row, &name), Some(&value));
            prop_assert_eq!(resolve(&camel_row, &name), Some(&value));
            prop_assert_eq!(resolve(&snake_row, &name), resolve(&camel_row, &name));
        }

        #[test]
        fn absent_or_null_resolves_to_none(name in snake_name(), other in snake_name()) {
            prop_assume!(name != other);
            let mut record = Row::new();
            record.insert(name.clone(), Value::Null);
            record.insert(camel_case(&name).into_owned(), Value::Null);
            record.insert(format!("{other}_x"), Value::from(1));

            prop_assert_eq!(resolve(&record, &name), None);
        }

        #[test]
        fn snake_of_camel_round_trips(name in snake_name()) {
            let camel = camel_case(&name);
            let back = snake_case(&camel);
            prop_assert_eq!(back.as_ref(), name.as_str());
        }
    }
}

//! Dynamically typed values: entry metadata, custom directive arguments and
//! loader options.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::entry::Booking;
use crate::posting::Amount;

/// Metadata mapping attached to entries, postings and error sources.
///
/// Keys are kept sorted so serialized metadata is deterministic.
pub type Meta = BTreeMap<String, MetaValue>;

/// Metadata key holding the source file of an entry or posting.
pub const FILENAME_KEY: &str = "filename";

/// A metadata value.
///
/// Serialization matches the downstream JSON shape: decimals as strings,
/// dates as ISO strings. JSON strings always deserialize to `Text`, so
/// `"007"` or `"1e3"` keep their exact spelling; `Decimal` only receives
/// non-integral JSON numbers and `Date` is only built in-process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    Amount(Amount),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Integer(value)
    }
}

/// Source filename recorded in a metadata mapping, if it is text.
pub fn meta_filename(meta: &Meta) -> Option<&str> {
    meta.get(FILENAME_KEY).and_then(MetaValue::as_str)
}

/// One argument of a `custom` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CustomValue {
    String(String),
    Bool(bool),
    Decimal(Decimal),
    Date(NaiveDate),
    Account(String),
    Amount(Amount),
}

/// Loader options keyed by option name.
pub type OptionsMap = BTreeMap<String, OptionValue>;

/// An option value.
///
/// `Set` and `Booking` are only produced by in-process loaders; JSON input
/// lands in the earlier variants, with JSON strings always kept as `Text`.
/// Serialization normalizes all of them: decimals become strings, sets
/// become sorted arrays, booking methods their label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Decimal(Decimal),
    List(Vec<OptionValue>),
    Map(BTreeMap<String, OptionValue>),
    Set(BTreeSet<String>),
    Booking(Booking),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_meta_keys_sorted_and_typed() {
        let meta: Meta = serde_json::from_str(
            r#"{"filename": "/a/main.bean", "lineno": 12, "rate": 1.5, "flag": true, "when": "2022-04-01"}"#,
        )
        .unwrap();
        let keys: Vec<&str> = meta.keys().map(String::as_str).collect();
        assert_eq!(keys, ["filename", "flag", "lineno", "rate", "when"]);
        assert_eq!(meta_filename(&meta), Some("/a/main.bean"));
        assert_eq!(meta["lineno"], MetaValue::Integer(12));
        assert_eq!(meta["flag"], MetaValue::Bool(true));
        assert_eq!(meta["when"], MetaValue::from("2022-04-01"));
        assert!(matches!(meta["rate"], MetaValue::Decimal(_)));
    }

    #[test]
    fn test_meta_strings_keep_their_spelling() {
        let raw = r#"{"code":"1_000","invoice":"007","ref":"1e3","when":"2023-1-5"}"#;
        let meta: Meta = serde_json::from_str(raw).unwrap();
        for key in ["code", "invoice", "ref", "when"] {
            assert!(matches!(meta[key], MetaValue::Text(_)), "{key} was {:?}", meta[key]);
        }
        assert_eq!(serde_json::to_string(&meta).unwrap(), raw);
    }

    #[test]
    fn test_meta_date_serializes_as_iso_text() {
        let mut meta = Meta::new();
        meta.insert(
            "when".to_string(),
            MetaValue::Date(NaiveDate::from_ymd_opt(2022, 4, 1).unwrap()),
        );
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"when":"2022-04-01"}"#);
    }

    #[test]
    fn test_option_strings_keep_their_spelling() {
        let options: OptionsMap =
            serde_json::from_str(r#"{"title":"1e3","tolerance":"0.0050"}"#).unwrap();
        assert_eq!(options["title"], OptionValue::from("1e3"));
        assert_eq!(
            serde_json::to_string(&options).unwrap(),
            r#"{"title":"1e3","tolerance":"0.0050"}"#
        );
    }

    #[test]
    fn test_meta_decimal_serializes_as_string() {
        let mut meta = Meta::new();
        meta.insert(
            "rate".to_string(),
            MetaValue::Decimal(Decimal::from_str("0.05").unwrap()),
        );
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"rate":"0.05"}"#);
    }

    #[test]
    fn test_option_values_normalize_on_serialize() {
        let mut options = OptionsMap::new();
        options.insert(
            "operating_currency".to_string(),
            OptionValue::Set(["USD".to_string(), "EUR".to_string()].into_iter().collect()),
        );
        options.insert("booking_method".to_string(), OptionValue::Booking(Booking::Strict));
        options.insert(
            "tolerance".to_string(),
            OptionValue::Decimal(Decimal::from_str("0.005").unwrap()),
        );
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(
            json,
            r#"{"booking_method":"STRICT","operating_currency":["EUR","USD"],"tolerance":"0.005"}"#
        );
    }

    #[test]
    fn test_custom_value_tagging() {
        let value: CustomValue =
            serde_json::from_str(r#"{"type": "account", "value": "Assets:Bank"}"#).unwrap();
        assert_eq!(value, CustomValue::Account("Assets:Bank".to_string()));
    }
}

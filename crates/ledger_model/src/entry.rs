//! Ledger entries: one dated record with metadata and a typed body.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::posting::{Amount, Posting};
use crate::value::{CustomValue, Meta};

/// A dated ledger record.
///
/// `meta` carries the loader's source location (`filename`, `lineno`) plus
/// any user metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    #[serde(default)]
    pub meta: Meta,
    #[serde(flatten)]
    pub body: EntryBody,
}

impl Entry {
    pub fn new(date: NaiveDate, meta: Meta, body: impl Into<EntryBody>) -> Self {
        Self {
            date,
            meta,
            body: body.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.body.kind()
    }
}

/// Variant-specific payload of an [`Entry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryBody {
    Open(Open),
    Close(Close),
    Commodity(Commodity),
    Pad(Pad),
    Balance(Balance),
    Transaction(Transaction),
    Note(Note),
    Event(Event),
    Price(Price),
    Document(Document),
    Custom(Custom),
}

impl EntryBody {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryBody::Open(_) => EntryKind::Open,
            EntryBody::Close(_) => EntryKind::Close,
            EntryBody::Commodity(_) => EntryKind::Commodity,
            EntryBody::Pad(_) => EntryKind::Pad,
            EntryBody::Balance(_) => EntryKind::Balance,
            EntryBody::Transaction(_) => EntryKind::Transaction,
            EntryBody::Note(_) => EntryKind::Note,
            EntryBody::Event(_) => EntryKind::Event,
            EntryBody::Price(_) => EntryKind::Price,
            EntryBody::Document(_) => EntryKind::Document,
            EntryBody::Custom(_) => EntryKind::Custom,
        }
    }
}

macro_rules! impl_into_body {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for EntryBody {
                fn from(body: $variant) -> Self {
                    EntryBody::$variant(body)
                }
            }
        )*
    };
}

impl_into_body!(
    Open,
    Close,
    Commodity,
    Pad,
    Balance,
    Transaction,
    Note,
    Event,
    Price,
    Document,
    Custom,
);

/// Field-less discriminant of [`EntryBody`].
///
/// The label is the wire value of the downstream `entrytype` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Open,
    Close,
    Commodity,
    Pad,
    Balance,
    Transaction,
    Note,
    Event,
    Price,
    Document,
    Custom,
}

impl EntryKind {
    pub const ALL: [EntryKind; 11] = [
        EntryKind::Open,
        EntryKind::Close,
        EntryKind::Commodity,
        EntryKind::Pad,
        EntryKind::Balance,
        EntryKind::Transaction,
        EntryKind::Note,
        EntryKind::Event,
        EntryKind::Price,
        EntryKind::Document,
        EntryKind::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Open => "OPEN",
            EntryKind::Close => "CLOSE",
            EntryKind::Commodity => "COMMODITY",
            EntryKind::Pad => "PAD",
            EntryKind::Balance => "BALANCE",
            EntryKind::Transaction => "TRANSACTION",
            EntryKind::Note => "NOTE",
            EntryKind::Event => "EVENT",
            EntryKind::Price => "PRICE",
            EntryKind::Document => "DOCUMENT",
            EntryKind::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lot booking method declared on an `open` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Booking {
    Strict,
    StrictWithSize,
    None,
    Average,
    Fifo,
    Lifo,
    Hifo,
}

impl Booking {
    pub fn as_str(self) -> &'static str {
        match self {
            Booking::Strict => "STRICT",
            Booking::StrictWithSize => "STRICT_WITH_SIZE",
            Booking::None => "NONE",
            Booking::Average => "AVERAGE",
            Booking::Fifo => "FIFO",
            Booking::Lifo => "LIFO",
            Booking::Hifo => "HIFO",
        }
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Open {
    pub account: String,
    /// `None` when the directive lists no constraint currencies.
    #[serde(default)]
    pub currencies: Option<Vec<String>>,
    #[serde(default)]
    pub booking: Option<Booking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Close {
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub account: String,
    pub source_account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub account: String,
    pub amount: Amount,
    #[serde(default)]
    pub tolerance: Option<Decimal>,
    #[serde(default)]
    pub diff_amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub flag: String,
    #[serde(default)]
    pub payee: Option<String>,
    pub narration: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub links: BTreeSet<String>,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub account: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub currency: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub account: String,
    /// Absolute path of the document as resolved by the loader.
    pub filename: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub links: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Custom {
    #[serde(rename = "type")]
    pub custom_type: String,
    pub values: Vec<CustomValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_match_serde_tags() {
        let close = Entry::new(
            NaiveDate::from_ymd_opt(1970, 1, 4).unwrap(),
            Meta::new(),
            Close {
                account: "Assets:Checking".to_string(),
            },
        );
        let value = serde_json::to_value(&close).unwrap();
        assert_eq!(value["entry_type"], close.kind().label());
    }

    #[test]
    fn test_all_kinds_are_distinct() {
        let labels: BTreeSet<&str> = EntryKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(labels.len(), EntryKind::ALL.len());
    }

    #[test]
    fn test_booking_labels() {
        assert_eq!(Booking::StrictWithSize.as_str(), "STRICT_WITH_SIZE");
        let parsed: Booking = serde_json::from_str("\"STRICT_WITH_SIZE\"").unwrap();
        assert_eq!(parsed, Booking::StrictWithSize);
        assert_eq!(Booking::Fifo.to_string(), "FIFO");
    }
}

//! Typed ledger model handed over by the upstream loader.
//!
//! The loader (parser, booking, validation) lives elsewhere. This crate only
//! describes what it produces: an ordered list of entries, an options map and
//! the validation errors it collected. Everything here is immutable input for
//! the exporters.

pub mod entry;
pub mod error;
pub mod posting;
pub mod value;

pub use entry::{
    Balance, Booking, Close, Commodity, Custom, Document, Entry, EntryBody, EntryKind, Event, Note,
    Open, Pad, Price, Transaction,
};
pub use error::ValidationError;
pub use posting::{Amount, Cost, CostSpec, Posting, PostingCost};
pub use value::{
    meta_filename, CustomValue, Meta, MetaValue, OptionValue, OptionsMap, FILENAME_KEY,
};

use serde::{Deserialize, Serialize};

/// Output of one ledger load: options, validation errors and entries in
/// ledger order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadedLedger {
    #[serde(default)]
    pub options: OptionsMap,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl LoadedLedger {
    /// Parse the JSON hand-off document written by the loader.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const HANDOFF: &str = r#"{
        "options": {
            "title": "Household",
            "filename": "/ledger/main.bean",
            "include": ["/ledger/main.bean", "/ledger/2023.bean"],
            "inferred_tolerance_default": {"JPY": "1"}
        },
        "errors": [
            {"source": {"filename": "/ledger/main.bean", "lineno": 3}, "message": "Balance failed"}
        ],
        "entries": [
            {
                "date": "1970-01-03",
                "meta": {"filename": "/ledger/main.bean", "lineno": 1},
                "entry_type": "OPEN",
                "account": "Assets:Stocks:Tesla",
                "currencies": ["TSLA"],
                "booking": "FIFO"
            },
            {
                "date": "1970-01-04",
                "meta": {"filename": "/ledger/main.bean", "lineno": 2},
                "entry_type": "TRANSACTION",
                "flag": "*",
                "payee": "Buy milk",
                "narration": "Wholefood",
                "postings": [
                    {
                        "account": "Assets:Cash",
                        "units": {"number": "-1.0", "currency": "BTC"},
                        "price": {"number": "123.45", "currency": "USD"}
                    },
                    {
                        "account": "Expenses:Grocery",
                        "units": {"number": "123.45", "currency": "USD"}
                    }
                ]
            },
            {
                "date": "1970-01-05",
                "entry_type": "CUSTOM",
                "type": "budget",
                "values": [
                    {"type": "amount", "value": {"number": "123.45", "currency": "USD"}},
                    {"type": "bool", "value": true}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_handoff_document() {
        let ledger = LoadedLedger::from_json_slice(HANDOFF.as_bytes()).unwrap();
        assert!(ledger.has_errors());
        assert_eq!(ledger.entries.len(), 3);

        let open = &ledger.entries[0];
        assert_eq!(open.kind(), EntryKind::Open);
        assert_eq!(open.date, NaiveDate::from_ymd_opt(1970, 1, 3).unwrap());
        assert_eq!(meta_filename(&open.meta), Some("/ledger/main.bean"));
        match &open.body {
            EntryBody::Open(body) => {
                assert_eq!(body.account, "Assets:Stocks:Tesla");
                assert_eq!(body.booking, Some(Booking::Fifo));
            }
            other => panic!("expected open, got {:?}", other),
        }

        let txn = match &ledger.entries[1].body {
            EntryBody::Transaction(txn) => txn,
            other => panic!("expected transaction, got {:?}", other),
        };
        assert_eq!(txn.postings.len(), 2);
        assert!(txn.tags.is_empty());
        let price = txn.postings[0].price.as_ref().unwrap();
        assert_eq!(price.number, Some(Decimal::from_str("123.45").unwrap()));
        assert!(txn.postings[1].meta.is_none());

        assert_eq!(ledger.entries[2].kind(), EntryKind::Custom);
        assert!(ledger.entries[2].meta.is_empty());
    }

    #[test]
    fn test_entry_serializes_with_kind_tag() {
        let ledger = LoadedLedger::from_json_slice(HANDOFF.as_bytes()).unwrap();
        let value = serde_json::to_value(&ledger.entries[0]).unwrap();
        assert_eq!(value["entry_type"], "OPEN");
        assert_eq!(value["booking"], "FIFO");
        assert_eq!(value["date"], "1970-01-03");
    }
}

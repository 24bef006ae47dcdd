//! Entry extractors: one pure function per entry variant.
//!
//! Each extractor returns values positionally matching its table's columns
//! (see [`crate::schema`]). Extractors never touch sinks and never mutate the
//! entry they read; callers hand in already-normalized metadata.

use chrono::NaiveDate;
use ledger_ids::{EntryId, PostingId};
use ledger_model::{
    Amount, Balance, Close, Commodity, Custom, CustomValue, Document, EntryBody, EntryKind, Event,
    Meta, Note, Open, Pad, Posting, PostingCost, Price, Transaction,
};
use std::collections::BTreeSet;

use crate::encoder::FieldValue;
use crate::error::Result;

fn id_field(id: EntryId) -> FieldValue {
    FieldValue::Uuid(id.into())
}

fn json_field<T: serde::Serialize + ?Sized>(value: &T) -> Result<FieldValue> {
    Ok(FieldValue::Json(serde_json::to_vec(value)?))
}

fn set_field(values: &BTreeSet<String>) -> FieldValue {
    FieldValue::text_array(values.iter().cloned())
}

fn amount_number(amount: &Amount) -> FieldValue {
    FieldValue::opt_decimal(amount.number)
}

/// Row for `entry_base`: id, kind label, date, metadata document.
pub fn extract_base(
    id: EntryId,
    kind: EntryKind,
    date: NaiveDate,
    meta: &Meta,
) -> Result<Vec<FieldValue>> {
    Ok(vec![
        id_field(id),
        FieldValue::text(kind.label()),
        FieldValue::Date(date),
        json_field(meta)?,
    ])
}

/// Row for the type table of `body`.
pub fn extract_entry(id: EntryId, body: &EntryBody) -> Result<Vec<FieldValue>> {
    let row = match body {
        EntryBody::Open(open) => extract_open(id, open),
        EntryBody::Close(close) => extract_close(id, close),
        EntryBody::Commodity(commodity) => extract_commodity(id, commodity),
        EntryBody::Pad(pad) => extract_pad(id, pad),
        EntryBody::Balance(balance) => extract_balance(id, balance),
        EntryBody::Transaction(txn) => extract_transaction(id, txn),
        EntryBody::Note(note) => extract_note(id, note),
        EntryBody::Event(event) => extract_event(id, event),
        EntryBody::Price(price) => extract_price(id, price),
        EntryBody::Document(document) => extract_document(id, document),
        EntryBody::Custom(custom) => return extract_custom(id, custom),
    };
    Ok(row)
}

pub fn extract_open(id: EntryId, open: &Open) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(open.account.as_str()),
        open.currencies
            .as_ref()
            .map_or(FieldValue::Null, |c| FieldValue::text_array(c.iter().cloned())),
        open.booking
            .map_or(FieldValue::Null, |b| FieldValue::text(b.as_str())),
    ]
}

pub fn extract_close(id: EntryId, close: &Close) -> Vec<FieldValue> {
    vec![id_field(id), FieldValue::text(close.account.as_str())]
}

pub fn extract_commodity(id: EntryId, commodity: &Commodity) -> Vec<FieldValue> {
    vec![id_field(id), FieldValue::text(commodity.currency.as_str())]
}

pub fn extract_pad(id: EntryId, pad: &Pad) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(pad.account.as_str()),
        FieldValue::text(pad.source_account.as_str()),
    ]
}

/// The diff columns are always null; the loaded entry's `diff_amount` is
/// not exported.
pub fn extract_balance(id: EntryId, balance: &Balance) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(balance.account.as_str()),
        amount_number(&balance.amount),
        FieldValue::text(balance.amount.currency.as_str()),
        FieldValue::opt_decimal(balance.tolerance),
        FieldValue::Null,
        FieldValue::Null,
    ]
}

pub fn extract_transaction(id: EntryId, txn: &Transaction) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(txn.flag.as_str()),
        FieldValue::opt_text(txn.payee.as_deref()),
        FieldValue::text(txn.narration.as_str()),
        set_field(&txn.tags),
        set_field(&txn.links),
    ]
}

pub fn extract_note(id: EntryId, note: &Note) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(note.account.as_str()),
        FieldValue::text(note.comment.as_str()),
    ]
}

pub fn extract_event(id: EntryId, event: &Event) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(event.event_type.as_str()),
        FieldValue::text(event.description.as_str()),
    ]
}

pub fn extract_price(id: EntryId, price: &Price) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(price.currency.as_str()),
        amount_number(&price.amount),
        FieldValue::text(price.amount.currency.as_str()),
    ]
}

/// `document.filename` is written as given; path normalization happens in
/// the caller before extraction.
pub fn extract_document(id: EntryId, document: &Document) -> Vec<FieldValue> {
    vec![
        id_field(id),
        FieldValue::text(document.account.as_str()),
        FieldValue::text(document.filename.as_str()),
        set_field(&document.tags),
        set_field(&document.links),
    ]
}

pub fn extract_custom(id: EntryId, custom: &Custom) -> Result<Vec<FieldValue>> {
    let values = custom
        .values
        .iter()
        .map(custom_value_text)
        .collect::<Result<Vec<_>>>()?;
    Ok(vec![
        id_field(id),
        FieldValue::text(custom.custom_type.as_str()),
        FieldValue::text_array(values),
    ])
}

/// Text form of one custom argument.
///
/// Strings and decimals are JSON strings, booleans `true`/`false`, amounts a
/// compact `{"number":..,"currency":..}` object; dates and accounts are bare.
pub fn custom_value_text(value: &CustomValue) -> Result<String> {
    let text = match value {
        CustomValue::String(s) => serde_json::to_string(s)?,
        CustomValue::Bool(b) => b.to_string(),
        CustomValue::Decimal(d) => serde_json::to_string(d)?,
        CustomValue::Date(d) => d.to_string(),
        CustomValue::Account(account) => account.clone(),
        CustomValue::Amount(amount) => serde_json::to_string(amount)?,
    };
    Ok(text)
}

/// Row for `posting`.
///
/// A resolved cost fills `cost_number..cost_label`; a cost spec fills only
/// `cost_number_per`, `cost_number_total` and `cost_merge`. `meta` is the
/// already-normalized posting metadata, or an empty map.
pub fn extract_posting(
    id: PostingId,
    transaction_id: EntryId,
    posting: &Posting,
    meta: &Meta,
) -> Result<Vec<FieldValue>> {
    let (price_number, price_currency) = match &posting.price {
        Some(price) => (amount_number(price), FieldValue::text(price.currency.as_str())),
        None => (FieldValue::Null, FieldValue::Null),
    };

    let mut cost = [
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Null,
        FieldValue::Null,
    ];
    match &posting.cost {
        Some(PostingCost::Cost(resolved)) => {
            cost[0] = FieldValue::Decimal(resolved.number);
            cost[1] = FieldValue::text(resolved.currency.as_str());
            cost[2] = FieldValue::Date(resolved.date);
            cost[3] = FieldValue::opt_text(resolved.label.as_deref());
        }
        Some(PostingCost::Spec(spec)) => {
            cost[4] = FieldValue::opt_decimal(spec.number_per);
            cost[5] = FieldValue::opt_decimal(spec.number_total);
            cost[6] = spec.merge.map_or(FieldValue::Null, FieldValue::Bool);
        }
        None => {}
    }

    let mut row = Vec::with_capacity(16);
    row.push(FieldValue::Uuid(id.into()));
    row.push(id_field(transaction_id));
    row.push(FieldValue::text(posting.account.as_str()));
    row.push(amount_number(&posting.units));
    row.push(FieldValue::text(posting.units.currency.as_str()));
    row.push(price_number);
    row.push(price_currency);
    row.extend(cost);
    row.push(FieldValue::opt_text(posting.flag.as_deref()));
    row.push(json_field(meta)?);
    Ok(row)
}

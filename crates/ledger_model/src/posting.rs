//! Transaction legs and the amounts they move.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value::Meta;

/// A number in a commodity. The number may be missing on incomplete input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    #[serde(default)]
    pub number: Option<Decimal>,
    pub currency: String,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number: Some(number),
            currency: currency.into(),
        }
    }
}

/// A booked lot cost: every component is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub number: Decimal,
    pub currency: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub label: Option<String>,
}

/// A cost as written before booking resolved it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSpec {
    #[serde(default)]
    pub number_per: Option<Decimal>,
    #[serde(default)]
    pub number_total: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub merge: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostingCost {
    Cost(Cost),
    Spec(CostSpec),
}

/// One leg of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    pub units: Amount,
    #[serde(default)]
    pub cost: Option<PostingCost>,
    #[serde(default)]
    pub price: Option<Amount>,
    #[serde(default)]
    pub flag: Option<String>,
    /// Postings synthesized by padding or plugins carry no metadata at all.
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Posting {
    pub fn new(account: impl Into<String>, units: Amount) -> Self {
        Self {
            account: account.into(),
            units,
            cost: None,
            price: None,
            flag: None,
            meta: None,
        }
    }
}

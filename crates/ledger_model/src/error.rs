use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::value::Meta;

/// A problem reported by the loader, optionally pointing at the entry that
/// caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Source location; carries at least `filename`.
    pub source: Meta,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Box<Entry>>,
}

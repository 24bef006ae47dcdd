//! JSON artifacts: the options map and the validation errors.
//!
//! Both are normalized as copies; the loaded ledger is never modified.

use ledger_model::{EntryBody, OptionsMap, ValidationError};
use serde::Serialize;

use crate::paths::{PathError, PathNormalizer};

/// Options key holding loader-internal display state; never exported.
pub const DCONTEXT_KEY: &str = "dcontext";

/// Option keys whose values are source paths.
pub const PATH_OPTION_KEYS: [&str; 2] = ["filename", "include"];

/// Options ready for export: `dcontext` dropped, path options stripped.
pub fn normalize_options(
    options: &OptionsMap,
    paths: &PathNormalizer,
) -> Result<OptionsMap, PathError> {
    options
        .iter()
        .filter(|(key, _)| key.as_str() != DCONTEXT_KEY)
        .map(|(key, value)| {
            let value = if PATH_OPTION_KEYS.contains(&key.as_str()) {
                paths.strip_option(value)?
            } else {
                value.clone()
            };
            Ok::<_, PathError>((key.clone(), value))
        })
        .collect()
}

/// Errors ready for export.
///
/// Strips the source filename, the referenced entry's `meta.filename` and,
/// for transactions, each posting's `meta.filename`.
pub fn normalize_errors(
    errors: &[ValidationError],
    paths: &PathNormalizer,
) -> Result<Vec<ValidationError>, PathError> {
    errors.iter().map(|error| normalize_error(error, paths)).collect()
}

fn normalize_error(
    error: &ValidationError,
    paths: &PathNormalizer,
) -> Result<ValidationError, PathError> {
    let mut error = error.clone();
    error.source = paths.strip_meta(&error.source)?.into_owned();
    if let Some(entry) = error.entry.as_mut() {
        entry.meta = paths.strip_meta(&entry.meta)?.into_owned();
        if let EntryBody::Transaction(txn) = &mut entry.body {
            for posting in &mut txn.postings {
                if let Some(meta) = posting.meta.as_mut() {
                    *meta = paths.strip_meta(meta)?.into_owned();
                }
            }
        }
    }
    Ok(error)
}

#[derive(Serialize)]
struct ErrorsDocument<'a> {
    errors: &'a [ValidationError],
}

pub fn options_json(options: &OptionsMap) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(options)
}

/// `{"errors": [...]}`
pub fn errors_json(errors: &[ValidationError]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&ErrorsDocument { errors })
}

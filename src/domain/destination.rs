//! Country-to-destination selection.

use crate::domain::entities::LinkRecord;

/// Picks the destination for a visitor's country.
///
/// Returns the entry keyed by `country` when one exists, otherwise the
/// `default` entry. An absent or empty country goes straight to `default`.
/// Matching is exact: no case folding and no regional fallback.
///
/// Returns `None` only if the record has no `default` entry, which is a data
/// integrity problem for the caller to report.
pub fn select_destination<'a>(record: &'a LinkRecord, country: Option<&str>) -> Option<&'a str> {
    match country {
        Some(code) if !code.is_empty() => record
            .destinations
            .get(code)
            .map(String::as_str)
            .or_else(|| record.default_destination()),
        _ => record.default_destination(),
    }
}

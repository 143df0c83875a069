//! Link record entity carrying per-country routing destinations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Destination key used when no country-specific entry matches.
pub const DEFAULT_DESTINATION_KEY: &str = "default";

/// Routing metadata for a short link.
///
/// `destinations` maps an ISO country code (or `"default"`) to the URL a visitor
/// from that country is sent to. A record without a `default` entry is invalid.
///
/// The JSON form is what gets written to the cache:
///
/// ```json
/// {
///   "id": "abc123",
///   "accountId": "acc_1",
///   "destinations": { "default": "https://example.com", "FR": "https://example.fr" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1, max = 128))]
    pub account_id: String,
    #[validate(custom(function = "validate_destinations"))]
    pub destinations: BTreeMap<String, String>,
}

/// Reasons a serialized link record is rejected.
#[derive(Debug, Error)]
pub enum LinkRecordError {
    #[error("malformed link record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("link record {0} has no default destination")]
    MissingDefault(String),
}

impl LinkRecord {
    /// Creates a new LinkRecord instance.
    pub fn new(
        id: impl Into<String>,
        account_id: impl Into<String>,
        destinations: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            destinations,
        }
    }

    /// Parses a record from its JSON representation.
    ///
    /// Only the shape and the `default` entry are checked, matching what the
    /// record store guarantees. URL rules are enforced when records are written.
    ///
    /// # Errors
    ///
    /// Returns [`LinkRecordError::Malformed`] if the payload does not match the
    /// record shape and [`LinkRecordError::MissingDefault`] if there is no
    /// `default` destination.
    pub fn from_json(payload: &str) -> Result<Self, LinkRecordError> {
        let record: Self = serde_json::from_str(payload)?;
        if record.default_destination().is_none() {
            return Err(LinkRecordError::MissingDefault(record.id));
        }
        Ok(record)
    }

    /// Returns the fallback destination, if the record has one.
    pub fn default_destination(&self) -> Option<&str> {
        self.destinations
            .get(DEFAULT_DESTINATION_KEY)
            .map(String::as_str)
    }
}

fn validate_destinations(destinations: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if !destinations.contains_key(DEFAULT_DESTINATION_KEY) {
        return Err(ValidationError::new("missing_default_destination"));
    }

    for (key, destination) in destinations {
        if key.is_empty() {
            return Err(ValidationError::new("empty_destination_key"));
        }

        match url::Url::parse(destination) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ValidationError::new("invalid_destination_url")),
        }
    }

    Ok(())
}

//! Click event model for asynchronous click fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Country sentinel used when a click carries no country code.
///
/// Not a real ISO code; downstream aggregation must not treat it as one.
pub const UNKNOWN_COUNTRY: &str = "UNKNOWN";

/// A single redirect, as handed to the queue and the click actors.
///
/// Built by the redirect handler once the destination is known, then cloned
/// into each sink. Serialized in camelCase with the link id under `id`:
///
/// ```json
/// {
///   "accountId": "acc_1",
///   "id": "abc123",
///   "destination": "https://example.fr",
///   "country": "FR",
///   "latitude": 48.85,
///   "longitude": 2.35,
///   "timestamp": "2026-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub account_id: String,
    #[serde(rename = "id")]
    pub link_id: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A geotagged click as recorded by the per-account click tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoClick {
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub timestamp_millis: i64,
}

impl ClickEvent {
    /// Creates a click event stamped with the current time.
    pub fn new(
        account_id: String,
        link_id: String,
        destination: String,
        country: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Self {
        Self {
            account_id,
            link_id,
            destination,
            country,
            latitude,
            longitude,
            timestamp: Utc::now(),
        }
    }

    /// Returns the geotagged click, only when latitude, longitude and a
    /// non-empty country are all present.
    pub fn geo_click(&self) -> Option<GeoClick> {
        let country = self.country.as_deref().filter(|c| !c.is_empty())?;

        Some(GeoClick {
            latitude: self.latitude?,
            longitude: self.longitude?,
            country: country.to_string(),
            timestamp_millis: self.timestamp.timestamp_millis(),
        })
    }

    /// Country code, or [`UNKNOWN_COUNTRY`] when absent.
    pub fn country_or_unknown(&self) -> &str {
        self.country
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_COUNTRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(country: Option<&str>, latitude: Option<f64>, longitude: Option<f64>) -> ClickEvent {
        ClickEvent::new(
            "acc_1".to_string(),
            "abc123".to_string(),
            "https://example.fr".to_string(),
            country.map(str::to_string),
            latitude,
            longitude,
        )
    }

    #[test]
    fn test_geo_click_requires_all_parts() {
        let full = event(Some("FR"), Some(48.85), Some(2.35));
        let click = full.geo_click().unwrap();
        assert_eq!(click.country, "FR");
        assert_eq!(click.latitude, 48.85);
        assert_eq!(click.longitude, 2.35);
        assert_eq!(click.timestamp_millis, full.timestamp.timestamp_millis());

        assert!(event(Some("FR"), Some(48.85), None).geo_click().is_none());
        assert!(event(Some("FR"), None, Some(2.35)).geo_click().is_none());
        assert!(event(None, Some(48.85), Some(2.35)).geo_click().is_none());
        assert!(event(Some(""), Some(48.85), Some(2.35)).geo_click().is_none());
    }

    #[test]
    fn test_country_or_unknown() {
        assert_eq!(event(Some("FR"), None, None).country_or_unknown(), "FR");
        assert_eq!(event(None, None, None).country_or_unknown(), UNKNOWN_COUNTRY);
        assert_eq!(event(Some(""), None, None).country_or_unknown(), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(event(Some("FR"), None, None)).unwrap();

        assert_eq!(json["accountId"], "acc_1");
        assert_eq!(json["id"], "abc123");
        assert_eq!(json["destination"], "https://example.fr");
        assert_eq!(json["country"], "FR");
        assert!(json.get("latitude").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_deserialize_without_optionals() {
        let parsed: ClickEvent = serde_json::from_str(
            r#"{"accountId":"acc_1","id":"abc123","destination":"https://example.com","timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(parsed.link_id, "abc123");
        assert!(parsed.country.is_none());
        assert!(parsed.geo_click().is_none());
    }
}

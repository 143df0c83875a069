//! Handler for short link redirects.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect},
};
use serde_json::json;
use tracing::{debug, error};

use crate::domain::click_event::ClickEvent;
use crate::domain::destination::select_destination;
use crate::error::AppError;
use crate::state::{AppState, LATITUDE_HEADER, LONGITUDE_HEADER};

/// Redirects a short link to the destination for the visitor's country.
///
/// # Endpoint
///
/// `GET /{id}`
///
/// # Request Flow
///
/// 1. Resolve the link record (cache first, then the record store)
/// 2. Pick the destination for the country header, or `default`
/// 3. Hand a click event to the dispatcher in the background
/// 4. Return 307 Temporary Redirect
///
/// Click fan-out never delays or fails the redirect.
///
/// # Headers
///
/// - country header (`COUNTRY_HEADER`, default `cf-ipcountry`)
/// - `x-latitude` / `x-longitude` (decimal degrees, optional)
///
/// # Errors
///
/// Returns 404 Not Found if the link doesn't exist.
/// Returns 500 if the record store fails or the record has no default destination.
pub async fn redirect_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let record = state.resolution_service.resolve(&id).await?;

    let country = header_str(&headers, state.country_header.as_str());

    let Some(destination) = select_destination(&record, country) else {
        error!("Link {} has no default destination", record.id);
        return Err(AppError::internal(
            "Link has no default destination",
            json!({ "id": record.id }),
        ));
    };
    let destination = destination.to_string();

    if HeaderValue::from_str(&destination).is_err() {
        error!("Link {} routes to a value unusable as Location", record.id);
        return Err(AppError::internal(
            "Link destination is not a valid Location",
            json!({ "id": record.id }),
        ));
    }

    debug!(
        "Routing {} for country {:?} to {}",
        record.id, country, destination
    );

    let event = ClickEvent::new(
        record.account_id,
        record.id,
        destination.clone(),
        country.map(str::to_string),
        header_f64(&headers, LATITUDE_HEADER),
        header_f64(&headers, LONGITUDE_HEADER),
    );
    state.click_dispatcher.spawn_dispatch(event);

    Ok(Redirect::temporary(&destination))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    header_str(headers, name)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

//! Reverse geocoding: coordinates → [`PlaceDescription`].
//!
//! Transport and parse failures are reported as [`GeocodeError`]; "no
//! intersection nearby" is the successful [`PlaceDescription::NotFound`].

pub mod place;
pub mod resolver;

use thiserror::Error;

pub use place::{describe_response, Intersection, PlaceDescription, NO_NEARBY_STREETS};
pub use resolver::{GeoNamesResolver, LocationResolver};

/// Errors from the reverse-geocoding service.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Connection or transport failure.
    #[error("geocoding request failed: {0}")]
    Request(String),

    #[error("geocoding request timed out")]
    Timeout,

    /// Non-2xx HTTP status.
    #[error("geocoding service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// GeoNames in-band error object.
    #[error("geocoding service error {code}: {message}")]
    Service { code: i64, message: String },

    /// The body was not the expected JSON.
    #[error("failed to parse geocoding response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GeocodeError::Timeout
        } else {
            GeocodeError::Request(e.to_string())
        }
    }
}

//! Place descriptions and GeoNames payload decoding.

use std::fmt;

use serde::Deserialize;

use crate::geocode::GeocodeError;

/// Text used when the geocoder finds no intersection near the coordinates.
pub const NO_NEARBY_STREETS: &str = "No nearby streets found";

// ---------------------------------------------------------------------------
// Intersection
// ---------------------------------------------------------------------------

/// One GeoNames intersection record.
///
/// `cityName` is closer to a neighbourhood, `adminName2` to a county and
/// `adminName1` to a state.  Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Intersection {
    pub street1: String,
    pub street2: String,
    pub city_name: String,
    pub admin_name2: String,
    pub admin_name1: String,
    pub country_code: String,
}

impl Intersection {
    /// `true` when both street names are present.
    pub fn is_usable(&self) -> bool {
        !self.street1.trim().is_empty() && !self.street2.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// PlaceDescription
// ---------------------------------------------------------------------------

/// Human-readable summary of where the user is.
///
/// [`PlaceDescription::NotFound`] is a successful outcome, not an error; its
/// display text is [`NO_NEARBY_STREETS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceDescription {
    Intersection(Intersection),
    NotFound,
}

impl PlaceDescription {
    pub fn is_found(&self) -> bool {
        matches!(self, PlaceDescription::Intersection(_))
    }
}

impl fmt::Display for PlaceDescription {
    /// ```
    /// use place_narrator::geocode::{Intersection, PlaceDescription};
    ///
    /// let place = PlaceDescription::Intersection(Intersection {
    ///     street1: "Northside Piers".into(),
    ///     street2: "N 5th St".into(),
    ///     city_name: "Brooklyn".into(),
    ///     admin_name2: "Kings County".into(),
    ///     admin_name1: "New York".into(),
    ///     country_code: "US".into(),
    /// });
    /// assert_eq!(
    ///     place.to_string(),
    ///     "The intersection of Northside Piers and N 5th St in Brooklyn, Kings County, New York, US"
    /// );
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceDescription::NotFound => f.write_str(NO_NEARBY_STREETS),
            PlaceDescription::Intersection(i) => {
                write!(
                    f,
                    "The intersection of {} and {}",
                    i.street1.trim(),
                    i.street2.trim()
                )?;

                let region: Vec<&str> = [
                    &i.city_name,
                    &i.admin_name2,
                    &i.admin_name1,
                    &i.country_code,
                ]
                .into_iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();

                if !region.is_empty() {
                    write!(f, " in {}", region.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// In-band GeoNames error object, delivered with HTTP 200.
#[derive(Debug, Deserialize)]
struct ServiceStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    value: i64,
}

#[derive(Debug, Deserialize)]
struct IntersectionResponse {
    intersection: Option<serde_json::Value>,
    status: Option<ServiceStatus>,
}

/// Turn a raw GeoNames body into a [`PlaceDescription`].
///
/// A missing, empty, or street-less `intersection` becomes
/// [`PlaceDescription::NotFound`]; a `status` object becomes
/// [`GeocodeError::Service`]; anything that is not JSON becomes
/// [`GeocodeError::Parse`].
pub fn describe_response(body: &str) -> Result<PlaceDescription, GeocodeError> {
    let response: IntersectionResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    if let Some(status) = response.status {
        return Err(GeocodeError::Service {
            code: status.value,
            message: status.message,
        });
    }

    // GeoNames answers "nothing nearby" with `{}` or `"intersection": {}`.
    let record = match response.intersection {
        None | Some(serde_json::Value::Null) => return Ok(PlaceDescription::NotFound),
        Some(serde_json::Value::Object(map)) if map.is_empty() => {
            return Ok(PlaceDescription::NotFound)
        }
        Some(value) => value,
    };

    let intersection: Intersection =
        serde_json::from_value(record).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    if intersection.is_usable() {
        Ok(PlaceDescription::Intersection(intersection))
    } else {
        Ok(PlaceDescription::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

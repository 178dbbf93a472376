//! Position acquisition for place-narrator.
//!
//! # Architecture
//!
//! ```text
//! PositionProvider (trait) ── acquire() ──▶ Coordinates
//!        │
//!        └─ GatedPosition
//!              ├─ PermissionGate  (StoredPermission)        ── Denied ──▶ PermissionDenied
//!              └─ PositionSource  (IpLookupPosition | FixedPosition)
//!                    └─ wrapped in a timeout                ── elapsed ─▶ Unavailable
//! ```
//!
//! The gate is consulted first; when it says no, the source is never
//! touched.

pub mod permission;
pub mod provider;

use std::fmt;

use thiserror::Error;

pub use permission::{PermissionGate, PermissionStatus, StoredPermission};
pub use provider::{
    parse_ip_lookup, FixedPosition, GatedPosition, IpLookupPosition, PositionProvider,
    PositionSource,
};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` when either component is out of range or not finite.
    ///
    /// ```
    /// use place_narrator::location::Coordinates;
    ///
    /// assert!(Coordinates::new(35.69538, 139.705050).is_some());
    /// assert!(Coordinates::new(91.0, 0.0).is_none());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        (lat_ok && lon_ok).then_some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// LocationError
// ---------------------------------------------------------------------------

/// Failures while acquiring the device position.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    /// The user has not granted foreground location access.
    #[error("Permission to access location was denied")]
    PermissionDenied,

    /// The source timed out, was unreachable, or returned garbage.
    #[error("Unable to fetch location: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LocationError::Unavailable("position request timed out".into())
        } else {
            LocationError::Unavailable(e.to_string())
        }
    }
}

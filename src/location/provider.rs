//! `PositionProvider` trait and its permission-gated implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{LocationConfig, LocationSource};
use crate::location::permission::{PermissionGate, StoredPermission};
use crate::location::{Coordinates, LocationError};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Pipeline-facing interface: produce the current position once per run.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Coordinates, LocationError>;
}

/// Raw position backend, with no permission handling of its own.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

// ---------------------------------------------------------------------------
// GatedPosition
// ---------------------------------------------------------------------------

/// Checks the [`PermissionGate`] and then queries a [`PositionSource`]
/// under a timeout.  No retries.
pub struct GatedPosition {
    gate: Arc<dyn PermissionGate>,
    source: Arc<dyn PositionSource>,
    timeout: Duration,
}

impl GatedPosition {
    pub fn new(
        gate: Arc<dyn PermissionGate>,
        source: Arc<dyn PositionSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            gate,
            source,
            timeout,
        }
    }

    /// Wire up the stored permission and the configured source.
    pub fn from_config(config: &LocationConfig) -> Self {
        let source: Arc<dyn PositionSource> = match config.source {
            LocationSource::IpLookup => Arc::new(IpLookupPosition::from_config(config)),
            LocationSource::Fixed => Arc::new(FixedPosition {
                latitude: config.fixed_latitude,
                longitude: config.fixed_longitude,
            }),
        };

        Self::new(
            Arc::new(StoredPermission(config.permission)),
            source,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl PositionProvider for GatedPosition {
    async fn acquire(&self) -> Result<Coordinates, LocationError> {
        if !self.gate.request_foreground().await.is_granted() {
            log::warn!("location: foreground permission not granted");
            return Err(LocationError::PermissionDenied);
        }

        match tokio::time::timeout(self.timeout, self.source.current_position()).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Unavailable(format!(
                "no position within {} s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// FixedPosition
// ---------------------------------------------------------------------------

/// Always reports the same coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Coordinates::new(self.latitude, self.longitude).ok_or_else(|| {
            LocationError::Unavailable(format!(
                "configured coordinates out of range: {}, {}",
                self.latitude, self.longitude
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// IpLookupPosition
// ---------------------------------------------------------------------------

/// Coarse position from an ip-api.com style endpoint.
pub struct IpLookupPosition {
    client: reqwest::Client,
    url: String,
}

impl IpLookupPosition {
    pub fn from_config(config: &LocationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: config.ip_lookup_url.clone(),
        }
    }
}

#[async_trait]
impl PositionSource for IpLookupPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        log::debug!("location: GET {}", self.url);

        let json: serde_json::Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_ip_lookup(&json)
    }
}

/// Extract coordinates from an `{ "status": "success", "lat": …, "lon": … }`
/// payload.
///
/// ```
/// use place_narrator::location::parse_ip_lookup;
///
/// let json = serde_json::json!({ "status": "success", "lat": 40.71, "lon": -73.96 });
/// let c = parse_ip_lookup(&json).unwrap();
/// assert_eq!(c.latitude, 40.71);
/// ```
pub fn parse_ip_lookup(json: &serde_json::Value) -> Result<Coordinates, LocationError> {
    if let Some(status) = json["status"].as_str() {
        if status != "success" {
            let reason = json["message"].as_str().unwrap_or(status);
            return Err(LocationError::Unavailable(format!(
                "IP lookup failed: {reason}"
            )));
        }
    }

    let lat = json["lat"].as_f64();
    let lon = json["lon"].as_f64();

    match (lat, lon) {
        (Some(lat), Some(lon)) => Coordinates::new(lat, lon).ok_or_else(|| {
            LocationError::Unavailable(format!("IP lookup returned invalid coordinates {lat}, {lon}"))
        }),
        _ => Err(LocationError::Unavailable(
            "IP lookup response has no lat/lon".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

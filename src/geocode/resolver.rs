//! `LocationResolver` trait and the GeoNames client.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{GeocodeEndpoint, GeocoderConfig};
use crate::geocode::place::{describe_response, PlaceDescription};
use crate::geocode::GeocodeError;
use crate::location::Coordinates;

/// Reverse-geocodes coordinates into a [`PlaceDescription`].
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, at: Coordinates) -> Result<PlaceDescription, GeocodeError>;
}

/// Calls the GeoNames nearest-intersection web service.
///
/// The account name comes from [`crate::config::Credentials`]; nothing is
/// hardcoded.
pub struct GeoNamesResolver {
    client: reqwest::Client,
    config: GeocoderConfig,
    username: String,
}

impl GeoNamesResolver {
    pub fn from_config(config: &GeocoderConfig, username: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            username: username.into(),
        }
    }

    /// Full request URL for `at`, without the query string.
    pub fn endpoint_url(&self) -> String {
        let path = match self.config.endpoint {
            GeocodeEndpoint::Osm => "findNearestIntersectionOSMJSON",
            GeocodeEndpoint::Nearest => "findNearestIntersectionJSON",
        };
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LocationResolver for GeoNamesResolver {
    async fn resolve(&self, at: Coordinates) -> Result<PlaceDescription, GeocodeError> {
        let url = self.endpoint_url();
        log::debug!("geocode: GET {url} at {at}");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lng", at.longitude.to_string()),
                ("username", self.username.clone()),
                ("includeGeoName", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let place = describe_response(&body)?;
        log::debug!("geocode: {place}");
        Ok(place)
    }
}

//! Device position sources.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use crate::{clock::Clock, error::GeolocationError, model::Coordinates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    /// Upper bound on how long a position request may take.
    pub timeout: Duration,
    /// A previously obtained position younger than this may be reused.
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError>;
}

/// Always reports the configured position.
#[derive(Debug, Clone, Copy)]
pub struct StaticGeolocator {
    position: Coordinates,
}

impl StaticGeolocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for StaticGeolocator {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Ok(self.position)
    }
}

/// No position source on this device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocator;

#[async_trait]
impl Geolocator for NoGeolocator {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

/// Approximate position from the public IP address.
#[derive(Debug)]
pub struct IpGeolocator {
    url: String,
    http: Client,
    clock: Arc<dyn Clock>,
    last_fix: Mutex<Option<(Coordinates, DateTime<Utc>)>>,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self { url: url.into(), http: Client::new(), clock, last_fix: Mutex::new(None) }
    }

    fn reusable_fix(&self, maximum_age: Duration) -> Option<Coordinates> {
        let max_age = chrono::Duration::from_std(maximum_age).ok()?;
        let now = self.clock.now();
        let last_fix = *self.last_fix.lock();
        last_fix.filter(|(_, at)| now - *at < max_age).map(|(coords, _)| coords)
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        if let Some(coords) = self.reusable_fix(options.maximum_age) {
            tracing::debug!(%coords, "reusing recent position");
            return Ok(coords);
        }

        let res = self.http.get(&self.url).timeout(options.timeout).send().await.map_err(|e| {
            tracing::debug!(error = %e, "IP location request failed");
            if e.is_timeout() {
                GeolocationError::Timeout
            } else {
                GeolocationError::PositionUnavailable
            }
        })?;

        if res.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(GeolocationError::PermissionDenied);
        }
        if !res.status().is_success() {
            return Err(GeolocationError::PositionUnavailable);
        }

        let body: IpLookupResponse = res.json().await.map_err(|e| {
            tracing::debug!(error = %e, "IP location response unreadable");
            GeolocationError::PositionUnavailable
        })?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(latitude), Some(longitude)) => {
                let coords = Coordinates { latitude, longitude };
                *self.last_fix.lock() = Some((coords, self.clock.now()));
                Ok(coords)
            }
            _ => {
                tracing::debug!(message = ?body.message, "IP location lookup unsuccessful");
                Err(GeolocationError::PositionUnavailable)
            }
        }
    }
}

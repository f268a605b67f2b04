//! Outbound weather calls plus the read-through current-weather cache.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::{
    clock::Clock,
    error::WeatherError,
    model::{Coordinates, CurrentWeather, Forecast, LocationMatch},
    provider::{WeatherProvider, openweather::MAX_SEARCH_LIMIT},
};

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const MIN_QUERY_LEN: usize = 2;

pub fn default_ttl() -> Duration {
    Duration::minutes(10)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    weather: CurrentWeather,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct WeatherGateway {
    provider: Arc<dyn WeatherProvider>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl WeatherGateway {
    pub fn new(provider: Arc<dyn WeatherProvider>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(provider, clock, default_ttl())
    }

    pub fn with_ttl(provider: Arc<dyn WeatherProvider>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { provider, cache: Mutex::new(HashMap::new()), ttl, clock }
    }

    /// Location matches for a search-as-you-type box.
    ///
    /// Never fails: short queries return nothing without a request, and
    /// upstream errors are logged and turned into an empty list.
    pub async fn search_locations(&self, query: &str, limit: usize) -> Vec<LocationMatch> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        match self.provider.search_locations(query, limit.min(MAX_SEARCH_LIMIT)).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::debug!(query, error = %e, "location search failed, returning no matches");
                Vec::new()
            }
        }
    }

    pub async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        self.provider.current_weather(city).await
    }

    pub async fn current_weather_by_coordinates(
        &self,
        coords: Coordinates,
    ) -> Result<CurrentWeather, WeatherError> {
        self.provider.current_weather_by_coordinates(coords).await
    }

    pub async fn forecast(&self, city: &str) -> Result<Forecast, WeatherError> {
        self.provider.forecast(city).await
    }

    pub async fn forecast_by_coordinates(&self, coords: Coordinates) -> Result<Forecast, WeatherError> {
        self.provider.forecast_by_coordinates(coords).await
    }

    /// Cached entry for `city` if it is younger than the TTL.
    pub fn cached_weather(&self, city: &str) -> Option<CurrentWeather> {
        let now = self.clock.now();
        self.cache
            .lock()
            .get(city.trim())
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.weather.clone())
    }

    /// Cache-first read of current weather.
    ///
    /// A fresh entry is returned without touching the network. Otherwise a
    /// live fetch overwrites the entry; if that fetch fails, any entry for
    /// the city is served regardless of age, and the error only propagates
    /// when there is nothing cached at all.
    pub async fn weather_with_cache(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        let key = city.trim();

        if let Some(fresh) = self.cached_weather(key) {
            tracing::debug!(city = key, "weather cache hit");
            return Ok(fresh);
        }

        match self.provider.current_weather(key).await {
            Ok(weather) => {
                let entry = CacheEntry { weather: weather.clone(), stored_at: self.clock.now() };
                self.cache.lock().insert(key.to_string(), entry);
                Ok(weather)
            }
            Err(e) => {
                let stale = self.cache.lock().get(key).map(|entry| entry.weather.clone());
                match stale {
                    Some(weather) => {
                        tracing::info!(city = key, error = %e, "live fetch failed, serving stale weather");
                        Ok(weather)
                    }
                    None => Err(e),
                }
            }
        }
    }
}

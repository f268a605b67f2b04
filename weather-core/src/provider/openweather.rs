use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    config::Config,
    error::{DEFAULT_NETWORK_MESSAGE, DEFAULT_SEARCH_MESSAGE, WeatherError},
    model::{Coordinates, CurrentWeather, Forecast, LocationMatch, Units},
};

use super::WeatherProvider;

/// Hard cap the geocoding endpoint puts on `limit`.
pub const MAX_SEARCH_LIMIT: usize = 10;

/// Client for the OpenWeather current/forecast and direct geocoding APIs.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    units: Units,
    weather_base_url: String,
    geo_base_url: String,
    weather_http: Client,
    geo_http: Client,
}

enum Query<'a> {
    City(&'a str),
    Coordinates(Coordinates),
}

impl Query<'_> {
    fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Query::City(city) => req.query(&[("q", *city)]),
            Query::Coordinates(c) => req.query(&[("lat", c.latitude), ("lon", c.longitude)]),
        }
    }
}

/// Shape of the service's error bodies, e.g. `{"cod":"404","message":"city not found"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl OpenWeatherProvider {
    pub fn from_config(api_key: String, config: &Config) -> anyhow::Result<Self> {
        let weather_http = Client::builder().timeout(config.timeouts.weather()).build()?;
        let geo_http = Client::builder().timeout(config.timeouts.search()).build()?;

        Ok(Self {
            api_key,
            units: config.units,
            weather_base_url: trim_base(&config.endpoints.weather_base_url),
            geo_base_url: trim_base(&config.endpoints.geo_base_url),
            weather_http,
            geo_http,
        })
    }

    async fn fetch_weather<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.weather_base_url, path);
        tracing::debug!(%url, "requesting weather data");

        let req = self
            .weather_http
            .get(&url)
            .query(&[("appid", self.api_key.as_str()), ("units", self.units.as_str())]);

        send_json(query.apply(req), DEFAULT_NETWORK_MESSAGE).await
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn search_locations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationMatch>, WeatherError> {
        let url = format!("{}/direct", self.geo_base_url);
        let limit = limit.min(MAX_SEARCH_LIMIT).to_string();

        let req = self.geo_http.get(&url).query(&[
            ("q", query),
            ("limit", limit.as_str()),
            ("appid", self.api_key.as_str()),
        ]);

        send_json(req, DEFAULT_SEARCH_MESSAGE).await
    }

    async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        self.fetch_weather("weather", Query::City(city)).await
    }

    async fn current_weather_by_coordinates(
        &self,
        coords: Coordinates,
    ) -> Result<CurrentWeather, WeatherError> {
        self.fetch_weather("weather", Query::Coordinates(coords)).await
    }

    async fn forecast(&self, city: &str) -> Result<Forecast, WeatherError> {
        self.fetch_weather("forecast", Query::City(city)).await
    }

    async fn forecast_by_coordinates(&self, coords: Coordinates) -> Result<Forecast, WeatherError> {
        self.fetch_weather("forecast", Query::Coordinates(coords)).await
    }
}

async fn send_json<T: DeserializeOwned>(
    req: RequestBuilder,
    default_message: &str,
) -> Result<T, WeatherError> {
    let res = req.send().await.map_err(|e| {
        tracing::debug!(error = %e, "request failed before a response arrived");
        WeatherError::network(e.status().map(|s| s.as_u16()), None, default_message)
    })?;

    let status = res.status();
    let body = res.text().await.map_err(|e| {
        tracing::debug!(error = %e, "failed to read response body");
        WeatherError::network(Some(status.as_u16()), None, default_message)
    })?;

    if !status.is_success() {
        let upstream = serde_json::from_str::<ErrorBody>(&body).ok().and_then(|b| b.message);
        tracing::debug!(%status, body = %truncate_body(&body), "weather service returned an error");
        return Err(WeatherError::network(
            Some(status.as_u16()),
            upstream.as_deref(),
            default_message,
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(error = %e, body = %truncate_body(&body), "unexpected response shape");
        WeatherError::network(Some(500), Some("Invalid response from weather service"), default_message)
    })
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

use crate::{
    Config,
    error::WeatherError,
    model::{Coordinates, CurrentWeather, Forecast, LocationMatch},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Remote weather and geocoding service.
///
/// Every failure is returned already normalized into a
/// [`WeatherError::Network`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn search_locations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationMatch>, WeatherError>;

    async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError>;

    async fn current_weather_by_coordinates(
        &self,
        coords: Coordinates,
    ) -> Result<CurrentWeather, WeatherError>;

    async fn forecast(&self, city: &str) -> Result<Forecast, WeatherError>;

    async fn forecast_by_coordinates(&self, coords: Coordinates) -> Result<Forecast, WeatherError>;
}

/// Construct the provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.resolved_api_key()?;
    let provider = OpenWeatherProvider::from_config(api_key, config)?;
    Ok(Box::new(provider))
}

//! Weather session: the orchestrator behind every user action.
//!
//! A session owns the gateway, the history manager and a position source,
//! and keeps the transient [`SessionState`] the front end renders. Each
//! action runs `idle -> loading -> success | error`; entering `loading`
//! clears the previous error, and the outcome stays visible until the next
//! action starts. Every change is published on a `watch` channel.
//!
//! Actions take `&mut self`, so two actions on one session cannot overlap:
//! a later fetch always starts after the earlier one has landed.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    error::{GeolocationError, WeatherError},
    gateway::WeatherGateway,
    geolocation::{GeolocationOptions, Geolocator},
    history::HistoryManager,
    model::{Coordinates, CurrentWeather, Forecast, HistoryItem, LocationMatch},
};

/// Transient view state; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_weather: Option<CurrentWeather>,
    pub forecast: Option<Forecast>,
    pub is_loading: bool,
    pub error: Option<WeatherError>,
    pub selected_city: String,
    pub user_location: Option<Coordinates>,
}

#[derive(Debug)]
pub struct WeatherSession {
    gateway: WeatherGateway,
    history: HistoryManager,
    geolocator: Arc<dyn Geolocator>,
    geolocation: GeolocationOptions,
    state: SessionState,
    updates: watch::Sender<SessionState>,
}

impl WeatherSession {
    pub fn new(
        gateway: WeatherGateway,
        history: HistoryManager,
        geolocator: Arc<dyn Geolocator>,
    ) -> Self {
        let (updates, _) = watch::channel(SessionState::default());
        Self {
            gateway,
            history,
            geolocator,
            geolocation: GeolocationOptions::default(),
            state: SessionState::default(),
            updates,
        }
    }

    pub fn with_geolocation_options(mut self, options: GeolocationOptions) -> Self {
        self.geolocation = options;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Receiver that sees every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn gateway(&self) -> &WeatherGateway {
        &self.gateway
    }

    pub fn has_weather_data(&self) -> bool {
        self.state.current_weather.is_some()
    }

    pub fn has_forecast_data(&self) -> bool {
        self.state.forecast.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.state.error.is_some()
    }

    pub fn recent_searches(&self) -> Vec<HistoryItem> {
        self.history.recent_first()
    }

    pub async fn search_locations(&self, query: &str, limit: usize) -> Vec<LocationMatch> {
        self.gateway.search_locations(query, limit).await
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }

    fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
        if loading {
            self.state.error = None;
        }
        self.publish();
    }

    pub fn set_error(&mut self, error: Option<WeatherError>) {
        self.state.error = error;
        self.publish();
    }

    pub fn clear_error(&mut self) {
        self.set_error(None);
    }

    /// Picks up persisted history and exclusions.
    pub fn load_history(&mut self) {
        self.history.load();
    }

    /// Loads persisted history, then tries the device position. If that
    /// fails and there is history, the most recently used city is fetched
    /// instead.
    pub async fn initialize(&mut self) {
        self.load_history();

        if self.get_user_location().await {
            return;
        }

        if let Some(city) = self.history.most_recent().map(|item| item.city.clone()) {
            tracing::info!(%city, "no device position, falling back to last viewed city");
            self.fetch_weather_data(&city).await;
        }
    }

    /// Current weather (cache-aware) for `city`.
    pub async fn fetch_current_weather(&mut self, city: &str) {
        let city = city.trim();
        if city.is_empty() {
            self.set_error(Some(WeatherError::city_required()));
            return;
        }

        self.set_loading(true);

        match self.gateway.weather_with_cache(city).await {
            Ok(weather) => {
                self.state.current_weather = Some(weather.clone());
                self.state.selected_city = city.to_string();
                self.history.record(city, Some(weather));
                self.state.error = None;
            }
            Err(e) => {
                self.state.error = Some(e);
                self.state.current_weather = None;
            }
        }

        self.set_loading(false);
    }

    pub async fn fetch_current_weather_by_coordinates(&mut self, coords: Coordinates) {
        self.set_loading(true);

        match self.gateway.current_weather_by_coordinates(coords).await {
            Ok(weather) => {
                self.state.selected_city = weather.name.clone();
                self.state.user_location = Some(coords);
                self.history.record(&weather.name, Some(weather.clone()));
                self.state.current_weather = Some(weather);
                self.state.error = None;
            }
            Err(e) => {
                self.state.error = Some(e);
                self.state.current_weather = None;
            }
        }

        self.set_loading(false);
    }

    pub async fn fetch_forecast(&mut self, city: &str) {
        let city = city.trim();
        if city.is_empty() {
            self.set_error(Some(WeatherError::city_required()));
            return;
        }

        self.set_loading(true);

        match self.gateway.forecast(city).await {
            Ok(forecast) => {
                self.state.forecast = Some(forecast);
                self.state.error = None;
            }
            Err(e) => {
                self.state.error = Some(e);
                self.state.forecast = None;
            }
        }

        self.set_loading(false);
    }

    pub async fn fetch_forecast_by_coordinates(&mut self, coords: Coordinates) {
        self.set_loading(true);

        match self.gateway.forecast_by_coordinates(coords).await {
            Ok(forecast) => {
                self.state.forecast = Some(forecast);
                self.state.error = None;
            }
            Err(e) => {
                self.state.error = Some(e);
                self.state.forecast = None;
            }
        }

        self.set_loading(false);
    }

    /// Joint fetch of current weather and forecast for a searched city.
    ///
    /// Searching for a city explicitly lifts any earlier removal. On failure
    /// only the error and loading flag change; what was on screen stays.
    pub async fn fetch_weather_data(&mut self, city: &str) {
        let city = city.trim();
        if city.is_empty() {
            self.set_error(Some(WeatherError::city_required()));
            return;
        }

        if self.history.is_excluded(city) {
            self.history.allow_readdition(city);
        }

        self.set_loading(true);

        // Both halves run to completion so a successful read still lands
        // in the cache when the other one fails.
        let joint = tokio::join!(self.gateway.weather_with_cache(city), self.gateway.forecast(city));

        match joint {
            (Ok(weather), Ok(forecast)) => {
                tracing::info!(city, "weather data updated");
                self.state.current_weather = Some(weather.clone());
                self.state.forecast = Some(forecast);
                self.state.selected_city = city.to_string();
                self.history.record(city, Some(weather));
                self.state.error = None;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::info!(city, error = %e, "weather fetch failed");
                self.state.error = Some(e);
            }
        }

        self.set_loading(false);
    }

    /// Joint fetch keyed by device coordinates; the location name from the
    /// response becomes the history entry.
    pub async fn fetch_weather_data_by_coordinates(&mut self, coords: Coordinates) {
        self.set_loading(true);

        let joint = tokio::join!(
            self.gateway.current_weather_by_coordinates(coords),
            self.gateway.forecast_by_coordinates(coords)
        );

        match joint {
            (Ok(weather), Ok(forecast)) => {
                tracing::info!(city = %weather.name, %coords, "weather data updated");
                self.state.selected_city = weather.name.clone();
                self.state.user_location = Some(coords);
                self.state.forecast = Some(forecast);
                self.history.record(&weather.name, Some(weather.clone()));
                self.state.current_weather = Some(weather);
                self.state.error = None;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::info!(%coords, error = %e, "weather fetch failed");
                self.state.error = Some(e);
            }
        }

        self.set_loading(false);
    }

    /// Asks the position source for the device position and loads weather
    /// for it. Returns `false`, with the error set, when no position could
    /// be obtained in time.
    pub async fn get_user_location(&mut self) -> bool {
        self.set_loading(true);

        let lookup = self.geolocator.current_position(&self.geolocation);
        let position = match tokio::time::timeout(self.geolocation.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(GeolocationError::Timeout),
        };

        match position {
            Ok(coords) => {
                self.set_loading(false);
                self.fetch_weather_data_by_coordinates(coords).await;
                true
            }
            Err(e) => {
                tracing::info!(error = %e, "device position unavailable");
                self.state.error = Some(e.into());
                self.set_loading(false);
                false
            }
        }
    }

    /// Removes `city` from history and keeps it out until searched again.
    /// Returns `true` when the city was on screen and the view was cleared.
    pub fn remove_from_history(&mut self, city: &str) -> bool {
        let removed = self.history.remove(city);

        let on_screen = self
            .state
            .current_weather
            .as_ref()
            .is_some_and(|w| w.name.to_lowercase() == removed);

        if on_screen {
            self.state.current_weather = None;
            self.state.forecast = None;
            self.state.selected_city.clear();
            self.publish();
        }

        on_screen
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn allow_location_readdition(&mut self, city: &str) {
        self.history.allow_readdition(city);
    }

    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.publish();
    }
}

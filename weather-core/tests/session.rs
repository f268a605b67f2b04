//! Session orchestration against a mock weather service.

mod support;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use support::*;
use weather_core::{
    Clock, Coordinates, GeolocationError, GeolocationOptions, Geolocator, HistoryManager, ManualClock,
    MemoryStore, NoGeolocator, StaticGeolocator, WeatherError, WeatherGateway, WeatherSession,
    storage::{EXCLUSIONS_KEY, HISTORY_KEY},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZURICH: Coordinates = Coordinates { latitude: 47.37, longitude: 8.54 };

#[derive(Debug)]
struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::PermissionDenied)
    }
}

#[derive(Debug)]
struct HangingGeolocator;

#[async_trait]
impl Geolocator for HangingGeolocator {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ZURICH)
    }
}

fn session_with(
    server: &MockServer,
    store: &MemoryStore,
    clock: &Arc<ManualClock>,
    geolocator: Arc<dyn Geolocator>,
) -> WeatherSession {
    let gateway = WeatherGateway::new(provider_for(server), clock.clone());
    let history = HistoryManager::new(Arc::new(store.clone()), clock.clone());
    WeatherSession::new(gateway, history, geolocator)
}

fn session(server: &MockServer) -> (WeatherSession, MemoryStore, Arc<ManualClock>) {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::default());
    let session = session_with(server, &store, &clock, Arc::new(NoGeolocator));
    (session, store, clock)
}

async fn mount_zurich_by_coordinates(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("lat", "47.37"))
        .and(query_param("lon", "8.54"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(current_json("Zurich", 47.37, 8.54, 6.0)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .and(query_param("lat", "47.37"))
        .and(query_param("lon", "8.54"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json("Zurich")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_city_is_a_validation_error() {
    let server = MockServer::start().await;
    let (mut session, store, _) = session(&server);

    session.fetch_weather_data("   ").await;

    let err = session.state().error.clone().expect("error should be set");
    assert_eq!(err.code(), 400);
    assert_eq!(err.message(), "City name is required");
    assert!(!session.state().is_loading);
    assert!(session.history().is_empty());
    assert!(store.raw(HISTORY_KEY).is_none());
}

#[tokio::test]
async fn joint_fetch_replaces_state_and_records_history() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    let (mut session, _, _) = session(&server);

    session.fetch_weather_data(" Paris ").await;

    let state = session.state();
    assert_eq!(state.error, None);
    assert!(!state.is_loading);
    assert_eq!(state.selected_city, "Paris");
    assert_eq!(state.current_weather.as_ref().map(|w| w.main.temp), Some(18.0));
    assert_eq!(state.forecast.as_ref().map(|f| f.city.name.as_str()), Some("Paris"));
    assert!(session.has_weather_data() && session.has_forecast_data());

    let recent = session.recent_searches();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].city, "Paris");
    assert!(recent[0].weather.is_some());
}

#[tokio::test]
async fn failed_joint_fetch_keeps_previous_view() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    mount_unknown_city(&server, "Atlantis").await;
    let (mut session, _, _) = session(&server);

    session.fetch_weather_data("Paris").await;
    session.fetch_weather_data("Atlantis").await;

    let state = session.state();
    assert_eq!(
        state.error,
        Some(WeatherError::Network { code: 404, message: "City not found".into() })
    );
    assert!(!state.is_loading);
    assert_eq!(state.selected_city, "Paris");
    assert_eq!(state.current_weather.as_ref().map(|w| w.name.as_str()), Some("Paris"));
    assert!(state.forecast.is_some());
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn forecast_failure_still_caches_current_weather() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_json("Paris", 48.85, 2.35, 18.0))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (mut session, _, _) = session(&server);

    session.fetch_weather_data("Paris").await;

    assert_eq!(session.state().error.as_ref().map(|e| e.code()), Some(500));
    assert!(session.state().current_weather.is_none());
    assert!(session.history().is_empty());
    let cached = session.gateway().cached_weather("Paris").expect("weather should be cached");
    assert_eq!(cached.main.temp, 18.0);
}

#[tokio::test]
async fn single_fetch_failure_clears_only_its_own_half() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    mount_unknown_city(&server, "Atlantis").await;
    let (mut session, _, _) = session(&server);

    session.fetch_weather_data("Paris").await;
    session.fetch_current_weather("Atlantis").await;

    assert!(session.state().current_weather.is_none());
    assert!(session.state().forecast.is_some());
    assert_eq!(session.state().error.as_ref().map(WeatherError::code), Some(404));

    session.fetch_forecast("Paris").await;
    assert!(session.state().forecast.is_some());
    assert!(!session.is_error());
}

#[tokio::test]
async fn stale_weather_is_served_when_service_goes_down() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    let (mut session, _, clock) = session(&server);

    session.fetch_weather_data("Paris").await;

    server.reset().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json("Paris")))
        .mount(&server)
        .await;

    clock.advance(chrono::Duration::minutes(30));
    session.fetch_weather_data("Paris").await;

    assert_eq!(session.state().error, None);
    assert_eq!(session.state().current_weather.as_ref().map(|w| w.main.temp), Some(18.0));
}

#[tokio::test]
async fn removing_displayed_city_clears_the_view() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    mount_city(&server, "Rome", 21.0).await;
    let (mut session, store, _) = session(&server);

    session.fetch_weather_data("Rome").await;
    session.fetch_weather_data("Paris").await;

    assert!(!session.remove_from_history("Rome"), "Rome is not on screen");
    assert!(session.state().current_weather.is_some());

    assert!(session.remove_from_history("PARIS"));
    let state = session.state();
    assert!(state.current_weather.is_none());
    assert!(state.forecast.is_none());
    assert!(state.selected_city.is_empty());
    assert!(session.history().is_empty());

    let stored = store.raw(EXCLUSIONS_KEY).expect("exclusions persisted");
    assert!(stored.contains("paris") && stored.contains("rome"));
}

#[tokio::test]
async fn manual_search_readmits_a_removed_city() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    let (mut session, _, clock) = session(&server);

    session.fetch_weather_data("Paris").await;
    session.remove_from_history("Paris");
    assert!(session.history().is_excluded("paris"));

    clock.advance(chrono::Duration::minutes(1));
    session.fetch_weather_data("Paris").await;

    assert!(!session.history().is_excluded("Paris"));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().items()[0].timestamp, clock.now());
}

#[tokio::test]
async fn denied_geolocation_reports_and_returns_false() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::default());
    let mut session = session_with(&server, &store, &clock, Arc::new(DeniedGeolocator));

    assert!(!session.get_user_location().await);

    let err = session.state().error.clone().unwrap();
    assert_eq!(err.code(), 1);
    assert_eq!(err.message(), "Location access denied by user");
    assert!(!session.state().is_loading);
}

#[tokio::test]
async fn slow_geolocation_times_out() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::default());
    let mut session = session_with(&server, &store, &clock, Arc::new(HangingGeolocator))
        .with_geolocation_options(GeolocationOptions {
            timeout: Duration::from_millis(50),
            ..Default::default()
        });

    assert!(!session.get_user_location().await);
    assert_eq!(session.state().error, Some(WeatherError::from(GeolocationError::Timeout)));
}

#[tokio::test]
async fn initialize_uses_device_position_when_available() {
    let server = MockServer::start().await;
    mount_zurich_by_coordinates(&server).await;
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::default());
    let mut session =
        session_with(&server, &store, &clock, Arc::new(StaticGeolocator::new(ZURICH)));

    session.initialize().await;

    let state = session.state();
    assert_eq!(state.error, None);
    assert_eq!(state.selected_city, "Zurich");
    assert_eq!(state.user_location, Some(ZURICH));
    assert_eq!(session.history().items()[0].city, "Zurich");
}

#[tokio::test]
async fn position_fetch_does_not_readd_a_removed_location() {
    let server = MockServer::start().await;
    mount_zurich_by_coordinates(&server).await;
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::default());
    let mut session =
        session_with(&server, &store, &clock, Arc::new(StaticGeolocator::new(ZURICH)));

    session.remove_from_history("zurich");
    session.fetch_weather_data_by_coordinates(ZURICH).await;

    assert_eq!(session.state().selected_city, "Zurich");
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn initialize_falls_back_to_most_recent_city() {
    let server = MockServer::start().await;
    mount_city(&server, "Rome", 21.0).await;
    let store = MemoryStore::new();
    store.insert_raw(
        HISTORY_KEY,
        r#"[{"city":"Berlin","timestamp":1700000000000},{"city":"Rome","timestamp":1700000900000}]"#,
    );
    let clock = Arc::new(ManualClock::default());
    let mut session = session_with(&server, &store, &clock, Arc::new(NoGeolocator));

    session.initialize().await;

    let state = session.state();
    assert_eq!(state.error, None);
    assert_eq!(state.selected_city, "Rome");
    assert_eq!(state.current_weather.as_ref().map(|w| w.main.temp), Some(21.0));
}

#[tokio::test]
async fn initialize_with_corrupt_history_starts_empty() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    store.insert_raw(HISTORY_KEY, "[{\"city\": \"Par");
    let clock = Arc::new(ManualClock::default());
    let mut session = session_with(&server, &store, &clock, Arc::new(NoGeolocator));

    session.initialize().await;

    assert!(session.history().is_empty());
    assert!(session.state().current_weather.is_none());
    assert_eq!(session.state().error, Some(WeatherError::from(GeolocationError::Unsupported)));
}

#[tokio::test]
async fn subscribers_observe_state_changes() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    let (mut session, _, _) = session(&server);
    let mut updates = session.subscribe();

    session.fetch_weather_data("Paris").await;

    assert!(updates.has_changed().unwrap());
    let seen = updates.borrow_and_update().clone();
    assert_eq!(&seen, session.state());

    session.reset();
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().selected_city, "");
    assert!(!session.history().is_empty(), "reset leaves history alone");
}

#[tokio::test]
async fn clearing_history_keeps_current_view() {
    let server = MockServer::start().await;
    mount_city(&server, "Paris", 18.0).await;
    let (mut session, _, _) = session(&server);

    session.fetch_weather_data("Paris").await;
    session.clear_history();

    assert!(session.history().is_empty());
    assert!(session.has_weather_data());

    session.set_error(Some(WeatherError::city_required()));
    assert!(session.is_error());
    session.clear_error();
    assert!(!session.is_error());
}

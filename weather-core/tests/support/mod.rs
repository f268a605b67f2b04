//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use weather_core::{Config, OpenWeatherProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const WEATHER_PATH: &str = "/data/2.5/weather";
pub const FORECAST_PATH: &str = "/data/2.5/forecast";
pub const GEO_PATH: &str = "/geo/1.0/direct";

pub fn config_for(server: &MockServer) -> Config {
    let mut cfg = Config::default();
    cfg.set_api_key(API_KEY.to_string());
    cfg.endpoints.weather_base_url = format!("{}/data/2.5", server.uri());
    cfg.endpoints.geo_base_url = format!("{}/geo/1.0", server.uri());
    cfg
}

pub fn provider_for(server: &MockServer) -> Arc<OpenWeatherProvider> {
    let cfg = config_for(server);
    Arc::new(OpenWeatherProvider::from_config(API_KEY.to_string(), &cfg).expect("client builds"))
}

pub fn current_json(name: &str, lat: f64, lon: f64, temp: f64) -> Value {
    json!({
        "coord": { "lon": lon, "lat": lat },
        "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
        "base": "stations",
        "main": {
            "temp": temp, "feels_like": temp - 0.5, "temp_min": temp - 2.0, "temp_max": temp + 2.0,
            "pressure": 1013, "humidity": 55
        },
        "visibility": 10000,
        "wind": { "speed": 4.1, "deg": 250 },
        "clouds": { "all": 0 },
        "dt": 1_700_000_000,
        "sys": { "country": "XX", "sunrise": 1_699_950_000, "sunset": 1_699_985_000 },
        "timezone": 3600,
        "id": 1,
        "name": name,
        "cod": 200
    })
}

pub fn forecast_json(name: &str) -> Value {
    json!({
        "cod": "200",
        "message": 0,
        "cnt": 2,
        "list": [
            {
                "dt": 1_700_010_000,
                "main": { "temp": 12.0, "temp_min": 11.0, "temp_max": 13.0, "humidity": 70 },
                "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }],
                "pop": 0.4,
                "dt_txt": "2023-11-15 01:00:00"
            },
            {
                "dt": 1_700_096_400,
                "main": { "temp": 9.0, "temp_min": 8.0, "temp_max": 10.0, "humidity": 65 },
                "weather": [{ "id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d" }],
                "pop": 0.0,
                "dt_txt": "2023-11-16 01:00:00"
            }
        ],
        "city": { "id": 1, "name": name, "coord": { "lat": 0.0, "lon": 0.0 }, "country": "XX", "timezone": 3600 }
    })
}

pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({ "cod": "404", "message": "city not found" }))
}

/// Mounts current weather and forecast responses for `city`.
pub async fn mount_city(server: &MockServer, city: &str, temp: f64) {
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json(city, 0.0, 0.0, temp)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json(city)))
        .mount(server)
        .await;
}

/// Mounts 404 responses for both halves of a joint fetch of `city`.
pub async fn mount_unknown_city(server: &MockServer, city: &str) {
    for p in [WEATHER_PATH, FORECAST_PATH] {
        Mock::given(method("GET"))
            .and(path(p))
            .and(query_param("q", city))
            .respond_with(not_found())
            .mount(server)
            .await;
    }
}

//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - The remote weather service client and the cache-aware gateway over it
//! - Search history with removal tombstones, and the user profile, both
//!   persisted through a small key-value store
//! - The session orchestrator that ties fetches, history and device position
//!   together
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod geolocation;
pub mod history;
pub mod model;
pub mod profile;
pub mod provider;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{GeolocationError, StorageError, WeatherError};
pub use gateway::WeatherGateway;
pub use geolocation::{GeolocationOptions, Geolocator, IpGeolocator, NoGeolocator, StaticGeolocator};
pub use history::HistoryManager;
pub use model::{
    Coordinates, CurrentWeather, DailySummary, Forecast, HistoryItem, LocationMatch, UserProfile,
    Units,
};
pub use profile::{ProfileStore, ProfileUpdate};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use session::{SessionState, WeatherSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use weather_core::{
    Config, FileStore, Geolocator, HistoryManager, IpGeolocator, KeyValueStore, NoGeolocator,
    ProfileStore, ProfileUpdate, StaticGeolocator, SystemClock, Units, WeatherGateway,
    WeatherSession,
    gateway::DEFAULT_SEARCH_LIMIT,
    geolocation::GeolocationOptions,
    provider::provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and unit system.
    Configure,

    /// Search for locations by name.
    Search {
        query: String,

        /// Maximum number of matches (at most 10).
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// Show current weather and forecast.
    ///
    /// Without arguments the device position is tried first, then the most
    /// recently viewed city.
    Show {
        /// City name to look up.
        city: Option<String>,

        /// Use the device position.
        #[arg(long, conflicts_with = "city")]
        here: bool,
    },

    /// Inspect or edit the search history.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Inspect or edit the user profile.
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List the most recent searches.
    List,
    /// Remove a city and keep it out of the history until searched again.
    Remove { city: String },
    /// Let a removed city be recorded again.
    Allow { city: String },
    /// Forget all searches.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    Show,
    /// Update profile fields; omitted fields are kept.
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Add a favorite location.
    Favorite { location: String },
    /// Remove a favorite location.
    Unfavorite { location: String },
    /// Set the home location.
    Home { location: String },
    /// Reset the profile to its defaults.
    Reset,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Search { query, limit } => {
                let session = build_session(&config)?;
                let matches = session.search_locations(&query, limit).await;
                render::matches(&query, &matches);
                Ok(())
            }
            Command::Show { city, here } => {
                let mut session = build_session(&config)?;
                match (city, here) {
                    (Some(city), _) => {
                        session.load_history();
                        session.fetch_weather_data(&city).await;
                    }
                    (None, true) => {
                        session.load_history();
                        session.get_user_location().await;
                    }
                    (None, false) => session.initialize().await,
                }
                render::session(session.state(), config.units);
                Ok(())
            }
            Command::History { action } => {
                let mut history = HistoryManager::new(open_store()?, Arc::new(SystemClock));
                history.load();
                match action.unwrap_or(HistoryAction::List) {
                    HistoryAction::List => render::history(&history),
                    HistoryAction::Remove { city } => {
                        history.remove(&city);
                        println!("Removed {city} from history.");
                    }
                    HistoryAction::Allow { city } => {
                        history.allow_readdition(&city);
                        println!("{city} can be added to history again.");
                    }
                    HistoryAction::Clear => {
                        history.clear();
                        println!("History cleared.");
                    }
                }
                Ok(())
            }
            Command::Profile { action } => {
                let mut profiles = ProfileStore::new(open_store()?);
                profiles.load();
                match action.unwrap_or(ProfileAction::Show) {
                    ProfileAction::Show => {}
                    ProfileAction::Set { name, email, phone } => {
                        profiles.update_profile(ProfileUpdate {
                            full_name: name,
                            email,
                            phone_number: phone,
                            locations: None,
                        });
                    }
                    ProfileAction::Favorite { location } => profiles.add_favorite_location(&location),
                    ProfileAction::Unfavorite { location } => {
                        profiles.remove_favorite_location(&location)
                    }
                    ProfileAction::Home { location } => profiles.set_home_location(&location),
                    ProfileAction::Reset => profiles.reset_profile(),
                }
                render::profile(&profiles);
                Ok(())
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("API key prompt aborted")?;

    let units = Select::new("Units:", vec![Units::Metric, Units::Imperial, Units::Standard])
        .prompt()
        .context("Units prompt aborted")?;

    config.set_api_key(api_key.trim().to_string());
    config.units = units;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_store() -> anyhow::Result<Arc<dyn KeyValueStore>> {
    Ok(Arc::new(FileStore::new(Config::data_dir()?)))
}

fn geolocator_from_config(config: &Config) -> Arc<dyn Geolocator> {
    match (config.location.coordinates, config.location.ip_lookup) {
        (Some(coords), _) => Arc::new(StaticGeolocator::new(coords)),
        (None, true) => {
            Arc::new(IpGeolocator::new(&config.endpoints.ip_location_url, Arc::new(SystemClock)))
        }
        (None, false) => Arc::new(NoGeolocator),
    }
}

fn build_session(config: &Config) -> anyhow::Result<WeatherSession> {
    let clock = Arc::new(SystemClock);
    let provider = Arc::from(provider_from_config(config)?);
    let gateway = WeatherGateway::with_ttl(provider, clock.clone(), config.cache_ttl());
    let history = HistoryManager::new(open_store()?, clock);

    let options = GeolocationOptions { timeout: config.timeouts.geolocation(), ..Default::default() };
    tracing::debug!(units = %config.units, ttl_secs = config.cache_ttl_secs, "session configured");

    Ok(WeatherSession::new(gateway, history, geolocator_from_config(config))
        .with_geolocation_options(options))
}

//! Terminal output.

use chrono::{DateTime, FixedOffset, Local, Utc};
use weather_core::{
    HistoryManager, LocationMatch, ProfileStore, SessionState, Units,
    model::{CurrentWeather, Forecast},
};

pub fn matches(query: &str, matches: &[LocationMatch]) {
    if matches.is_empty() {
        println!("No locations found for \"{}\".", query.trim());
        return;
    }

    for (i, m) in matches.iter().enumerate() {
        println!("{:>2}. {:<40} ({:.4}, {:.4})", i + 1, m.label(), m.lat, m.lon);
    }
}

pub fn session(state: &SessionState, units: Units) {
    if let Some(err) = &state.error {
        eprintln!("Error {}: {}", err.code(), err.message());
    }

    if let Some(weather) = &state.current_weather {
        current(weather, units);
    }

    if let Some(forecast) = &state.forecast {
        println!();
        daily(forecast, units);
    }

    if state.current_weather.is_none() && state.error.is_none() {
        println!("Nothing to show yet. Try `weather show <city>`.");
    }
}

fn local_time(ts: i64, offset_secs: i32) -> String {
    let offset = FixedOffset::east_opt(offset_secs);
    match (DateTime::<Utc>::from_timestamp(ts, 0), offset) {
        (Some(utc), Some(offset)) => utc.with_timezone(&offset).format("%H:%M").to_string(),
        _ => "--:--".to_string(),
    }
}

fn current(weather: &CurrentWeather, units: Units) {
    let t = units.temperature_suffix();

    println!("{}, {}", weather.name, weather.sys.country);
    println!(
        "  {:.1}{t} (feels like {:.1}{t}), {}",
        weather.main.temp,
        weather.main.feels_like,
        weather.condition()
    );
    println!("  Low/High:  {:.1}{t} / {:.1}{t}", weather.main.temp_min, weather.main.temp_max);
    println!("  Humidity:  {}%", weather.main.humidity);
    println!("  Pressure:  {} hPa", weather.main.pressure);
    println!("  Wind:      {:.1} {} ({:.0}°)", weather.wind.speed, units.speed_suffix(), weather.wind.deg);
    println!("  Clouds:    {}%", weather.clouds.all);
    println!(
        "  Sunrise:   {}  Sunset: {}",
        local_time(weather.sys.sunrise, weather.timezone),
        local_time(weather.sys.sunset, weather.timezone)
    );
    println!(
        "  Observed:  {}",
        weather.observed_at().with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
}

fn daily(forecast: &Forecast, units: Units) {
    let t = units.temperature_suffix();

    println!("Forecast for {}:", forecast.city.name);
    for day in forecast.daily() {
        println!(
            "  {}  {:>6.1}{t} / {:>6.1}{t}  {:>3.0}% rain  {}",
            day.date.format("%a %d %b"),
            day.temp_min,
            day.temp_max,
            day.max_pop * 100.0,
            day.condition
        );
    }
}

pub fn history(history: &HistoryManager) {
    let recent = history.recent_first();
    if recent.is_empty() {
        println!("No recent searches.");
    }

    for item in recent {
        let when = item.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        match &item.weather {
            Some(w) => println!("  {:<24} {when}  last seen {:.1}, {}", item.city, w.main.temp, w.condition()),
            None => println!("  {:<24} {when}", item.city),
        }
    }

    let excluded: Vec<&str> = history.excluded().collect();
    if !excluded.is_empty() {
        println!("Hidden: {}", excluded.join(", "));
    }
}

pub fn profile(profiles: &ProfileStore) {
    let p = profiles.profile();
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    println!("Name:      {}", or_dash(&p.full_name));
    println!("Email:     {}", or_dash(&p.email));
    println!("Phone:     {}", or_dash(&p.phone_number));
    println!("Home:      {}", p.locations.home_location.as_deref().unwrap_or("-"));
    println!(
        "Favorites: {}",
        if p.locations.favorite_locations.is_empty() {
            "-".to_string()
        } else {
            p.locations.favorite_locations.join(", ")
        }
    );

    if !profiles.has_profile() {
        println!("\nProfile incomplete: set a name and email with `weather profile set`.");
    }
}

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Unit system sent to the weather service as the `units` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Condition {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MainBlock {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sea_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Clouds {
    #[serde(default)]
    pub all: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Sys {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// Current conditions for one location at one point in time.
///
/// Mirrors the service's current-weather payload so a snapshot stored in
/// history can be written back out unchanged. Never mutated after a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub base: String,
    pub main: MainBlock,
    #[serde(default)]
    pub visibility: u32,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    pub dt: i64,
    #[serde(default)]
    pub sys: Sys,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cod: i64,
}

impl CurrentWeather {
    /// Description of the primary condition, e.g. "light rain".
    pub fn condition(&self) -> &str {
        self.weather
            .first()
            .map(|w| w.description.as_str())
            .unwrap_or("unknown")
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.dt, 0).unwrap_or_default()
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates { latitude: self.coord.lat, longitude: self.coord.lon }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ForecastSys {
    #[serde(default)]
    pub pod: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub clouds: Clouds,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub visibility: u32,
    /// Probability of precipitation, 0.0..=1.0.
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub sys: ForecastSys,
    #[serde(default)]
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// Multi-entry (3-hourly) forecast time series for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub cod: String,
    #[serde(default)]
    pub message: f64,
    #[serde(default)]
    pub cnt: u32,
    pub list: Vec<ForecastItem>,
    pub city: City,
}

/// One calendar day of a [`Forecast`], in the city's local time.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    pub condition: String,
    pub max_pop: f64,
}

impl Forecast {
    /// Groups the series by local calendar day, in date order.
    ///
    /// The condition of a day is taken from the entry closest to local noon.
    pub fn daily(&self) -> Vec<DailySummary> {
        let offset = FixedOffset::east_opt(self.city.timezone).unwrap_or_else(|| Utc.fix());
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();

        let mut days: Vec<(DailySummary, i64)> = Vec::new();

        for item in &self.list {
            let Some(utc) = DateTime::from_timestamp(item.dt, 0) else {
                continue;
            };
            let local = utc.with_timezone(&offset);
            let date = local.date_naive();
            let noon_distance = local.time().signed_duration_since(noon).num_minutes().abs();
            let condition = item
                .weather
                .first()
                .map(|w| w.description.clone())
                .unwrap_or_else(|| "unknown".to_string());

            match days.iter_mut().find(|(d, _)| d.date == date) {
                Some((day, best)) => {
                    day.temp_min = day.temp_min.min(item.main.temp_min.min(item.main.temp));
                    day.temp_max = day.temp_max.max(item.main.temp_max.max(item.main.temp));
                    day.max_pop = day.max_pop.max(item.pop);
                    if noon_distance < *best {
                        *best = noon_distance;
                        day.condition = condition;
                    }
                }
                None => days.push((
                    DailySummary {
                        date,
                        temp_min: item.main.temp_min.min(item.main.temp),
                        temp_max: item.main.temp_max.max(item.main.temp),
                        condition,
                        max_pop: item.pop,
                    },
                    noon_distance,
                )),
            }
        }

        let mut out: Vec<DailySummary> = days.into_iter().map(|(d, _)| d).collect();
        out.sort_by_key(|d| d.date);
        out
    }
}

/// A single hit from direct geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMatch {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl LocationMatch {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates { latitude: self.lat, longitude: self.lon }
    }

    /// "Name, State, CC" with the optional region omitted when absent.
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ => format!("{}, {}", self.name, self.country),
        }
    }
}

/// A previously viewed city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub city: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<CurrentWeather>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileLocations {
    pub favorite_locations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub locations: ProfileLocations,
}

impl UserProfile {
    /// A profile is complete once both name and email are filled in.
    pub fn is_complete(&self) -> bool {
        !self.full_name.is_empty() && !self.email.is_empty()
    }
}

use thiserror::Error;

pub const DEFAULT_NETWORK_MESSAGE: &str = "Network error occurred";
pub const DEFAULT_SEARCH_MESSAGE: &str = "Location search failed";
pub const CITY_REQUIRED_MESSAGE: &str = "City name is required";

/// Errors surfaced to the user as a numeric code plus a display message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// Upstream transport or HTTP failure, already normalized.
    #[error("{message}")]
    Network { code: u16, message: String },

    /// Bad input on an explicit request; always reported as code 400.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
}

impl WeatherError {
    /// Builds a network error the way the gateway presents them: the status
    /// defaults to 500 and the upstream message is capitalized, falling back
    /// to `default_message` when the upstream gave none.
    pub fn network(code: Option<u16>, message: Option<&str>, default_message: &str) -> Self {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(default_message);

        WeatherError::Network { code: code.unwrap_or(500), message: capitalize(message) }
    }

    pub fn city_required() -> Self {
        WeatherError::Validation(CITY_REQUIRED_MESSAGE.to_string())
    }

    pub fn code(&self) -> u16 {
        match self {
            WeatherError::Network { code, .. } => *code,
            WeatherError::Validation(_) => 400,
            WeatherError::Geolocation(e) => e.code(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Failure reported by a device geolocation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location access denied by user")]
    PermissionDenied,
    #[error("Location information unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported on this device")]
    Unsupported,
}

impl GeolocationError {
    /// Platform error codes; `Unsupported` is reported like a bad request.
    pub fn code(&self) -> u16 {
        match self {
            GeolocationError::PermissionDenied => 1,
            GeolocationError::PositionUnavailable => 2,
            GeolocationError::Timeout => 3,
            GeolocationError::Unsupported => 400,
        }
    }
}

/// Persistent key-value storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

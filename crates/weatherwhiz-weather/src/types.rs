use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use weatherwhiz_core::NetworkError;

/// Variables requested from the forecast API for every lookup.
pub const CURRENT_VARIABLES: &str =
    "temperature_2m,weather_code,wind_speed_10m,relative_humidity_2m";

const OBSERVATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Coarse sky condition derived from a WMO weather interpretation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Codes outside the WMO table fall back to `Clear`.
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            1 | 2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51..=55 => Self::Drizzle,
            // freezing drizzle and freezing rain
            56 | 57 | 66 | 67 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71..=77 | 85 | 86 => Self::Snow,
            95..=99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "clear sky",
            Self::PartlyCloudy => "partly cloudy",
            Self::Cloudy => "overcast",
            Self::Fog => "fog",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::HeavyRain => "heavy rain",
            Self::Snow => "snow",
            Self::Sleet => "sleet",
            Self::Thunderstorm => "thunderstorm",
        }
    }

    /// Single glyph shown on a weather card.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "☀",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁",
            Self::Fog => "🌫",
            Self::Drizzle | Self::Rain => "🌦",
            Self::HeavyRain => "🌧",
            Self::Snow => "❄",
            Self::Sleet => "🌨",
            Self::Thunderstorm => "⛈",
        }
    }
}

/// Units reported alongside the current readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUnits {
    #[serde(rename = "temperature_2m")]
    pub temperature: String,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: String,
    #[serde(rename = "relative_humidity_2m")]
    pub humidity: String,
}

/// The `current` block of a forecast response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReadings {
    /// Local observation time, e.g. `2024-06-01T12:00`
    pub time: String,
    /// Length of the averaging window in seconds
    pub interval: u32,
    #[serde(rename = "temperature_2m")]
    pub temperature: f64,
    #[serde(rename = "relative_humidity_2m")]
    pub humidity: u8,
    pub weather_code: i32,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: f64,
}

impl CurrentReadings {
    /// Parsed observation time, if the source used the usual ISO-8601 minute format.
    pub fn observed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, OBSERVATION_TIME_FORMAT).ok()
    }

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.weather_code)
    }
}

/// Current conditions for one coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub current_units: CurrentUnits,
    pub current: CurrentReadings,
}

/// Why a single lookup failed. Every variant costs the location its place
/// in the round and nothing more.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("forecast body did not match the expected shape: {0}")]
    Parse(String),
    #[error("cannot build forecast request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        use weatherwhiz_core::ReqwestErrorExt;
        WeatherError::Network(err.into_network_error())
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use weatherwhiz_catalog::{Location, LocationId};
use weatherwhiz_weather::{CurrentConditions, WeatherCondition};

/// Monotonic identity of a fetch round; results tagged with an older round are discarded.
pub type RoundId = u64;

/// One location paired with the weather observed there: a single answer-key entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub location_id: LocationId,
    pub location_name: String,
    pub temperature: f64,
    pub temperature_unit: String,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_speed_unit: String,
    pub weather_code: i32,
    pub observed_at: Option<NaiveDateTime>,
}

impl QuizItem {
    pub fn from_conditions(location: &Location, conditions: CurrentConditions) -> Self {
        let observed_at = conditions.current.observed_at();
        let CurrentConditions {
            current_units: units,
            current: readings,
        } = conditions;

        Self {
            location_id: location.id,
            location_name: location.name.clone(),
            temperature: readings.temperature,
            temperature_unit: units.temperature,
            humidity: readings.humidity,
            wind_speed: readings.wind_speed,
            wind_speed_unit: units.wind_speed,
            weather_code: readings.weather_code,
            observed_at,
        }
    }

    pub fn card(&self) -> WeatherCard {
        WeatherCard {
            location_id: self.location_id,
            temperature: self.temperature,
            weather_code: self.weather_code,
        }
    }
}

/// Weather summary shown in the card pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherCard {
    pub location_id: LocationId,
    pub temperature: f64,
    pub weather_code: i32,
}

impl WeatherCard {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.weather_code)
    }
}

/// The two independently shuffled presentation sequences of a round.
///
/// Positions carry no pairing between the pools; a name belongs to a card
/// only when both resolve to the same location id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizPools {
    pub names: Vec<String>,
    pub cards: Vec<WeatherCard>,
}

impl QuizPools {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Quiz lifecycle as observed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum QuizState {
    #[default]
    Idle,
    Loading,
    Error(String),
    Success(QuizPools),
    GameOver {
        final_wrong_guesses: u32,
        total_locations: usize,
    },
}

impl QuizState {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            QuizState::Idle => "idle",
            QuizState::Loading => "loading",
            QuizState::Error(_) => "error",
            QuizState::Success(_) => "success",
            QuizState::GameOver { .. } => "game_over",
        }
    }
}

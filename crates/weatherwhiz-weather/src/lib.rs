//! Weather lookups for WeatherWhiz
//!
//! Fetches current conditions for a coordinate pair from the Open-Meteo
//! forecast API and maps WMO weather codes to display conditions.

pub mod provider;
pub mod types;

pub use provider::{WeatherLookup, WeatherProvider};
pub use types::*;

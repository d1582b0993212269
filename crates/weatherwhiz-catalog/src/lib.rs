//! Location catalog for WeatherWhiz.
//!
//! Stores the quiz's candidate locations in SQLite, seeds the built-in city
//! list on first use, and publishes the ordered listing to subscribers.

pub mod location;
pub mod store;

pub use location::{Location, LocationId};
pub use store::{CatalogError, LocationStore};

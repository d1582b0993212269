use serde::{Deserialize, Serialize};

/// Identity of a catalog location (SQLite rowid).
pub type LocationId = i64;

/// A named geographic point that can take part in a quiz round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Built-in locations come from the bundled seed list and cannot be deleted.
    #[serde(default)]
    pub is_user_added: bool,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
            is_user_added: false,
        }
    }

    pub fn user_added(mut self) -> Self {
        self.is_user_added = true;
        self
    }

    /// True when both coordinates fall inside their geographic ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

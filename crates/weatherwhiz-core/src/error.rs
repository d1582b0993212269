//! Error taxonomy shared by the WeatherWhiz crates.
//!
//! `Display` carries the detail that goes to the log; `user_message()` is the
//! only text a player ever sees.

use thiserror::Error;

/// Startup and front-end failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("weather service: {0}")]
    Weather(#[from] NetworkError),

    #[error("location catalog: {0}")]
    Catalog(#[from] DatabaseError),

    #[error("settings: {0}")]
    Settings(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Weather(e) => e.user_message(),
            AppError::Catalog(e) => e.user_message(),
            AppError::Settings(e) => e.user_message(),
            AppError::Other(_) => "Something went wrong. Please try again.",
        }
    }
}

/// Failures talking to the weather service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not reach host: {0}")]
    Unreachable(String),

    #[error("no answer before the timeout")]
    TimedOut,

    #[error("HTTP {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("undecodable body: {0}")]
    Malformed(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Unreachable(_) => "The weather service is unreachable. Are you online?",
            NetworkError::TimedOut => "The weather service is slow to answer. Try again.",
            NetworkError::Status { code, .. } if *code >= 500 => {
                "The weather service is having trouble. Try again later."
            }
            NetworkError::Status { .. } => "The weather service refused the request.",
            NetworkError::Malformed(_) => "The weather service sent data WeatherWhiz can't read.",
        }
    }
}

/// Failures of the SQLite location catalog.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot open catalog: {0}")]
    Open(String),

    #[error("catalog query failed: {0}")]
    Query(String),

    #[error("catalog file is corrupt: {0}")]
    Corrupt(String),

    #[error("bundled city list is unreadable: {0}")]
    Seed(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::Open(_) => "The location catalog could not be opened.",
            DatabaseError::Query(_) => "Updating the location catalog failed.",
            DatabaseError::Corrupt(_) => {
                "The location catalog is damaged. Delete locations.db to start over."
            }
            DatabaseError::Seed(_) => "The built-in cities could not be loaded.",
        }
    }
}

/// Problems with the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Some settings in config.toml are out of range.",
            ConfigError::Malformed(_) => "config.toml is not valid TOML.",
        }
    }
}

/// Classify a `reqwest` failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        let detail = self.to_string();
        match self.status() {
            _ if self.is_timeout() => NetworkError::TimedOut,
            _ if self.is_decode() => NetworkError::Malformed(detail),
            Some(status) if !self.is_connect() => NetworkError::Status {
                code: status.as_u16(),
                detail,
            },
            _ => NetworkError::Unreachable(detail),
        }
    }
}

/// Classify a `rusqlite` failure.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        use rusqlite::ErrorCode;

        let code = self.sqlite_error_code();
        let detail = self.to_string();
        match code {
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
                DatabaseError::Corrupt(detail)
            }
            Some(ErrorCode::CannotOpen | ErrorCode::PermissionDenied) => DatabaseError::Open(detail),
            _ => DatabaseError::Query(detail),
        }
    }
}

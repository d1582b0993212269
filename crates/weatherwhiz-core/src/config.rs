use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

const APP_DIR_NAME: &str = "weatherwhiz";
const CONFIG_FILE_NAME: &str = "config.toml";

const LONG_TIMEOUT_SECS: u64 = 120;
const LARGE_LOOKUP_CAP: usize = 256;

/// One problem found in the settings, keyed by its dotted TOML path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: &'static str,
    pub problem: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.key, self.problem)
    }
}

/// Outcome of [`Config::validate`]. Errors block startup; warnings are logged.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn reject(&mut self, key: &'static str, problem: impl Into<String>) {
        self.errors.push(ConfigIssue {
            key,
            problem: problem.into(),
        });
    }

    fn caution(&mut self, key: &'static str, problem: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            key,
            problem: problem.into(),
        });
    }

    /// All errors on one line, for logs and `ConfigError::Invalid`.
    pub fn summary(&self) -> String {
        let issues: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        issues.join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml and, by default, the catalog database
    pub config_dir: PathBuf,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub quiz: QuizConfig,
}

/// Unit requested from the weather service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Let the weather service pick its default unit.
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Value for the Open-Meteo `temperature_unit` query parameter, if any.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            TemperatureUnit::Auto => None,
            TemperatureUnit::Celsius => Some("celsius"),
            TemperatureUnit::Fahrenheit => Some("fahrenheit"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of an Open-Meteo compatible forecast API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Upper bound on simultaneous lookups in one round (unbounded when absent)
    #[serde(default)]
    pub max_concurrent_lookups: Option<usize>,
}

fn default_api_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature_unit: TemperatureUnit::default(),
            max_concurrent_lookups: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite file name, relative to the config directory unless absolute
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Load the bundled city list into an empty catalog
    #[serde(default = "default_seed_builtin")]
    pub seed_builtin: bool,
}

fn default_database_file() -> String {
    "locations.db".to_string()
}

fn default_seed_builtin() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            seed_builtin: default_seed_builtin(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Fixed seed for pool shuffling; a fresh OS seed is used when absent
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

/// `<platform config dir>/weatherwhiz`, if the platform has one.
fn app_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: app_dir().unwrap_or_else(|| PathBuf::from(APP_DIR_NAME)),
            weather: WeatherConfig::default(),
            catalog: CatalogConfig::default(),
            quiz: QuizConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the platform config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`. A missing file is created with defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings at {}, writing defaults", path.display());
                let config = Self::default();
                config.save_to(path)?;
                return Ok(config);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        toml::from_str(&contents)
            .map_err(|e| ConfigError::Malformed(e.to_string()))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// [`Config::load`] followed by [`Config::validate`].
    ///
    /// Warnings are logged and returned; any error aborts with
    /// `ConfigError::Invalid`.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let report = config.validate();

        for issue in &report.warnings {
            tracing::warn!("Questionable setting: {}", issue);
        }
        if !report.is_valid() {
            return Err(ConfigError::Invalid(report.summary()).into());
        }

        Ok((config, report))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut report = ValidationResult::default();
        let weather = &self.weather;

        check_base_url(&weather.api_base_url, &mut report);

        match weather.request_timeout_secs {
            0 => report.reject("weather.request_timeout_secs", "must be at least 1"),
            secs if secs > LONG_TIMEOUT_SECS => report.caution(
                "weather.request_timeout_secs",
                format!("{secs}s is longer than a round should wait"),
            ),
            _ => {}
        }

        match weather.max_concurrent_lookups {
            Some(0) => report.reject(
                "weather.max_concurrent_lookups",
                "must be at least 1; remove the key for no limit",
            ),
            Some(cap) if cap > LARGE_LOOKUP_CAP => report.caution(
                "weather.max_concurrent_lookups",
                format!("{cap} parallel requests may be throttled by the service"),
            ),
            _ => {}
        }

        if self.catalog.database_file.trim().is_empty() {
            report.reject("catalog.database_file", "must name a file");
        }

        report
    }

    /// Catalog database location; relative names resolve against `config_dir`.
    pub fn database_path(&self) -> PathBuf {
        let file = Path::new(&self.catalog.database_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.config_dir.join(file)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn config_path() -> Result<PathBuf> {
        app_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .context("This platform has no config directory")
    }
}

fn check_base_url(raw: &str, report: &mut ValidationResult) {
    const KEY: &str = "weather.api_base_url";

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => return report.reject(KEY, format!("not a URL: {e}")),
    };
    if !matches!(url.scheme(), "http" | "https") {
        report.reject(KEY, format!("scheme must be http or https, not {}", url.scheme()));
    }
    if !url.has_host() {
        report.reject(KEY, "has no host");
    }
}

//! Open-Meteo "current conditions" client.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;
use weatherwhiz_core::{TemperatureUnit, WeatherConfig};

use crate::types::{CurrentConditions, WeatherError, CURRENT_VARIABLES};

const FORECAST_PATH: &str = "v1/forecast";

/// A request/response lookup of current conditions keyed by coordinates.
///
/// Every failure mode (transport, status, decoding) is reported as a
/// `WeatherError`; callers decide whether a failure is fatal.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: Url,
    unit: TemperatureUnit,
}

impl WeatherProvider {
    pub fn new(base_url: &str, timeout: Duration, unit: TemperatureUnit) -> Result<Self, WeatherError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WeatherError::InvalidRequest(format!("bad base URL {}: {}", base_url, e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            unit,
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
            config.temperature_unit,
        )
    }

    fn forecast_url(&self, latitude: f64, longitude: f64) -> Result<Url, WeatherError> {
        let mut url = self
            .base_url
            .join(FORECAST_PATH)
            .map_err(|e| WeatherError::InvalidRequest(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("latitude", &latitude.to_string())
                .append_pair("longitude", &longitude.to_string())
                .append_pair("current", CURRENT_VARIABLES)
                .append_pair("timezone", "auto");
            if let Some(unit) = self.unit.query_value() {
                query.append_pair("temperature_unit", unit);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl WeatherLookup for WeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, WeatherError> {
        let url = self.forecast_url(latitude, longitude)?;

        let response = self.client.get(url).send().await?;

        if let Err(e) = response.error_for_status_ref() {
            tracing::debug!("Forecast request returned status {}", response.status());
            return Err(e.into());
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use weatherwhiz_core::NetworkError;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast_body(temperature: f64) -> serde_json::Value {
        serde_json::json!({
            "current_units": {
                "temperature_2m": "°C",
                "wind_speed_10m": "km/h",
                "relative_humidity_2m": "%"
            },
            "current": {
                "time": "2024-06-01T12:00",
                "interval": 900,
                "temperature_2m": temperature,
                "relative_humidity_2m": 70,
                "weather_code": 3,
                "wind_speed_10m": 10.0
            }
        })
    }

    fn provider_for(server: &MockServer, unit: TemperatureUnit) -> WeatherProvider {
        WeatherProvider::new(&server.uri(), Duration::from_secs(5), unit).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_current_conditions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "51.5"))
            .and(query_param("longitude", "0.1"))
            .and(query_param("current", CURRENT_VARIABLES))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(15.0)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, TemperatureUnit::Auto);
        let conditions = provider.current_conditions(51.5, 0.1).await.unwrap();

        assert_eq!(conditions.current.temperature, 15.0);
        assert_eq!(conditions.current.weather_code, 3);
        assert_eq!(conditions.current_units.temperature, "°C");
    }

    #[tokio::test]
    async fn test_temperature_unit_is_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("temperature_unit", "fahrenheit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(59.0)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, TemperatureUnit::Fahrenheit);
        let conditions = provider.current_conditions(51.5, 0.1).await.unwrap();
        assert_eq!(conditions.current.temperature, 59.0);
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "95"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let provider = provider_for(&server, TemperatureUnit::Auto);

        let err = provider.current_conditions(1.0, 2.0).await.unwrap_err();
        match &err {
            WeatherError::Network(e @ NetworkError::Status { code: 503, .. }) => {
                assert!(e.user_message().contains("later"));
            }
            other => panic!("expected a 503 status, got {:?}", other),
        }

        let err = provider.current_conditions(95.0, 2.0).await.unwrap_err();
        match &err {
            WeatherError::Network(e @ NetworkError::Status { code: 400, .. }) => {
                assert_eq!(e.user_message(), "The weather service refused the request.");
            }
            other => panic!("expected a 400 status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "current": {} })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, TemperatureUnit::Auto);
        let err = provider.current_conditions(1.0, 2.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(forecast_body(1.0))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider =
            WeatherProvider::new(&server.uri(), Duration::from_millis(100), TemperatureUnit::Auto)
                .unwrap();
        let err = provider.current_conditions(1.0, 2.0).await.unwrap_err();
        assert!(
            matches!(err, WeatherError::Network(weatherwhiz_core::NetworkError::TimedOut)),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = WeatherProvider::new("not a url", Duration::from_secs(1), TemperatureUnit::Auto)
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidRequest(_)));
    }
}

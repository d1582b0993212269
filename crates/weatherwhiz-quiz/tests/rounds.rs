//! End-to-end rounds: catalog listing -> Open-Meteo mock -> controller.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;
use weatherwhiz_catalog::{Location, LocationStore};
use weatherwhiz_core::TemperatureUnit;
use weatherwhiz_quiz::{
    QuizBuilder, QuizController, QuizHandle, QuizPools, QuizState, WeatherFetcher,
    NO_DATA_MESSAGE,
};
use weatherwhiz_weather::WeatherProvider;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn forecast_body(temperature: f64, weather_code: i32) -> serde_json::Value {
    serde_json::json!({
        "latitude": 0.0,
        "longitude": 0.0,
        "current_units": {
            "time": "iso8601",
            "interval": "seconds",
            "temperature_2m": "°C",
            "wind_speed_10m": "km/h",
            "relative_humidity_2m": "%",
            "weather_code": "wmo code"
        },
        "current": {
            "time": "2024-06-01T12:00",
            "interval": 900,
            "temperature_2m": temperature,
            "relative_humidity_2m": 65,
            "weather_code": weather_code,
            "wind_speed_10m": 8.5
        }
    })
}

async fn mock_city(server: &MockServer, latitude: &str, temperature: f64) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", latitude))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(temperature, 1)))
        .mount(server)
        .await;
}

async fn mock_outage(server: &MockServer, latitude: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", latitude))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn catalog() -> Vec<Location> {
    let store = LocationStore::in_memory().unwrap();
    store
        .seed(&[
            Location::new(1, "London", 51.5, -0.12),
            Location::new(2, "Paris", 48.85, 2.35),
        ])
        .unwrap();
    store.list().unwrap()
}

fn controller(server: &MockServer) -> QuizHandle {
    let provider =
        WeatherProvider::new(&server.uri(), Duration::from_secs(5), TemperatureUnit::Auto).unwrap();
    let fetcher = WeatherFetcher::new(Arc::new(provider));
    let (handle, _task) = QuizController::spawn(Arc::new(fetcher), QuizBuilder::seeded(5));
    handle
}

async fn settled(handle: &QuizHandle) -> QuizState {
    let mut rx = handle.subscribe_state();
    let state = tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| !matches!(s, QuizState::Idle | QuizState::Loading)),
    )
    .await
    .expect("round did not settle")
    .expect("controller stopped")
    .clone();
    state
}

fn success(state: QuizState) -> QuizPools {
    match state {
        QuizState::Success(pools) => pools,
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_both_cities_answer() {
    let server = MockServer::start().await;
    mock_city(&server, "51.5", 15.0).await;
    mock_city(&server, "48.85", 20.0).await;
    let handle = controller(&server);

    handle.start(catalog()).unwrap();
    let pools = success(settled(&handle).await);

    assert_eq!(pools.names.len(), 2);
    assert_eq!(pools.cards.len(), 2);

    let london_name = pools.names.iter().position(|n| n == "London").unwrap();
    let london_card = pools.cards.iter().position(|c| c.location_id == 1).unwrap();
    assert_eq!(pools.cards[london_card].temperature, 15.0);

    handle.select_pairing(london_name, london_card).unwrap();
    let mut scoreboard = handle.subscribe_scoreboard();
    let board = scoreboard
        .wait_for(|b| !b.matched.is_empty())
        .await
        .unwrap()
        .clone();

    assert_eq!(board.matched.into_iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(board.wrong_guesses, 0);
    assert!(matches!(handle.state(), QuizState::Success(_)));
}

#[tokio::test]
async fn test_one_outage_still_plays() {
    let server = MockServer::start().await;
    mock_city(&server, "51.5", 15.0).await;
    mock_outage(&server, "48.85").await;
    let handle = controller(&server);

    handle.start(catalog()).unwrap();
    let pools = success(settled(&handle).await);

    assert_eq!(pools.names, vec!["London".to_string()]);
    assert_eq!(pools.cards.len(), 1);
    assert_eq!(pools.cards[0].location_id, 1);
}

#[tokio::test]
async fn test_total_outage_is_no_data_then_retry_recovers() {
    let server = MockServer::start().await;
    mock_outage(&server, "51.5").await;
    mock_outage(&server, "48.85").await;
    let handle = controller(&server);

    handle.start(catalog()).unwrap();
    assert_eq!(
        settled(&handle).await,
        QuizState::Error(NO_DATA_MESSAGE.to_string())
    );

    server.reset().await;
    mock_city(&server, "51.5", 15.0).await;
    mock_city(&server, "48.85", 20.0).await;

    handle.retry(catalog()).unwrap();
    let mut rx = handle.subscribe_state();
    let state = tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| matches!(s, QuizState::Success(_))),
    )
    .await
    .expect("retry did not succeed")
    .unwrap()
    .clone();
    assert_eq!(success(state).len(), 2);
}

#[tokio::test]
async fn test_single_city_round_ends_in_game_over() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(-4.0, 71)))
        .mount(&server)
        .await;
    let handle = controller(&server);

    handle
        .start(vec![Location::new(10, "Reykjavik", 64.15, -21.94)])
        .unwrap();
    success(settled(&handle).await);

    handle.select_pairing(0, 0).unwrap();
    let mut rx = handle.subscribe_state();
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| matches!(s, QuizState::GameOver { .. })),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_eq!(
        state,
        QuizState::GameOver {
            final_wrong_guesses: 0,
            total_locations: 1
        }
    );
    assert_eq!(handle.scoreboard().matched.len(), 1);
    assert!(handle.scoreboard().matched.contains(&10));

    handle.reset().unwrap();
    let mut rx = handle.subscribe_state();
    rx.wait_for(|s| *s == QuizState::Idle).await.unwrap();
    assert!(handle.scoreboard().matched.is_empty());
}

#[tokio::test]
async fn test_empty_selection_is_no_data_without_requests() {
    let server = MockServer::start().await;
    let handle = controller(&server);

    handle.start(Vec::new()).unwrap();
    assert_eq!(
        settled(&handle).await,
        QuizState::Error(NO_DATA_MESSAGE.to_string())
    );

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

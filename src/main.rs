use anyhow::Result;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use weatherwhiz_catalog::{CatalogError, LocationId, LocationStore};
use weatherwhiz_core::{AppError, Config, ConfigError, WeatherConfig};
use weatherwhiz_quiz::{
    QuizBuilder, QuizController, QuizHandle, QuizPools, QuizState, Scoreboard, WeatherFetcher,
};
use weatherwhiz_weather::{WeatherError, WeatherProvider};

const HELP: &str = "\
Commands:
  <name#> <card#>          pair a name with a weather card
  start                    start a round with every catalog location
  retry                    retry after an error
  reset                    abandon the round and return to idle
  list                     show the location catalog
  add <name> <lat> <lon>   add a location
  remove <id>              remove a location you added
  help                     show this help
  quit                     exit";

/// One line of player input.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Pair { name: usize, card: usize },
    Start,
    Retry,
    Reset,
    List,
    Add { name: String, latitude: f64, longitude: f64 },
    Remove(LocationId),
    Help,
    Quit,
}

impl Input {
    /// Parse a command line. Pairing numbers are 1-based as displayed.
    fn parse(line: &str) -> Option<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["start"] => Some(Input::Start),
            ["retry"] => Some(Input::Retry),
            ["reset"] => Some(Input::Reset),
            ["list"] => Some(Input::List),
            ["help"] => Some(Input::Help),
            ["quit"] | ["exit"] => Some(Input::Quit),
            ["remove", id] => id.parse().ok().map(Input::Remove),
            ["add", name @ .., lat, lon] if !name.is_empty() => Some(Input::Add {
                name: name.join(" "),
                latitude: lat.parse().ok()?,
                longitude: lon.parse().ok()?,
            }),
            [name, card] => {
                let name: usize = name.parse().ok()?;
                let card: usize = card.parse().ok()?;
                Some(Input::Pair {
                    name: name.checked_sub(1)?,
                    card: card.checked_sub(1)?,
                })
            }
            _ => None,
        }
    }
}

fn config_failure(err: anyhow::Error) -> AppError {
    match err.downcast::<ConfigError>() {
        Ok(e) => AppError::Settings(e),
        Err(err) => AppError::Other(err),
    }
}

fn catalog_failure(err: CatalogError) -> AppError {
    match err {
        CatalogError::Database(e) => AppError::Catalog(e),
        other => AppError::Other(other.into()),
    }
}

fn weather_failure(err: WeatherError) -> AppError {
    match err {
        WeatherError::Network(e) => AppError::Weather(e),
        other => AppError::Other(other.into()),
    }
}

/// Concurrency cap for one round's lookups; `None` means unbounded.
fn lookup_cap(weather: &WeatherConfig) -> Option<NonZeroUsize> {
    weather.max_concurrent_lookups.and_then(NonZeroUsize::new)
}

struct Session {
    store: LocationStore,
    quiz: QuizHandle,
}

fn startup() -> Result<Session, AppError> {
    let (config, _) = Config::load_validated().map_err(config_failure)?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let store = LocationStore::open(config.database_path()).map_err(catalog_failure)?;
    if config.catalog.seed_builtin {
        let seeded = store.seed_builtin().map_err(catalog_failure)?;
        if seeded > 0 {
            tracing::info!("Seeded {} built-in locations", seeded);
        }
    }

    let provider = WeatherProvider::from_config(&config.weather).map_err(weather_failure)?;
    let mut fetcher = WeatherFetcher::new(Arc::new(provider));
    if let Some(limit) = lookup_cap(&config.weather) {
        fetcher = fetcher.with_concurrency_limit(limit);
    }

    let builder = QuizBuilder::from_seed_option(config.quiz.shuffle_seed);
    let (quiz, _task) = QuizController::spawn(Arc::new(fetcher), builder);

    Ok(Session { store, quiz })
}

fn render_state(state: &QuizState, scoreboard: &Scoreboard) {
    match state {
        QuizState::Idle => println!("\nIdle. Type `start` to play."),
        QuizState::Loading => println!("\nFetching weather..."),
        QuizState::Error(message) => println!("\n{message} Type `retry` to try again."),
        QuizState::Success(pools) => render_pools(pools, scoreboard),
        QuizState::GameOver {
            final_wrong_guesses,
            total_locations,
        } => println!(
            "\nAll {total_locations} locations matched with {final_wrong_guesses} wrong guesses. \
             Type `reset` to play again."
        ),
    }
}

fn render_pools(pools: &QuizPools, scoreboard: &Scoreboard) {
    println!("\nLocations:");
    for (i, name) in pools.names.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, name);
    }
    println!("Weather:");
    for (i, card) in pools.cards.iter().enumerate() {
        let mark = if scoreboard.matched.contains(&card.location_id) {
            "✓"
        } else {
            " "
        };
        let condition = card.condition();
        println!(
            "  {:>2}. {} {:>6.1}°  {} {}",
            i + 1,
            mark,
            card.temperature,
            condition.icon(),
            condition.description()
        );
    }
    println!(
        "Matched {}/{}, wrong guesses: {}",
        scoreboard.matched.len(),
        pools.len(),
        scoreboard.wrong_guesses
    );
}

/// Print every state or score change until the controller stops.
async fn render_loop(
    mut state: watch::Receiver<QuizState>,
    mut scoreboard: watch::Receiver<Scoreboard>,
) {
    loop {
        tokio::select! {
            changed = state.changed() => if changed.is_err() { break },
            changed = scoreboard.changed() => if changed.is_err() { break },
        }
        let current = state.borrow_and_update().clone();
        let board = scoreboard.borrow_and_update().clone();
        render_state(&current, &board);
    }
}

fn print_catalog(store: &LocationStore) -> Result<(), CatalogError> {
    for location in store.list()? {
        let origin = if location.is_user_added { " (yours)" } else { "" };
        println!(
            "  [{}] {}  {:.2}, {:.2}{}",
            location.id, location.name, location.latitude, location.longitude, origin
        );
    }
    Ok(())
}

/// Apply one input. Returns `false` when the session should end.
fn dispatch(session: &Session, input: Input) -> Result<bool> {
    let Session { store, quiz } = session;
    match input {
        Input::Pair { name, card } => quiz.select_pairing(name, card)?,
        Input::Start => quiz.start(store.list()?)?,
        Input::Retry => quiz.retry(store.list()?)?,
        Input::Reset => quiz.reset()?,
        Input::List => print_catalog(store)?,
        Input::Add {
            name,
            latitude,
            longitude,
        } => {
            let location = store.add_user_location(&name, latitude, longitude)?;
            println!("Added {} as #{}", location.name, location.id);
        }
        Input::Remove(id) => {
            if store.delete(id)? {
                println!("Removed #{id}");
            } else {
                println!("#{id} is not a location you added");
            }
        }
        Input::Help => println!("{HELP}"),
        Input::Quit => return Ok(false),
    }
    Ok(true)
}

fn report(err: &anyhow::Error) {
    tracing::warn!("Command failed: {:#}", err);
    if let Some(e) = err.downcast_ref::<CatalogError>() {
        println!("{}", e.user_message());
    } else if let Some(e) = err.downcast_ref::<weatherwhiz_quiz::QuizError>() {
        println!("{}", e.user_message());
    } else {
        println!("Something went wrong. Please try again.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    weatherwhiz_core::init()?;

    let session = match startup() {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    tracing::info!("WeatherWhiz started");
    println!("WeatherWhiz - match each city to its current weather");
    println!("{HELP}");

    let renderer = tokio::spawn(render_loop(
        session.quiz.subscribe_state(),
        session.quiz.subscribe_scoreboard(),
    ));

    let mut catalog = session.store.subscribe();

    if let Err(e) = dispatch(&session, Input::Start) {
        report(&e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(input) = Input::parse(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command. Type `help` for the list.");
            }
            continue;
        };

        match dispatch(&session, input) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => report(&e),
        }

        if catalog.has_changed().unwrap_or(false) {
            let count = catalog.borrow_and_update().len();
            println!("Catalog now has {count} locations; `reset` then `start` to use them.");
        }
    }

    drop(session);
    let _ = renderer.await;
    tracing::info!("WeatherWhiz stopped");
    Ok(())
}

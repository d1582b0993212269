//! Concurrent weather fan-out for a quiz round.
//!
//! One lookup per location runs as its own task; a failed lookup only drops
//! its location from the round. Survivors keep the relative order of the
//! input regardless of completion order.

use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use weatherwhiz_catalog::Location;
use weatherwhiz_weather::WeatherLookup;

use crate::error::QuizError;
use crate::model::QuizItem;

/// Source of a round's answer key.
///
/// An empty `Ok` means nothing could be fetched; `Err` means the aggregation
/// step itself failed.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn fetch_quiz_data(
        &self,
        locations: &[Location],
        cancel: &CancellationToken,
    ) -> Result<Vec<QuizItem>, QuizError>;
}

#[derive(Clone)]
pub struct WeatherFetcher {
    lookup: Arc<dyn WeatherLookup>,
    permits: Option<Arc<Semaphore>>,
}

impl WeatherFetcher {
    /// Fetcher with unbounded fan-out: every location's lookup starts at once.
    pub fn new(lookup: Arc<dyn WeatherLookup>) -> Self {
        Self {
            lookup,
            permits: None,
        }
    }

    /// Cap the number of lookups in flight at the same time.
    pub fn with_concurrency_limit(mut self, limit: NonZeroUsize) -> Self {
        self.permits = Some(Arc::new(Semaphore::new(limit.get())));
        self
    }

    /// Fetch current weather for every location.
    ///
    /// Returns `Err(QuizError::Cancelled)` if `cancel` fires first; all
    /// outstanding lookups are aborted before returning.
    #[instrument(skip_all, fields(locations = locations.len()))]
    pub async fn fetch(
        &self,
        locations: &[Location],
        cancel: &CancellationToken,
    ) -> Result<Vec<QuizItem>, QuizError> {
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let mut join_set = JoinSet::new();

        for (index, location) in locations.iter().cloned().enumerate() {
            let lookup = Arc::clone(&self.lookup);
            let permits = self.permits.clone();

            join_set.spawn(async move {
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let result = lookup
                    .current_conditions(location.latitude, location.longitude)
                    .await;
                (index, location, result)
            });
        }

        let mut slots: Vec<Option<QuizItem>> = (0..locations.len()).map(|_| None).collect();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    tracing::debug!("Fetch cancelled with {} lookups outstanding", join_set.len());
                    return Err(QuizError::Cancelled);
                }
                joined = join_set.join_next() => match joined {
                    None => break,
                    Some(Ok((index, location, Ok(conditions)))) => {
                        tracing::debug!("Fetched weather for {}", location.name);
                        slots[index] = Some(QuizItem::from_conditions(&location, conditions));
                    }
                    Some(Ok((_, location, Err(e)))) => {
                        tracing::warn!("Dropping {} from round: {}", location.name, e);
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Lookup task failed: {}", e);
                    }
                },
            }
        }

        let items: Vec<QuizItem> = slots.into_iter().flatten().collect();
        tracing::info!("{} of {} lookups succeeded", items.len(), locations.len());
        Ok(items)
    }
}

#[async_trait]
impl QuizRepository for WeatherFetcher {
    async fn fetch_quiz_data(
        &self,
        locations: &[Location],
        cancel: &CancellationToken,
    ) -> Result<Vec<QuizItem>, QuizError> {
        self.fetch(locations, cancel).await
    }
}

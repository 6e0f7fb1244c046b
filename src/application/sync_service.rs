// Sync service - Brings the persisted price history up to date, one day at a time
use crate::application::errors::{SyncError, UpstreamError};
use crate::application::price_repository::PriceRepository;
use crate::application::price_source::{FetchOutcome, PriceSource};
use crate::domain::calendar::{local_day, next_day, start_of_day};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How a sync run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Caught up with everything the sources publish
    Success { days_synced: u32 },
    /// Neither source had prices for a past day, so history still has a gap at `date`
    PartialGap { date: NaiveDate, days_synced: u32 },
}

#[derive(Clone)]
pub struct SyncService {
    repository: Arc<dyn PriceRepository>,
    primary: Arc<dyn PriceSource>,
    secondary: Arc<dyn PriceSource>,
    epoch: NaiveDate,
    request_timeout: Duration,
}

impl SyncService {
    pub fn new(
        repository: Arc<dyn PriceRepository>,
        primary: Arc<dyn PriceSource>,
        secondary: Arc<dyn PriceSource>,
        epoch: NaiveDate,
        request_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            primary,
            secondary,
            epoch,
            request_timeout,
        }
    }

    /// First day that still needs syncing: the day after the latest persisted price,
    /// or the epoch when nothing is persisted yet.
    pub async fn resume_date(&self) -> Result<NaiveDate, SyncError> {
        let latest = self
            .repository
            .latest_price()
            .await
            .map_err(SyncError::Resume)?;

        Ok(match latest {
            Some(price) => next_day(local_day(price.date_time)),
            None => self.epoch,
        })
    }

    /// Sync every day from the resume point up to and including the day of `end`.
    ///
    /// Days are processed strictly in order. Cancellation is checked before every
    /// day and while waiting on a source, never between fetching and persisting.
    pub async fn sync(
        &self,
        end: DateTime<Utc>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<SyncOutcome, SyncError> {
        let mut current = self.resume_date().await?;
        tracing::info!("Starting sync at {}", current);

        let last_start = start_of_day(local_day(end)) + chrono::Duration::hours(1);
        let mut days_synced = 0;

        loop {
            if start_of_day(current) > last_start {
                break;
            }

            if *cancel.borrow() {
                return Err(SyncError::Cancelled { date: current });
            }

            let fetched = tokio::select! {
                biased;
                _ = cancelled(cancel) => return Err(SyncError::Cancelled { date: current }),
                fetched = self.fetch_with_fallback(current) => fetched,
            };

            let prices = match fetched.map_err(|source| SyncError::Upstream {
                date: current,
                source,
            })? {
                FetchOutcome::Synced => break,
                FetchOutcome::Prices(prices) if prices.is_empty() => {
                    tracing::warn!("No prices for {}, stopping with a gap", current);
                    return Ok(SyncOutcome::PartialGap {
                        date: current,
                        days_synced,
                    });
                }
                FetchOutcome::Prices(prices) => prices,
            };

            self.repository
                .save_prices(current, &prices)
                .await
                .map_err(|source| SyncError::Persistence {
                    date: current,
                    source,
                })?;

            tracing::info!("Synced {} prices for {}", prices.len(), current);
            days_synced += 1;
            current = next_day(current);
        }

        tracing::info!("Fully synced after {} day(s)", days_synced);
        Ok(SyncOutcome::Success { days_synced })
    }

    /// Ask the primary source, falling back to the secondary when the primary fails,
    /// reports synced or returns nothing.
    async fn fetch_with_fallback(&self, date: NaiveDate) -> Result<FetchOutcome, UpstreamError> {
        match self.fetch(self.primary.as_ref(), date).await {
            Ok(FetchOutcome::Prices(prices)) if !prices.is_empty() => {
                return Ok(FetchOutcome::Prices(prices));
            }
            Ok(FetchOutcome::Prices(_)) => {
                tracing::debug!("{} returned no prices for {}", self.primary.name(), date);
            }
            Ok(FetchOutcome::Synced) => {
                tracing::debug!("{} reports synced at {}", self.primary.name(), date);
            }
            Err(e) => {
                tracing::warn!("{} failed for {}: {}", self.primary.name(), date, e);
            }
        }

        tracing::debug!("Falling back to {} for {}", self.secondary.name(), date);
        self.fetch(self.secondary.as_ref(), date).await
    }

    async fn fetch(
        &self,
        source: &dyn PriceSource,
        date: NaiveDate,
    ) -> Result<FetchOutcome, UpstreamError> {
        match tokio::time::timeout(self.request_timeout, source.fetch_day(date)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                source_name: source.name().to_string(),
                seconds: self.request_timeout.as_secs(),
            }),
        }
    }
}

/// Resolves once the cancellation flag is raised.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        // sender dropped, nobody can cancel this run any more
        std::future::pending::<()>().await;
    }
}

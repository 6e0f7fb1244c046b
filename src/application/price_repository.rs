// Repository trait for persisted price history
use crate::application::errors::StoreError;
use crate::domain::price::PricePoint;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Most recent persisted price, `None` when the history is empty
    async fn latest_price(&self) -> StoreResult<Option<PricePoint>>;

    /// Persist all prices of one day. Either every price is stored or none is.
    async fn save_prices(&self, date: NaiveDate, prices: &[PricePoint]) -> StoreResult<()>;

    /// Prices in `[start, end)`, oldest first
    async fn prices_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PricePoint>>;

    /// Price of the hour containing `at`
    async fn price_at(&self, at: DateTime<Utc>) -> StoreResult<Option<PricePoint>>;

    /// Mean price in `[start, end)`, `None` when there are no prices
    async fn average_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Option<f64>>;
}

// Upstream price source abstraction
use crate::application::errors::UpstreamError;
use crate::domain::price::PricePoint;
use async_trait::async_trait;
use chrono::NaiveDate;

/// What a source returned for one day.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Prices for the day, possibly empty
    Prices(Vec<PricePoint>),
    /// The source has nothing more to offer for this date yet. Not an error.
    Synced,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    async fn fetch_day(&self, date: NaiveDate) -> Result<FetchOutcome, UpstreamError>;
}

// In-memory price repository, used for dry runs and tests
use crate::application::price_repository::{PriceRepository, StoreResult};
use crate::domain::calendar::start_of_hour;
use crate::domain::price::PricePoint;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    prices: RwLock<BTreeMap<DateTime<Utc>, f64>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.prices.read().await.len()
    }
}

#[async_trait]
impl PriceRepository for MemoryRepository {
    async fn latest_price(&self) -> StoreResult<Option<PricePoint>> {
        let prices = self.prices.read().await;
        Ok(prices
            .last_key_value()
            .map(|(date_time, price)| PricePoint::new(*date_time, *price)))
    }

    async fn save_prices(&self, date: NaiveDate, prices: &[PricePoint]) -> StoreResult<()> {
        // Whole day goes in under one write lock so readers never see half a day
        let mut stored = self.prices.write().await;
        for price in prices {
            stored.insert(price.date_time, price.price);
        }
        tracing::debug!("Stored {} prices for {} in memory", prices.len(), date);
        Ok(())
    }

    async fn prices_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PricePoint>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let prices = self.prices.read().await;
        Ok(prices
            .range(start..end)
            .map(|(date_time, price)| PricePoint::new(*date_time, *price))
            .collect())
    }

    async fn price_at(&self, at: DateTime<Utc>) -> StoreResult<Option<PricePoint>> {
        let hour = start_of_hour(at);
        let prices = self.prices.read().await;
        Ok(prices.get(&hour).map(|price| PricePoint::new(hour, *price)))
    }

    async fn average_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Option<f64>> {
        let prices = self.prices_in_range(start, end).await?;
        if prices.is_empty() {
            return Ok(None);
        }
        Ok(Some(crate::domain::analytics::average(&prices)))
    }
}

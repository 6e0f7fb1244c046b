// Price service - Reporting queries over the stored history
use crate::application::errors::PriceError;
use crate::application::price_repository::PriceRepository;
use crate::domain::analytics::{self, average};
use crate::domain::calendar::{day_window, local_day};
use crate::domain::next_period::find_next;
use crate::domain::price::{DailyAverage, DailyPriceInfo, DayRating, Period, PricePoint};
use crate::domain::rating::rate;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

const THIRTY_DAYS: u32 = 30;

/// A period returned by the next-period lookup, with whether it is already running.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingPeriod {
    pub period: Period,
    pub started: bool,
}

#[derive(Clone)]
pub struct PriceService {
    repository: Arc<dyn PriceRepository>,
}

impl PriceService {
    pub fn new(repository: Arc<dyn PriceRepository>) -> Self {
        Self { repository }
    }

    pub async fn daily_prices(&self, date: NaiveDate) -> Result<Vec<PricePoint>, PriceError> {
        let (start, end) = day_window(date, 1);
        Ok(self.repository.prices_in_range(start, end).await?)
    }

    pub async fn price_at(&self, at: DateTime<Utc>) -> Result<Option<PricePoint>, PriceError> {
        Ok(self.repository.price_at(at).await?)
    }

    /// Mean of every price in the thirty days ending with `date`.
    pub async fn thirty_day_average(&self, date: NaiveDate) -> Result<f64, PriceError> {
        let (start, end) = day_window(date, THIRTY_DAYS);
        self.repository
            .average_in_range(start, end)
            .await?
            .ok_or(PriceError::NoData(date))
    }

    pub async fn daily_averages(
        &self,
        date: NaiveDate,
        days: u32,
    ) -> Result<Vec<DailyAverage>, PriceError> {
        let (start, end) = day_window(date, days);
        let prices = self.repository.prices_in_range(start, end).await?;
        Ok(analytics::daily_averages(&prices))
    }

    pub async fn day_average(&self, date: NaiveDate) -> Result<f64, PriceError> {
        let prices = self.priced_day(date).await?;
        Ok(average(&prices))
    }

    pub async fn day_rating(&self, date: NaiveDate) -> Result<DayRating, PriceError> {
        let prices = self.priced_day(date).await?;
        let thirty_day_avg = self.thirty_day_average(date).await?;
        Ok(rate(average(&prices), thirty_day_avg))
    }

    pub async fn cheap_periods(&self, date: NaiveDate) -> Result<Vec<Period>, PriceError> {
        let prices = self.priced_day(date).await?;
        let thirty_day_avg = self.thirty_day_average(date).await?;
        Ok(analytics::cheap_periods(&prices, thirty_day_avg))
    }

    pub async fn expensive_periods(&self, date: NaiveDate) -> Result<Vec<Period>, PriceError> {
        let prices = self.priced_day(date).await?;
        let thirty_day_avg = self.thirty_day_average(date).await?;
        Ok(analytics::expensive_periods(&prices, thirty_day_avg))
    }

    /// Everything known about a day. Days without prices are rated `Unknown`.
    pub async fn daily_info(&self, date: NaiveDate) -> Result<DailyPriceInfo, PriceError> {
        let prices = self.daily_prices(date).await?;
        if prices.is_empty() {
            return Ok(DailyPriceInfo::unknown());
        }

        let thirty_day_avg = self.thirty_day_average(date).await?;
        let day_avg = average(&prices);

        Ok(DailyPriceInfo {
            day_rating: rate(day_avg, thirty_day_avg),
            day_average: day_avg,
            thirty_day_average: thirty_day_avg,
            cheap_periods: analytics::cheap_periods(&prices, thirty_day_avg),
            expensive_periods: analytics::expensive_periods(&prices, thirty_day_avg),
            prices,
        })
    }

    pub async fn next_cheap_period(
        &self,
        at: DateTime<Utc>,
    ) -> Result<Option<UpcomingPeriod>, PriceError> {
        let periods = self.cheap_periods(local_day(at)).await?;
        Ok(upcoming(&periods, at))
    }

    pub async fn next_expensive_period(
        &self,
        at: DateTime<Utc>,
    ) -> Result<Option<UpcomingPeriod>, PriceError> {
        let periods = self.expensive_periods(local_day(at)).await?;
        Ok(upcoming(&periods, at))
    }

    async fn priced_day(&self, date: NaiveDate) -> Result<Vec<PricePoint>, PriceError> {
        let prices = self.daily_prices(date).await?;
        if prices.is_empty() {
            return Err(PriceError::NoData(date));
        }
        Ok(prices)
    }
}

fn upcoming(periods: &[Period], at: DateTime<Utc>) -> Option<UpcomingPeriod> {
    let next = find_next(periods, at);
    next.period.map(|period| UpcomingPeriod {
        period: period.clone(),
        started: next.started,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::local_hour;
    use crate::infrastructure::memory_repository::MemoryRepository;
    use chrono::{Days, Duration};

    fn target_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()
    }

    fn prices_for(date: NaiveDate, price_of: impl Fn(u32) -> f64) -> Vec<PricePoint> {
        (0..24)
            .filter_map(|h| local_hour(date, h).map(|at| PricePoint::new(at, price_of(h))))
            .collect()
    }

    /// 29 flat days at 0.10 followed by a rising day from 0.15 to 0.38.
    async fn seeded_service() -> PriceService {
        let repository = Arc::new(MemoryRepository::new());
        for offset in 1..30 {
            let date = target_day().checked_sub_days(Days::new(offset)).unwrap();
            repository
                .save_prices(date, &prices_for(date, |_| 0.10))
                .await
                .unwrap();
        }
        repository
            .save_prices(
                target_day(),
                &prices_for(target_day(), |h| 0.15 + 0.01 * h as f64),
            )
            .await
            .unwrap();
        PriceService::new(repository)
    }

    #[tokio::test]
    async fn test_daily_info() {
        let service = seeded_service().await;
        let info = service.daily_info(target_day()).await.unwrap();

        assert_eq!(info.prices.len(), 24);
        assert!((info.day_average - 0.265).abs() < 1e-6);
        // (29 * 0.10 + 0.265) / 30
        assert!((info.thirty_day_average - 0.1055).abs() < 1e-6);
        assert_eq!(info.day_rating, DayRating::Bad);
        assert_eq!(info.cheap_periods.len(), 1);
        assert_eq!(info.cheap_periods[0].start(), local_hour(target_day(), 0));
        assert_eq!(info.expensive_periods.len(), 1);
        assert_eq!(info.expensive_periods[0].end(), local_hour(target_day(), 23));
    }

    #[tokio::test]
    async fn test_day_without_prices() {
        let service = seeded_service().await;
        let empty_day = target_day().checked_add_days(Days::new(1)).unwrap();

        assert_eq!(
            service.daily_info(empty_day).await.unwrap().day_rating,
            DayRating::Unknown
        );
        assert!(matches!(
            service.day_rating(empty_day).await,
            Err(PriceError::NoData(d)) if d == empty_day
        ));
        assert!(matches!(
            service.cheap_periods(empty_day).await,
            Err(PriceError::NoData(_))
        ));
        assert!(matches!(
            service.day_average(empty_day).await,
            Err(PriceError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn test_daily_averages() {
        let service = seeded_service().await;
        let averages = service.daily_averages(target_day(), 3).await.unwrap();

        assert_eq!(averages.len(), 3);
        assert_eq!(averages[2].date, target_day());
        assert!((averages[0].average - 0.10).abs() < 1e-9);
        assert!((averages[2].average - 0.265).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_next_periods() {
        let service = seeded_service().await;
        let first_hour = local_hour(target_day(), 0).unwrap();

        let cheap = service
            .next_cheap_period(first_hour + Duration::minutes(30))
            .await
            .unwrap()
            .unwrap();
        assert!(cheap.started);
        assert_eq!(cheap.period.start(), Some(first_hour));

        let expensive = service
            .next_expensive_period(first_hour + Duration::minutes(30))
            .await
            .unwrap()
            .unwrap();
        assert!(!expensive.started);

        let late = service
            .next_cheap_period(local_hour(target_day(), 23).unwrap() + Duration::minutes(30))
            .await
            .unwrap();
        assert!(late.is_none());
    }

    #[tokio::test]
    async fn test_price_at() {
        let service = seeded_service().await;
        let at = local_hour(target_day(), 5).unwrap() + Duration::minutes(10);
        let price = service.price_at(at).await.unwrap().unwrap();
        assert!((price.price - 0.20).abs() < 1e-9);
    }
}

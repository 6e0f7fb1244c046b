// Price domain models
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// One hourly price observation, in €/kWh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date_time: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date_time: DateTime<Utc>, price: f64) -> Self {
        Self { date_time, price }
    }

    /// End of the hour this point covers.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.date_time + Duration::hours(1)
    }
}

/// A run of prices where each point is exactly one hour after the previous one.
///
/// Periods built by grouping are never empty. An empty one is still a valid value
/// and the next-period lookup skips it.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    points: Vec<PricePoint>,
}

impl Period {
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.date_time)
    }

    /// Timestamp of the last point in the period (not the end of its hour).
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.date_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayRating {
    /// No prices for the day.
    #[default]
    Unknown,
    Good,
    Normal,
    Bad,
}

impl DayRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayRating::Unknown => "UNKNOWN",
            DayRating::Good => "GOOD",
            DayRating::Normal => "NORMAL",
            DayRating::Bad => "BAD",
        }
    }
}

impl std::fmt::Display for DayRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyAverage {
    pub date: NaiveDate,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailyPriceInfo {
    pub day_rating: DayRating,
    pub day_average: f64,
    pub thirty_day_average: f64,
    pub prices: Vec<PricePoint>,
    pub cheap_periods: Vec<Period>,
    pub expensive_periods: Vec<Period>,
}

impl DailyPriceInfo {
    /// Info for a day with no published prices.
    pub fn unknown() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_bounds() {
        let first = PricePoint::new(Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap(), 0.1);
        let last = PricePoint::new(Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(), 0.2);
        let period = Period::new(vec![first, last]);

        assert_eq!(period.start(), Some(first.date_time));
        assert_eq!(period.end(), Some(last.date_time));
        assert_eq!(period.points().len(), 2);
        assert_eq!(last.end_time(), Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_empty_period_has_no_bounds() {
        let period = Period::new(Vec::new());
        assert!(period.points().is_empty());
        assert_eq!(period.start(), None);
        assert_eq!(period.end(), None);
    }

    #[test]
    fn test_unknown_is_default_rating() {
        assert_eq!(DailyPriceInfo::unknown().day_rating, DayRating::Unknown);
        assert_eq!(DayRating::Good.to_string(), "GOOD");
    }
}

// Price analytics - adaptive cheap/expensive period detection
//
// The "variance" values here are price bands in €/kWh, not statistical variances.
// Every band is clamped to a fraction of the day's min-max spread so flat days
// produce degenerate periods and volatile days produce wider ones.
use super::calendar::local_day;
use super::price::{DailyAverage, Period, PricePoint};
use super::rating::RATING_VARIANCE;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

const VARIANCE_DIVISOR: f64 = 2.0;

/// Arithmetic mean of the prices, 0 for an empty slice.
pub fn average(prices: &[PricePoint]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().map(|p| p.price).sum::<f64>() / prices.len() as f64
}

pub fn min_price(prices: &[PricePoint]) -> f64 {
    prices
        .iter()
        .map(|p| p.price)
        .reduce(f64::min)
        .unwrap_or(0.0)
}

pub fn max_price(prices: &[PricePoint]) -> f64 {
    prices
        .iter()
        .map(|p| p.price)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Lower bound of a band: a sixth of the spread.
pub fn min_variance(min: f64, max: f64) -> f64 {
    (max - min) / 6.0
}

/// Upper bound of a band: a third of the spread.
pub fn max_variance(min: f64, max: f64) -> f64 {
    (max - min) / 3.0
}

/// Weighted average counting the day twice as much as the thirty-day baseline.
pub fn combined_average(day_avg: f64, thirty_day_avg: f64) -> f64 {
    if day_avg == 0.0 && thirty_day_avg == 0.0 {
        return 0.0;
    }
    (day_avg * 2.0 + thirty_day_avg) / 3.0
}

fn clamp_variance(raw: f64, min: f64, max: f64) -> f64 {
    let lower = min_variance(min, max);
    let upper = max_variance(min, max);
    if raw < lower {
        lower
    } else if raw > upper {
        upper
    } else {
        raw
    }
}

pub fn cheap_variance(prices: &[PricePoint], thirty_day_avg: f64) -> f64 {
    let min = min_price(prices);
    let max = max_price(prices);
    let comb_avg = combined_average(average(prices), thirty_day_avg);
    clamp_variance((comb_avg - min) / VARIANCE_DIVISOR, min, max)
}

pub fn expensive_variance(prices: &[PricePoint], thirty_day_avg: f64) -> f64 {
    let min = min_price(prices);
    let max = max_price(prices);
    let comb_avg = combined_average(average(prices), thirty_day_avg);
    clamp_variance((max - comb_avg) / VARIANCE_DIVISOR, min, max)
}

/// Hours priced within the cheap band above the day's minimum, grouped into periods.
pub fn cheap_periods(prices: &[PricePoint], thirty_day_avg: f64) -> Vec<Period> {
    if prices.is_empty() {
        return Vec::new();
    }
    let threshold = min_price(prices) + cheap_variance(prices, thirty_day_avg);
    let selected: Vec<PricePoint> = prices
        .iter()
        .filter(|p| p.price <= threshold)
        .copied()
        .collect();
    group_consecutive(&selected)
}

/// Hours priced within the expensive band below the day's maximum, grouped into periods.
///
/// A day whose most expensive hour is still cheap against the thirty-day average
/// has no expensive periods at all.
pub fn expensive_periods(prices: &[PricePoint], thirty_day_avg: f64) -> Vec<Period> {
    if prices.is_empty() {
        return Vec::new();
    }
    let max = max_price(prices);
    if max <= thirty_day_avg - RATING_VARIANCE {
        return Vec::new();
    }
    let variance = expensive_variance(prices, thirty_day_avg);
    let selected: Vec<PricePoint> = prices
        .iter()
        .filter(|p| max - p.price <= variance)
        .copied()
        .collect();
    group_consecutive(&selected)
}

/// Split chronologically sorted prices into runs of consecutive hours.
pub fn group_consecutive(prices: &[PricePoint]) -> Vec<Period> {
    let mut periods = Vec::new();
    let mut current: Vec<PricePoint> = Vec::new();

    for price in prices {
        if let Some(last) = current.last() {
            if price.date_time - last.date_time != Duration::hours(1) {
                periods.push(Period::new(std::mem::take(&mut current)));
            }
        }
        current.push(*price);
    }
    if !current.is_empty() {
        periods.push(Period::new(current));
    }

    periods
}

/// Average price per market-timezone calendar day, sorted by date.
pub fn daily_averages(prices: &[PricePoint]) -> Vec<DailyAverage> {
    let mut by_day: BTreeMap<NaiveDate, Vec<PricePoint>> = BTreeMap::new();
    for price in prices {
        by_day.entry(local_day(price.date_time)).or_default().push(*price);
    }

    by_day
        .into_iter()
        .map(|(date, day_prices)| DailyAverage {
            date,
            average: average(&day_prices),
        })
        .collect()
}

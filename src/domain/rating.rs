// Day rating against the trailing thirty-day average
use super::price::DayRating;

/// Absolute distance (€/kWh) from the thirty-day average a day must exceed to be
/// rated good or bad. Also used to decide that a whole day is cheap.
pub const RATING_VARIANCE: f64 = 0.02;

/// Rate a day's average. Callers short-circuit days without prices to `DayRating::Unknown`.
pub fn rate(day_avg: f64, thirty_day_avg: f64) -> DayRating {
    let delta = day_avg - thirty_day_avg;

    if delta < -RATING_VARIANCE {
        DayRating::Good
    } else if delta > RATING_VARIANCE {
        DayRating::Bad
    } else {
        DayRating::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        assert_eq!(rate(0.2, 0.1), DayRating::Bad);
        assert_eq!(rate(0.1, 0.2), DayRating::Good);
        assert_eq!(rate(0.1, 0.11), DayRating::Normal);
        assert_eq!(rate(0.0, 0.0), DayRating::Normal);
    }

    #[test]
    fn test_rate_at_threshold_is_normal() {
        assert_eq!(rate(0.0, RATING_VARIANCE), DayRating::Normal);
        assert_eq!(rate(RATING_VARIANCE, 0.0), DayRating::Normal);
    }
}

// Locate the next relevant period for a point in time
use super::price::Period;
use chrono::{DateTime, Duration, Utc};

/// Result of looking up the next period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextPeriod<'a> {
    pub period: Option<&'a Period>,
    pub started: bool,
}

impl<'a> NextPeriod<'a> {
    fn none() -> Self {
        Self {
            period: None,
            started: false,
        }
    }
}

/// Find the first period that has not started yet or is still running at `at`.
///
/// `periods` must already be ordered by start time; this does not sort. A period
/// counts as running until one hour after its last point, since every point
/// covers a full hour.
pub fn find_next(periods: &[Period], at: DateTime<Utc>) -> NextPeriod<'_> {
    for period in periods {
        let (Some(start), Some(end)) = (period.start(), period.end()) else {
            continue;
        };

        if start > at {
            return NextPeriod {
                period: Some(period),
                started: false,
            };
        }
        if at < end + Duration::hours(1) {
            return NextPeriod {
                period: Some(period),
                started: true,
            };
        }
    }

    NextPeriod::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, h, m, 0).unwrap()
    }

    fn period(hours: &[u32]) -> Period {
        Period::new(hours.iter().map(|h| PricePoint::new(at(*h, 0), 0.1)).collect())
    }

    #[test]
    fn test_no_periods() {
        assert_eq!(find_next(&[], at(12, 0)), NextPeriod::none());
    }

    #[test]
    fn test_future_period() {
        let periods = vec![period(&[3]), period(&[6, 7])];
        let next = find_next(&periods, at(1, 0));
        assert_eq!(next.period, Some(&periods[0]));
        assert!(!next.started);
    }

    #[test]
    fn test_running_period() {
        let periods = vec![period(&[3]), period(&[6, 7])];
        let next = find_next(&periods, at(6, 30));
        assert_eq!(next.period, Some(&periods[1]));
        assert!(next.started);

        // still inside the last hour of the period
        let next = find_next(&periods, at(7, 59));
        assert_eq!(next.period, Some(&periods[1]));
        assert!(next.started);
    }

    #[test]
    fn test_all_periods_elapsed() {
        let periods = vec![period(&[3]), period(&[6, 7])];
        assert_eq!(find_next(&periods, at(8, 0)), NextPeriod::none());
    }

    #[test]
    fn test_skips_past_and_empty_periods() {
        let periods = vec![period(&[1]), Period::new(Vec::new()), period(&[9])];
        let next = find_next(&periods, at(4, 0));
        assert_eq!(next.period, Some(&periods[2]));
        assert!(!next.started);
    }

    #[test]
    fn test_expects_sorted_input() {
        // An unsorted list returns the first match in the given order, not the earliest period.
        let periods = vec![period(&[9]), period(&[5])];
        let next = find_next(&periods, at(4, 0));
        assert_eq!(next.period, Some(&periods[0]));
    }
}

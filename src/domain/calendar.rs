// Calendar helpers - all day boundaries are Spanish peninsular time
use chrono::{
    DateTime, Days, DurationRound, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

pub const MARKET_TZ: Tz = chrono_tz::Europe::Madrid;

/// First instant of a calendar day in the market timezone.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    MARKET_TZ
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Madrid has no DST jump at midnight, keep a total function anyway
        .unwrap_or_else(|| midnight.and_utc())
}

/// Calendar day (market timezone) an instant falls on.
pub fn local_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&MARKET_TZ).date_naive()
}

/// Start of the hour containing `instant`.
pub fn start_of_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::hours(1))
        .unwrap_or(instant)
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Half-open `[start, end)` window covering `days` calendar days ending with `date`.
pub fn day_window(date: NaiveDate, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = date
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(date);
    (start_of_day(first), start_of_day(next_day(date)))
}

/// Instant of a local wall-clock hour, `None` if it does not exist (spring DST gap).
/// The repeated autumn hour resolves to its first occurrence.
pub fn local_hour(date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    local_hour_instants(date, hour).first().copied()
}

/// Every instant a local wall-clock hour maps to, oldest first.
///
/// Two on the autumn DST day for the repeated hour, none in the spring gap.
pub fn local_hour_instants(date: NaiveDate, hour: u32) -> Vec<DateTime<Utc>> {
    let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
        return Vec::new();
    };
    match MARKET_TZ.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => vec![dt.with_timezone(&Utc)],
        LocalResult::Ambiguous(first, second) => {
            vec![first.with_timezone(&Utc), second.with_timezone(&Utc)]
        }
        LocalResult::None => Vec::new(),
    }
}

/// Whether the given day has not started yet at `now`.
pub fn is_future_day(date: NaiveDate, now: DateTime<Utc>) -> bool {
    start_of_day(date) > now
}

pub fn format_hour(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&MARKET_TZ).format("%H:%M").to_string()
}

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Europe::Warsaw;
use rand::Rng;
use std::time::Duration;

/// Session window of the Catalyst market, Warsaw local time
const SESSION_OPEN: (u32, u32) = (8, 50);
const SESSION_CLOSE: (u32, u32) = (17, 10);

/// True when a fetch cycle should run at `now`
pub fn should_fetch(now: DateTime<Utc>, check_trading_hours: bool) -> bool {
    if !check_trading_hours {
        return true;
    }

    let local = now.with_timezone(&Warsaw);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let open = NaiveTime::from_hms_opt(SESSION_OPEN.0, SESSION_OPEN.1, 0).unwrap_or_default();
    let close = NaiveTime::from_hms_opt(SESSION_CLOSE.0, SESSION_CLOSE.1, 0).unwrap_or_default();
    let time = local.time();
    open <= time && time <= close
}

/// Random pause between cycles, bounds inclusive
pub fn next_delay(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let secs = rand::rng().random_range(min.as_secs()..=max.as_secs());
    Duration::from_secs(secs)
}

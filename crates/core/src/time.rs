//! Calendar helpers shared by the forecasting engines.

use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A whole number of days as a `chrono::Duration`.
pub fn days(n: i64) -> Duration {
    Duration::days(n)
}

/// Whole days from `earlier` to `later`, rounded to the nearest day.
///
/// Negative when `later` precedes `earlier`. Halves round away from zero.
pub fn days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    let millis = (later - earlier).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).round() as i64
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn days_between_rounds_to_nearest() {
        let now = t0();
        assert_eq!(days_between(now + days(10), now), 10);
        assert_eq!(days_between(now + Duration::hours(36), now), 2);
        assert_eq!(days_between(now + Duration::hours(35), now), 1);
        assert_eq!(days_between(now - days(20), now), -20);
    }

    #[test]
    fn round_to_one_decimal() {
        assert_eq!(round_to(28.0 / 14.0, 1), 2.0);
        assert_eq!(round_to(10.0 / 14.0, 1), 0.7);
    }

    proptest! {
        #[test]
        fn whole_day_offsets_are_exact(n in -400i64..400) {
            let now = t0();
            prop_assert_eq!(days_between(now + days(n), now), n);
        }
    }
}

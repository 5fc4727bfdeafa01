//! Age calculations from RFC 7234 §4.2.3.
//!
//! ```text
//! apparent_age          = max(0, response_time - date_value)
//! response_delay        = response_time - request_time
//! corrected_age_value   = age_value + response_delay
//! corrected_initial_age = max(apparent_age, corrected_age_value)
//! resident_time         = now - response_time
//! current_age           = corrected_initial_age + resident_time
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::httpcache::directives::MAX_DELTA_SECONDS;

/// `later - earlier`, clamped at zero.
fn elapsed(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

/// Seconds carried by an `Age` header; absent, unparseable and zero all read as 0.
///
/// Values past 2^31 seconds are clamped, as for any delta-seconds.
pub fn parse_age_header(value: Option<&str>) -> Duration {
    let Some(value) = value.map(str::trim) else {
        return Duration::ZERO;
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Duration::ZERO;
    }
    let secs = value
        .parse::<u64>()
        .map(|v| v.min(MAX_DELTA_SECONDS))
        .unwrap_or(MAX_DELTA_SECONDS);
    Duration::from_secs(secs)
}

/// Estimated age of a response at the moment it was received.
pub fn corrected_initial_age(
    response_time: DateTime<Utc>,
    date_value: DateTime<Utc>,
    request_time: DateTime<Utc>,
    age_value: Option<&str>,
) -> Duration {
    let apparent_age = elapsed(date_value, response_time);
    let response_delay = elapsed(request_time, response_time);
    let corrected_age_value = parse_age_header(age_value).saturating_add(response_delay);

    apparent_age.max(corrected_age_value)
}

/// Age of a stored response at `now`, in whole seconds rounded up.
pub fn current_age_at(
    response_time: DateTime<Utc>,
    corrected_initial_age: Duration,
    now: DateTime<Utc>,
) -> u64 {
    ceil_secs(corrected_initial_age.saturating_add(elapsed(response_time, now)))
}

/// Whole seconds, rounding any fraction up.
pub fn ceil_secs(age: Duration) -> u64 {
    age.as_secs()
        .saturating_add(u64::from(age.subsec_nanos() > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(secs: i64, millis: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap() + chrono::Duration::milliseconds(millis)
    }

    #[test]
    fn test_age_header_parsing() {
        assert_eq!(parse_age_header(None), Duration::ZERO);
        assert_eq!(parse_age_header(Some("")), Duration::ZERO);
        assert_eq!(parse_age_header(Some("0")), Duration::ZERO);
        assert_eq!(parse_age_header(Some("abc")), Duration::ZERO);
        assert_eq!(parse_age_header(Some("-5")), Duration::ZERO);
        assert_eq!(parse_age_header(Some(" 42 ")), Duration::from_secs(42));
    }

    #[test]
    fn test_huge_age_header_is_clamped() {
        let clamped = Duration::from_secs(1 << 31);
        assert_eq!(parse_age_header(Some("2147483649")), clamped);
        assert_eq!(parse_age_header(Some("18446744073709551615")), clamped);
        assert_eq!(parse_age_header(Some("99999999999999999999999")), clamped);

        let age = corrected_initial_age(at(1, 0), at(1, 0), at(0, 0), Some("18446744073709551615"));
        assert_eq!(age, clamped + Duration::from_secs(1));
        assert_eq!(current_age_at(at(1, 0), age, at(11, 0)), (1 << 31) + 11);
    }

    #[test]
    fn test_age_math_saturates() {
        assert_eq!(ceil_secs(Duration::MAX), u64::MAX);
        assert_eq!(current_age_at(at(0, 0), Duration::MAX, at(5, 0)), u64::MAX);
    }

    #[test]
    fn test_apparent_age_wins() {
        // Origin clock says the response was generated 10s before we got it
        let age = corrected_initial_age(at(10, 0), at(0, 0), at(9, 500), None);
        assert_eq!(age, Duration::from_secs(10));
    }

    #[test]
    fn test_corrected_age_value_wins() {
        let age = corrected_initial_age(at(2, 0), at(2, 0), at(1, 0), Some("30"));
        assert_eq!(age, Duration::from_secs(31));
    }

    #[test]
    fn test_date_in_future_clamps_apparent_age() {
        let age = corrected_initial_age(at(0, 0), at(100, 0), at(0, 0), None);
        assert_eq!(age, Duration::ZERO);
    }

    #[test]
    fn test_current_age_rounds_up() {
        let age = current_age_at(at(0, 0), Duration::from_millis(200), at(3, 0));
        assert_eq!(age, 4);

        let exact = current_age_at(at(0, 0), Duration::from_secs(2), at(3, 0));
        assert_eq!(exact, 5);
    }

    #[test]
    fn test_current_age_never_negative() {
        // Clock stepped backwards since the response was stored
        let age = current_age_at(at(10, 0), Duration::ZERO, at(5, 0));
        assert_eq!(age, 0);
    }

    proptest! {
        #[test]
        fn prop_current_age_is_monotonic(
            initial_ms in 0u64..100_000,
            t1_ms in 0i64..1_000_000,
            step_ms in 1i64..1_000_000
        ) {
            let stored = at(0, 0);
            let initial = Duration::from_millis(initial_ms);
            let first = current_age_at(stored, initial, at(0, t1_ms));
            let second = current_age_at(stored, initial, at(0, t1_ms + step_ms));

            prop_assert!(second >= first);

            let expected = Duration::from_millis(initial_ms + (t1_ms + step_ms) as u64);
            prop_assert_eq!(second, ceil_secs(expected));
        }
    }
}

use chrono::{DateTime, Duration, Utc};

use crate::error::Error;

/// Maps a requested instant to its canonical publication instant.
///
/// 1. `delta = requested - start_date`.
/// 2. Round `delta` to the nearest multiple of `frequency`, half-away from
///    zero (matching Go's `time.Duration.Round`, which the original oracle
///    this was ported from relies on).
/// 3. `publish = start_date + rounded_delta`.
/// 4. If `publish < requested`, add one `frequency` — the canonical instant
///    is the earliest multiple at or after `requested`.
/// 5. If `publish` is after `now + range`, fail with [`Error::InstantTooLate`].
///
/// Deterministic: for a fixed `(start_date, frequency, range)`, `publish`
/// depends only on `requested`. Calling this twice with the already-rounded
/// result as input returns the same instant (`schedule(schedule(t)) == schedule(t)`).
pub fn calculate_publish_date(
    requested: DateTime<Utc>,
    start_date: DateTime<Utc>,
    frequency: Duration,
    range: Duration,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, Error> {
    let diff = requested - start_date;
    let rounded = round_half_away(diff, frequency)?;
    let mut publish = start_date + rounded;

    if publish < requested {
        publish += frequency;
    }

    let upper = now + range;
    if publish > upper {
        return Err(Error::InstantTooLate(format!(
            "requested a DLC data publishing after {upper}, oracle's range ends there"
        )));
    }

    Ok(publish)
}

/// Rounds `diff` to the nearest multiple of `unit`, ties away from zero.
///
/// `diff` is `requested - start_date` and can in principle exceed the
/// ~292-year range `Duration::num_nanoseconds` can represent; such a request
/// is, by definition, past any sane `range`, so that overflow is reported as
/// [`Error::InstantTooLate`] rather than panicking.
fn round_half_away(diff: Duration, unit: Duration) -> Result<Duration, Error> {
    let diff_ns = diff.num_nanoseconds().ok_or_else(|| {
        Error::InstantTooLate("requested instant is too far from the asset's start date".into())
    })?;
    let unit_ns = unit.num_nanoseconds().expect("duration out of range");
    assert!(unit_ns > 0, "frequency must be positive");

    let remainder = diff_ns % unit_ns;
    if remainder == 0 {
        return Ok(diff);
    }

    let half = unit_ns - remainder.abs();
    let rounded_ns = if remainder.abs() >= half {
        if diff_ns > 0 {
            diff_ns - remainder + unit_ns
        } else {
            diff_ns - remainder - unit_ns
        }
    } else {
        diff_ns - remainder
    };

    Ok(Duration::nanoseconds(rounded_ns))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn dt(s: &str) -> DateTime<Utc> {
        Utc.datetime_from_str(s, "%Y-%m-%dT%H:%M:%SZ").unwrap()
    }

    #[test]
    fn scenario_1_rounds_up_to_next_hour() {
        let start = dt("2020-01-01T00:00:00Z");
        let requested = dt("2020-01-01T00:30:00Z");
        let publish = calculate_publish_date(
            requested,
            start,
            Duration::hours(1),
            Duration::days(3650),
            start,
        )
        .unwrap();
        assert_eq!(publish, dt("2020-01-01T01:00:00Z"));
    }

    #[test]
    fn rounds_down_when_below_half() {
        let start = dt("2020-01-01T00:00:00Z");
        let requested = dt("2020-01-01T00:20:00Z");
        let publish = calculate_publish_date(
            requested,
            start,
            Duration::hours(1),
            Duration::days(3650),
            start,
        )
        .unwrap();
        // rounds down to 00:00, which is before requested, so one frequency is added
        assert_eq!(publish, dt("2020-01-01T01:00:00Z"));
    }

    #[test]
    fn scenario_2_range_exceeded_fails() {
        let start = dt("2020-01-01T00:00:00Z");
        let now = dt("2020-01-01T00:00:00Z");
        let requested = dt("2020-01-03T00:00:00Z");
        let err = calculate_publish_date(requested, start, Duration::hours(1), Duration::days(1), now)
            .unwrap_err();
        assert_eq!(err.code(), "invalid-time-too-late");
    }

    #[test]
    fn far_future_request_fails_instead_of_panicking() {
        let start = dt("2020-01-01T00:00:00Z");
        let now = dt("2020-01-01T00:00:00Z");
        let requested = dt("2400-01-01T00:00:00Z");
        let err = calculate_publish_date(requested, start, Duration::hours(1), Duration::days(1), now)
            .unwrap_err();
        assert_eq!(err.code(), "invalid-time-too-late");
    }

    #[test]
    fn idempotent_on_already_canonical_instants() {
        let start = dt("2020-01-01T00:00:00Z");
        let once = calculate_publish_date(
            dt("2020-01-01T00:45:00Z"),
            start,
            Duration::hours(1),
            Duration::days(3650),
            start,
        )
        .unwrap();
        let twice =
            calculate_publish_date(once, start, Duration::hours(1), Duration::days(3650), start)
                .unwrap();
        assert_eq!(once, twice);
    }
}

//! Parses and re-encodes the ISO-8601 duration strings used for an asset's
//! `frequency` and `range` configuration, mirroring
//! `server-common-go/pkg/utils/iso8601`'s `EncodeDuration` counterpart from
//! the oracle this service's configuration format was distilled from.

use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(?P<weeks>\d+)W)?(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

/// Parses a subset of ISO-8601 durations: weeks, days, hours, minutes, and
/// (possibly fractional) seconds, e.g. `PT1H`, `P1D`, `P1DT12H30M`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let caps = DURATION_PATTERN
        .captures(s)
        .ok_or_else(|| format!("invalid ISO-8601 duration: {s}"))?;

    let field = |name: &str| -> i64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };
    let seconds_fraction: f64 = caps
        .name("seconds")
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    if s == "P" {
        return Err(format!("invalid ISO-8601 duration: {s}"));
    }

    let total_ms = field("weeks") * 7 * 24 * 3600 * 1000
        + field("days") * 24 * 3600 * 1000
        + field("hours") * 3600 * 1000
        + field("minutes") * 60 * 1000
        + (seconds_fraction * 1000.0).round() as i64;

    Ok(Duration::milliseconds(total_ms))
}

/// Re-encodes a `Duration` back to ISO-8601, used by the asset config
/// response view.
pub fn encode_duration(d: Duration) -> String {
    let mut total_seconds = d.num_seconds();
    if total_seconds == 0 {
        return "PT0S".to_string();
    }

    let days = total_seconds / 86_400;
    total_seconds -= days * 86_400;
    let hours = total_seconds / 3_600;
    total_seconds -= hours * 3_600;
    let minutes = total_seconds / 60;
    total_seconds -= minutes * 60;
    let seconds = total_seconds;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_one_hour() {
        assert_eq!(parse_duration("PT1H").unwrap(), Duration::hours(1));
    }

    #[test]
    fn parses_one_day() {
        assert_eq!(parse_duration("P1D").unwrap(), Duration::days(1));
    }

    #[test]
    fn parses_combined() {
        assert_eq!(
            parse_duration("P1DT12H30M").unwrap(),
            Duration::days(1) + Duration::hours(12) + Duration::minutes(30)
        );
    }

    #[test]
    fn roundtrips_through_encode() {
        let d = Duration::hours(1);
        assert_eq!(parse_duration(&encode_duration(d)).unwrap(), d);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("not-a-duration").is_err());
    }
}

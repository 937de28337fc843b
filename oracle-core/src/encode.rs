use crate::error::Error;

/// Converts a numeric feed value into the exact message bytes that get
/// signed. The returned string's bytewise stability across implementations
/// is a compatibility contract — do not reformat casually.
pub fn encode_outcome(
    event_kind: &str,
    params: &[String],
    feed_value: f64,
    has_decimals: bool,
) -> Result<String, Error> {
    match event_kind {
        "digits" => {
            if has_decimals {
                Ok(format!("{feed_value:.2}"))
            } else {
                Ok(round_half_to_even(feed_value).to_string())
            }
        }
        "above" => {
            let threshold: f64 = params
                .first()
                .ok_or_else(|| {
                    Error::UnsupportedEventType("above(T) requires a threshold parameter".into())
                })?
                .parse()
                .map_err(|_| Error::UnsupportedEventType("invalid above(T) threshold".into()))?;

            Ok(if threshold < feed_value {
                "true".to_string()
            } else {
                "false".to_string()
            })
        }
        other => Err(Error::UnsupportedEventType(other.to_string())),
    }
}

/// Rounds to the nearest integer, ties to even, matching scenario 4's
/// `12345.5 -> 12346`.
fn round_half_to_even(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor == 0.5 {
        let floor_i = floor as i64;
        if floor_i % 2 == 0 {
            floor_i
        } else {
            floor_i + 1
        }
    } else {
        value.round() as i64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scenario_3_two_fractional_digits() {
        let msg = encode_outcome("digits", &[], 12345.678, true).unwrap();
        assert_eq!(msg, "12345.68");
    }

    #[test]
    fn scenario_4_half_to_even_rounds_to_six() {
        let msg = encode_outcome("digits", &[], 12345.5, false).unwrap();
        assert_eq!(msg, "12346");
    }

    #[test]
    fn half_to_even_rounds_down_to_even() {
        let msg = encode_outcome("digits", &[], 12344.5, false).unwrap();
        assert_eq!(msg, "12344");
    }

    #[test]
    fn scenario_5_above_threshold_false() {
        let msg = encode_outcome("above", &["10000".to_string()], 9500.0, false).unwrap();
        assert_eq!(msg, "false");
    }

    #[test]
    fn scenario_5_above_threshold_true() {
        let msg = encode_outcome("above", &["10000".to_string()], 10500.0, false).unwrap();
        assert_eq!(msg, "true");
    }

    #[test]
    fn unsupported_kind_fails() {
        let err = encode_outcome("moonphase", &[], 1.0, false).unwrap_err();
        assert_eq!(err.code(), "unsupported-event-type");
    }
}

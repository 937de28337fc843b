use once_cell::sync::Lazy;
use regex::Regex;

/// The event kind used when a request omits `eventType`.
pub const DEFAULT_EVENT_KIND: &str = "digits";

static PARAM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\((\d*\.?\d*)\)").unwrap());

/// Decodes an event-type token like `digits`, `above(42.0)`, or a bare word
/// into its kind and positional parameters.
///
/// - empty -> `("digits", [])`.
/// - bare word `W` -> `(W, [])`.
/// - `W(ARG)` matching `(\w+)\((\d*\.?\d*)\)` -> `(W, [ARG])`.
/// - anything else -> treated as a bare word.
///
/// Unknown kinds are allowed here; they only fail once the outcome encoder
/// tries to use them.
pub fn parse_event_type(event_type: &str) -> (String, Vec<String>) {
    if event_type.is_empty() {
        return (DEFAULT_EVENT_KIND.to_string(), Vec::new());
    }

    match PARAM_PATTERN.captures(event_type) {
        Some(caps) => (caps[1].to_string(), vec![caps[2].to_string()]),
        None => (event_type.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_defaults_to_digits() {
        assert_eq!(parse_event_type(""), ("digits".to_string(), vec![]));
    }

    #[test]
    fn bare_word_has_no_params() {
        assert_eq!(parse_event_type("digits"), ("digits".to_string(), vec![]));
    }

    #[test]
    fn parameterized_kind_extracts_argument() {
        assert_eq!(
            parse_event_type("above(42.0)"),
            ("above".to_string(), vec!["42.0".to_string()])
        );
    }

    #[test]
    fn parameterized_kind_with_integer_argument() {
        assert_eq!(
            parse_event_type("above(10000)"),
            ("above".to_string(), vec!["10000".to_string()])
        );
    }

    #[test]
    fn unrecognized_text_falls_back_to_bare_word() {
        assert_eq!(
            parse_event_type("some-weird-token"),
            ("some-weird-token".to_string(), vec![])
        );
    }
}

//! Clock-style timestamps (`1:15:30`, `12:34`, `45`) and their second counts.

use std::sync::LazyLock;

use regex::Regex;

/// The strict pattern anchor text must match to become a seek control.
/// ASCII digits only.
static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,2}:[0-9]{2}(:[0-9]{2})?$").expect("timestamp regex")
});

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimecodeError {
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Whether `text` is a timestamp anchor label (`M:SS`, `MM:SS` or `H:MM:SS`).
pub fn is_timestamp(text: &str) -> bool {
    TIMESTAMP_REGEX.is_match(text)
}

/// Convert a timestamp into a count of seconds.
///
/// Accepts one to three `:`-separated numeric parts: `s`, `m:s` or `h:m:s`.
pub fn to_seconds(text: &str) -> Result<u64, TimecodeError> {
    let invalid = || TimecodeError::InvalidTimestamp(text.to_string());

    let parts = text
        .trim()
        .split(':')
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        [s] => (0, 0, *s),
        _ => return Err(invalid()),
    };
    h.checked_mul(3600)
        .and_then(|total| total.checked_add(m.checked_mul(60)?))
        .and_then(|total| total.checked_add(s))
        .ok_or_else(invalid)
}

/// Format a second count as `MM:SS`, or `HH:MM:SS` once it reaches an hour.
pub fn format_timestamp(seconds: u64) -> String {
    let (minutes, secs) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_each_shape() {
        assert_eq!(to_seconds("1:15:30"), Ok(4530));
        assert_eq!(to_seconds("1:15"), Ok(75));
        assert_eq!(to_seconds("45"), Ok(45));
        assert_eq!(to_seconds("12:34"), Ok(754));
        assert_eq!(to_seconds(" 0:00 "), Ok(0));
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in [
            "",
            "1:2:3:4",
            "a:10",
            "1::2",
            "-1:00",
            "1.5",
            "18446744073709551615:00:00",
            "0:18446744073709551615:00",
            "1:00:18446744073709551615",
        ] {
            assert_eq!(
                to_seconds(bad),
                Err(TimecodeError::InvalidTimestamp(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn strict_pattern() {
        assert!(is_timestamp("0:00"));
        assert!(is_timestamp("12:34"));
        assert!(is_timestamp("1:15:30"));
        assert!(!is_timestamp("123:45"));
        assert!(!is_timestamp("1:5"));
        assert!(!is_timestamp("45"));
        assert!(!is_timestamp(" 1:15"));
        assert!(!is_timestamp("Learn more"));
        assert!(!is_timestamp("١:٢٣"));
        assert!(!is_timestamp("１２:３４"));
    }

    #[test]
    fn formatting_matches_transcript_markers() {
        assert_eq!(format_timestamp(0), "00:00");
        assert_eq!(format_timestamp(75), "01:15");
        assert_eq!(format_timestamp(4530), "01:15:30");
    }

    #[test]
    fn formatted_timestamps_convert_back() {
        for seconds in [0, 59, 60, 754, 3599, 3600, 4530] {
            let text = format_timestamp(seconds);
            assert!(is_timestamp(&text), "{text}");
            assert_eq!(to_seconds(&text), Ok(seconds));
        }
    }

    #[test]
    fn error_message_names_the_input() {
        let err = to_seconds("x").unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
        assert!(err.to_string().contains("\"x\""));
    }
}

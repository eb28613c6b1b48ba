//! Timestamp codec: play-time offsets <-> `mm:ss` / `hh:mm:ss`.

use crate::error::MediaError;

/// Format a play-time offset for display.
///
/// The input is rounded to the nearest whole second; negative and non-finite
/// values render as `00:00`. Hours are only shown when non-zero.
pub fn encode(total_seconds: f64) -> String {
    let total = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds.round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Parse `mm:ss` or `hh:mm:ss` into whole seconds.
///
/// Fields must be non-empty runs of ASCII digits; fields are not range-checked
/// (`90:00` is 5400 seconds).
pub fn decode(text: &str) -> Result<u64, MediaError> {
    let invalid = || MediaError::InvalidTimestamp {
        text: text.to_string(),
    };

    let fields = text
        .trim()
        .split(':')
        .map(|field| {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            field.parse::<u64>().ok()
        })
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(invalid)?;

    let (hours, minutes, seconds) = match fields.as_slice() {
        [mm, ss] => (0, *mm, *ss),
        [hh, mm, ss] => (*hh, *mm, *ss),
        _ => return Err(invalid()),
    };

    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_values() {
        assert_eq!(encode(0.0), "00:00");
        assert_eq!(encode(59.4), "00:59");
        assert_eq!(encode(59.6), "01:00");
        assert_eq!(encode(3661.0), "01:01:01");
        assert_eq!(encode(-3.0), "00:00");
        assert_eq!(encode(f64::NAN), "00:00");
    }

    #[test]
    fn decode_known_values() {
        assert_eq!(decode("01:02:03").unwrap(), 3723);
        assert_eq!(decode("5:00").unwrap(), 300);
        assert_eq!(decode(" 00:07 ").unwrap(), 7);
        assert_eq!(decode("90:00").unwrap(), 5400);
    }

    #[test]
    fn decode_rejects_malformed_text() {
        for text in ["abc", "1:2:3:4", "", "12", "1::2", "1:-2", "+1:02", "1:2a"] {
            assert!(
                matches!(decode(text), Err(MediaError::InvalidTimestamp { .. })),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn decode_rejects_overflow() {
        assert!(decode("99999999999999999999:00").is_err());
        assert!(decode(&format!("{}:00:00", u64::MAX)).is_err());
    }

    #[test]
    fn encode_then_decode_matches_rounded_input() {
        for x in [0.0, 0.49, 1.5, 59.5, 600.2, 3599.7, 3600.0, 86_399.0, 360_000.4] {
            assert_eq!(decode(&encode(x)).unwrap(), x.round() as u64, "x = {x}");
        }
    }

    #[test]
    fn decode_encode_decode_is_stable() {
        for text in ["00:00", "5:00", "59:59", "1:00:00", "12:34:56", "100:00"] {
            let seconds = decode(text).unwrap();
            assert_eq!(decode(&encode(seconds as f64)).unwrap(), seconds);
        }
    }
}

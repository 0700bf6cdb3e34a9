//! Record line parser
//!
//! Splits a record on its six separators and decodes each field. Numeric
//! decoding is locale independent: `.` is the only decimal point and no
//! digit grouping is accepted.

use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;

use super::{ParseError, SensorReading, FIELD_COUNT, FIELD_NAMES};

/// Longest record accepted, in bytes
pub const MAX_RECORD_LEN: usize = 256;

/// How numeric fields that fail to decode are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumericPolicy {
    /// Decode the leading number and fall back to zero, like the firmware's
    /// `toInt()`/`toFloat()`
    #[default]
    CoerceToZero,
    /// Reject the record when a numeric field is not a clean number
    Strict,
}

/// Decodes raw record lines into [`SensorReading`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser {
    policy: NumericPolicy,
}

impl LineParser {
    /// Create a parser with the given numeric policy
    pub fn new(policy: NumericPolicy) -> Self {
        Self { policy }
    }

    /// The numeric policy in effect
    pub fn policy(&self) -> NumericPolicy {
        self.policy
    }

    /// Parse one record
    ///
    /// `line` is expected to be trimmed already. Anything after the sixth
    /// separator belongs to the last field.
    pub fn parse(&self, line: &str) -> Result<SensorReading, ParseError> {
        tracing::debug!("parsing record: {line:?}");

        if line.len() > MAX_RECORD_LEN {
            return Err(ParseError::RecordTooLong {
                len: line.len(),
                max: MAX_RECORD_LEN,
            });
        }

        let fields = split_fields(line)
            .ok_or_else(|| ParseError::MalformedRecord(line.to_string()))?;

        Ok(SensorReading {
            temperature: self.decimal(0, fields[0])?,
            heart_rate: self.integer(1, fields[1])?,
            spo2: self.integer(2, fields[2])?,
            ecg_status: fields[3].to_string(),
            steps: self.integer(4, fields[4])?,
            bp_systolic: self.integer(5, fields[5])?,
            bp_diastolic: self.integer(6, fields[6])?,
        })
    }

    fn integer(&self, index: usize, raw: &str) -> Result<i32, ParseError> {
        match self.policy {
            NumericPolicy::CoerceToZero => Ok(coerce_integer(raw)),
            NumericPolicy::Strict => {
                strict_integer(raw).ok_or_else(|| invalid(index, raw))
            }
        }
    }

    fn decimal(&self, index: usize, raw: &str) -> Result<f64, ParseError> {
        match self.policy {
            NumericPolicy::CoerceToZero => Ok(coerce_decimal(raw)),
            NumericPolicy::Strict => {
                strict_decimal(raw).ok_or_else(|| invalid(index, raw))
            }
        }
    }
}

fn invalid(index: usize, raw: &str) -> ParseError {
    ParseError::InvalidNumber {
        field: FIELD_NAMES[index],
        value: raw.to_string(),
    }
}

/// Locate the six separators in order, each search starting right after the
/// previous one. The first field must be non-empty.
fn split_fields(line: &str) -> Option<[&str; FIELD_COUNT]> {
    let mut fields = [""; FIELD_COUNT];
    let mut start = 0;

    for slot in fields.iter_mut().take(FIELD_COUNT - 1) {
        let offset = line[start..].find(',')?;
        *slot = &line[start..start + offset];
        start += offset + 1;
    }
    fields[FIELD_COUNT - 1] = &line[start..];

    if fields[0].is_empty() {
        return None;
    }
    Some(fields)
}

/// Leading number of `s`: optional sign, digits and, when `fraction` is set,
/// one `.digits` part. `None` when no digit is present.
fn numeric_prefix(s: &str, fraction: bool) -> Option<&str> {
    let bytes = s.as_bytes();
    let digits_from = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if fraction && bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    (int_digits + frac_digits > 0).then(|| &s[..end])
}

fn parse_i32_saturating(number: &str) -> i32 {
    match number.parse::<i32>() {
        Ok(value) => value,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i32::MAX,
            IntErrorKind::NegOverflow => i32::MIN,
            _ => 0,
        },
    }
}

fn coerce_integer(raw: &str) -> i32 {
    numeric_prefix(raw.trim_start(), false)
        .map(parse_i32_saturating)
        .unwrap_or(0)
}

fn coerce_decimal(raw: &str) -> f64 {
    numeric_prefix(raw.trim_start(), true)
        .and_then(|number| number.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn strict_integer(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    numeric_prefix(trimmed, false)
        .filter(|number| number.len() == trimmed.len())
        .and_then(|number| number.parse::<i32>().ok())
}

fn strict_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    numeric_prefix(trimmed, true)
        .filter(|number| number.len() == trimmed.len())
        .and_then(|number| number.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields_exact() {
        let fields = split_fields("36.6,72,98,Normal,1500,120,80").unwrap();
        assert_eq!(fields, ["36.6", "72", "98", "Normal", "1500", "120", "80"]);
    }

    #[test]
    fn test_split_fields_extra_separators_stay_in_last_field() {
        let fields = split_fields("1,2,3,4,5,6,7,8").unwrap();
        assert_eq!(fields[6], "7,8");
    }

    #[test]
    fn test_split_fields_rejects_missing_separators() {
        assert!(split_fields("1,2,3,4,5,6").is_none());
        assert!(split_fields("1,2,3").is_none());
        assert!(split_fields("").is_none());
        assert!(split_fields(",2,3,4,5,6,7").is_none());
    }

    #[test]
    fn test_numeric_prefix() {
        assert_eq!(numeric_prefix("72", false), Some("72"));
        assert_eq!(numeric_prefix("-5abc", false), Some("-5"));
        assert_eq!(numeric_prefix("36.6", false), Some("36"));
        assert_eq!(numeric_prefix("36.6", true), Some("36.6"));
        assert_eq!(numeric_prefix(".5", true), Some(".5"));
        assert_eq!(numeric_prefix("5.", true), Some("5."));
        assert_eq!(numeric_prefix("-", false), None);
        assert_eq!(numeric_prefix(".", true), None);
        assert_eq!(numeric_prefix("abc", true), None);
        assert_eq!(numeric_prefix("", true), None);
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce_integer("72"), 72);
        assert_eq!(coerce_integer(" 72"), 72);
        assert_eq!(coerce_integer("72bpm"), 72);
        assert_eq!(coerce_integer("9.8"), 9);
        assert_eq!(coerce_integer("abc"), 0);
        assert_eq!(coerce_integer(""), 0);
        assert_eq!(coerce_integer("99999999999"), i32::MAX);
        assert_eq!(coerce_integer("-99999999999"), i32::MIN);
    }

    #[test]
    fn test_coerce_decimal_is_locale_independent() {
        assert_eq!(coerce_decimal("36.6"), 36.6);
        assert_eq!(coerce_decimal("36,6"), 36.0);
        assert_eq!(coerce_decimal("nan"), 0.0);
        assert_eq!(coerce_decimal("inf"), 0.0);
    }

    #[test]
    fn test_strict_numbers() {
        assert_eq!(strict_integer(" 80 "), Some(80));
        assert_eq!(strict_integer("80x"), None);
        assert_eq!(strict_integer(""), None);
        assert_eq!(strict_integer("99999999999"), None);
        assert_eq!(strict_decimal("-0.5"), Some(-0.5));
        assert_eq!(strict_decimal("1e3"), None);
    }
}

// SPDX-License-Identifier: MIT

//! Numeric input accepted by the typed stream writers.
//!
//! Writers take anything convertible into [`Numeric`]: native integers and
//! floats, or a string holding a number (`"42"`, `"-7.5"`, `"0x1F"`,
//! `"1e3"`, `"Infinity"`). Strings that do not hold a number are rejected
//! with [`WireError::NotANumber`].

use crate::error::WireError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric<'a> {
    Int(i128),
    Float(f64),
    Text(&'a str),
}

impl Numeric<'_> {
    /// Resolve to an integer, truncating toward zero.
    ///
    /// Callers narrow the result to the target width by keeping the low
    /// bits, so out-of-range values wrap the way a typed-array store does.
    pub fn to_integer(&self) -> Result<i128, WireError> {
        match *self {
            Numeric::Int(value) => Ok(value),
            Numeric::Float(value) => float_to_integer(value, &value.to_string()),
            Numeric::Text(text) => match parse_integer(text) {
                Some(value) => Ok(value),
                None => float_to_integer(parse_float(text)?, text),
            },
        }
    }

    pub fn to_float(&self) -> Result<f64, WireError> {
        match *self {
            Numeric::Int(value) => Ok(value as f64),
            Numeric::Float(value) => Ok(value),
            Numeric::Text(text) => match parse_integer(text) {
                Some(value) => Ok(value as f64),
                None => parse_float(text),
            },
        }
    }
}

fn float_to_integer(value: f64, original: &str) -> Result<i128, WireError> {
    if !value.is_finite() {
        return Err(WireError::not_a_number(original));
    }
    Ok(value.trunc() as i128)
}

/// Decimal or radix-prefixed integer literal.
fn parse_integer(text: &str) -> Option<i128> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    // from_str_radix takes its own sign, which must not follow a prefix
    let radix_digits = |prefix_lower: &str, prefix_upper: &str| {
        digits
            .strip_prefix(prefix_lower)
            .or_else(|| digits.strip_prefix(prefix_upper))
            .filter(|rest| !rest.starts_with(['+', '-']))
    };

    let magnitude = if let Some(hex) = radix_digits("0x", "0X") {
        i128::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = radix_digits("0o", "0O") {
        i128::from_str_radix(octal, 8).ok()?
    } else if let Some(binary) = radix_digits("0b", "0B") {
        i128::from_str_radix(binary, 2).ok()?
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<i128>().ok()?
    } else {
        return None;
    };

    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(text: &str) -> Result<f64, WireError> {
    let trimmed = text.trim();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    if unsigned == "Infinity" {
        return Ok(if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    // Rust's float grammar also takes "nan"/"inf"; only plain decimal notation is a number here
    let decimal_notation = !unsigned.is_empty()
        && unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal_notation {
        return Err(WireError::not_a_number(text));
    }

    trimmed
        .parse::<f64>()
        .map_err(|_| WireError::not_a_number(text))
}

impl<'a> From<&'a str> for Numeric<'a> {
    fn from(value: &'a str) -> Self {
        Numeric::Text(value)
    }
}

impl<'a> From<&'a String> for Numeric<'a> {
    fn from(value: &'a String) -> Self {
        Numeric::Text(value.as_str())
    }
}

impl From<f64> for Numeric<'_> {
    fn from(value: f64) -> Self {
        Numeric::Float(value)
    }
}

impl From<f32> for Numeric<'_> {
    fn from(value: f32) -> Self {
        Numeric::Float(f64::from(value))
    }
}

impl From<i128> for Numeric<'_> {
    fn from(value: i128) -> Self {
        Numeric::Int(value)
    }
}

impl From<u64> for Numeric<'_> {
    fn from(value: u64) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<i64> for Numeric<'_> {
    fn from(value: i64) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<usize> for Numeric<'_> {
    fn from(value: usize) -> Self {
        Numeric::Int(value as i128)
    }
}

impl From<u32> for Numeric<'_> {
    fn from(value: u32) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<i32> for Numeric<'_> {
    fn from(value: i32) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<u16> for Numeric<'_> {
    fn from(value: u16) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<i16> for Numeric<'_> {
    fn from(value: i16) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<u8> for Numeric<'_> {
    fn from(value: u8) -> Self {
        Numeric::Int(i128::from(value))
    }
}

impl From<i8> for Numeric<'_> {
    fn from(value: i8) -> Self {
        Numeric::Int(i128::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coercion_from_text() {
        assert_eq!(Numeric::from("42").to_integer().unwrap(), 42);
        assert_eq!(Numeric::from(" -17 ").to_integer().unwrap(), -17);
        assert_eq!(Numeric::from("+8").to_integer().unwrap(), 8);
        assert_eq!(Numeric::from("0x1F").to_integer().unwrap(), 31);
        assert_eq!(Numeric::from("0b101").to_integer().unwrap(), 5);
        assert_eq!(Numeric::from("0o17").to_integer().unwrap(), 15);
        assert_eq!(Numeric::from("12.9").to_integer().unwrap(), 12);
        assert_eq!(Numeric::from("-12.9").to_integer().unwrap(), -12);
        assert_eq!(Numeric::from("1e3").to_integer().unwrap(), 1000);
    }

    #[test]
    fn test_rejects_non_numbers() {
        for input in [
            "", "   ", "abc", "12abc", "nan", "NaN", "inf", "0xZZ", "--1", "0x-5", "-0x-5", "0b+1",
        ] {
            let result = Numeric::from(input).to_float();
            assert!(
                matches!(result, Err(WireError::NotANumber(_))),
                "expected '{input}' to be rejected"
            );
        }
    }

    #[test]
    fn test_sign_only_before_radix_prefix() {
        assert_eq!(Numeric::from("-0x10").to_integer().unwrap(), -16);
        assert!(Numeric::from("0x-5").to_integer().is_err());
        assert!(Numeric::from("-0x-5").to_integer().is_err());
        assert!(Numeric::from("0o+7").to_integer().is_err());
    }

    #[test]
    fn test_non_finite_integer_is_rejected() {
        assert!(Numeric::from(f64::NAN).to_integer().is_err());
        assert!(Numeric::from("Infinity").to_integer().is_err());
        assert_eq!(
            Numeric::from("-Infinity").to_float().unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(Numeric::from(3u8).to_float().unwrap(), 3.0);
        assert_eq!(Numeric::from("2.5").to_float().unwrap(), 2.5);
        assert_eq!(Numeric::from(1.5f32).to_float().unwrap(), 1.5);
        assert_eq!(Numeric::from(".5").to_float().unwrap(), 0.5);
    }
}

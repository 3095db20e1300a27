use std::num::{IntErrorKind, ParseIntError};

use super::error::LiteralError;
use super::layout;

/// Parse a single-byte numeral into a signed 8-bit value.
///
/// Forms are tried in order: `0b` + 8 binary digits, `0x` + 2 hex digits,
/// a signed base-10 value (leading `-`), then an unsigned base-10 value.
/// Unsigned results above 127 wrap to their two's-complement value.
///
/// # Examples
/// ```
/// use pmbus_core::parse_byte;
///
/// assert_eq!(parse_byte("0x7F").unwrap(), 127);
/// assert_eq!(parse_byte("0x80").unwrap(), -128);
/// assert_eq!(parse_byte("255").unwrap(), -1);
/// assert_eq!(parse_byte("-1").unwrap(), -1);
/// ```
///
/// # Errors
/// Returns `LiteralError` naming the attempted form and the offending text.
pub fn parse_byte(text: &str) -> Result<i8, LiteralError> {
    if text.starts_with(layout::BINARY_PREFIX) {
        if text.chars().count() != layout::BINARY_LEN {
            return Err(LiteralError::InvalidBinaryLength {
                text: text.to_string(),
            });
        }
        return parse_radix(text, layout::BINARY_PREFIX.len(), 2).map(to_signed);
    }
    if text.starts_with(layout::HEX_PREFIX) {
        if text.chars().count() != layout::HEX_LEN {
            return Err(LiteralError::InvalidHexLength {
                text: text.to_string(),
            });
        }
        return parse_radix(text, layout::HEX_PREFIX.len(), 16).map(to_signed);
    }
    if text.starts_with(layout::SIGN_PREFIX) {
        let value = parse_decimal(text, || LiteralError::SignedOutOfRange {
            text: text.to_string(),
        })?;
        if !layout::SIGNED_RANGE.contains(&value) {
            return Err(LiteralError::SignedOutOfRange {
                text: text.to_string(),
            });
        }
        return Ok(value as i8);
    }

    let value = parse_decimal(text, || LiteralError::UnsignedOutOfRange {
        text: text.to_string(),
    })?;
    if !layout::UNSIGNED_RANGE.contains(&value) {
        return Err(LiteralError::UnsignedOutOfRange {
            text: text.to_string(),
        });
    }
    Ok(to_signed(value as u8))
}

/// Reinterpret an unsigned byte as two's-complement signed.
pub fn to_signed(value: u8) -> i8 {
    value as i8
}

/// Reinterpret a signed byte as its unsigned bit pattern.
pub fn to_unsigned(value: i8) -> u8 {
    value as u8
}

/// Render the unsigned bit pattern of `value` as lower-case hex (`0x5`, `0xfe`).
pub fn format_hex(value: i8) -> String {
    format!("{:#x}", to_unsigned(value))
}

/// Render the unsigned bit pattern of `value` as `0b` plus eight digits.
pub fn format_binary(value: i8) -> String {
    format!("0b{:08b}", to_unsigned(value))
}

fn parse_radix(text: &str, prefix_len: usize, radix: u32) -> Result<u8, LiteralError> {
    let digits = &text[prefix_len..];
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(not_numerical(text));
    }
    u8::from_str_radix(digits, radix).map_err(|_| not_numerical(text))
}

fn parse_decimal(
    text: &str,
    out_of_range: impl FnOnce() -> LiteralError,
) -> Result<i64, LiteralError> {
    text.parse::<i64>().map_err(|err: ParseIntError| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(),
        _ => not_numerical(text),
    })
}

fn not_numerical(text: &str) -> LiteralError {
    LiteralError::NotNumerical {
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_binary, format_hex, parse_byte, to_signed, to_unsigned};
    use crate::literal::error::LiteralError;

    #[test]
    fn parse_hex_forms() {
        assert_eq!(parse_byte("0x7F").unwrap(), 127);
        assert_eq!(parse_byte("0x80").unwrap(), -128);
        assert_eq!(parse_byte("0x00").unwrap(), 0);
        assert_eq!(parse_byte("0xff").unwrap(), -1);
    }

    #[test]
    fn parse_binary_forms() {
        assert_eq!(parse_byte("0b11111111").unwrap(), -1);
        assert_eq!(parse_byte("0b00100001").unwrap(), 0x21);
    }

    #[test]
    fn parse_decimal_forms() {
        assert_eq!(parse_byte("-1").unwrap(), -1);
        assert_eq!(parse_byte("-128").unwrap(), -128);
        assert_eq!(parse_byte("255").unwrap(), -1);
        assert_eq!(parse_byte("7").unwrap(), 7);
        assert_eq!(parse_byte("127").unwrap(), 127);
    }

    #[test]
    fn binary_length_is_checked() {
        let err = parse_byte("0b1111111").unwrap_err();
        assert_eq!(
            err,
            LiteralError::InvalidBinaryLength {
                text: "0b1111111".to_string()
            }
        );
    }

    #[test]
    fn hex_length_is_checked() {
        let err = parse_byte("0x1").unwrap_err();
        assert!(matches!(err, LiteralError::InvalidHexLength { .. }));
        assert!(err.to_string().contains("0x1"));
    }

    #[test]
    fn lengths_count_characters() {
        assert_eq!(
            parse_byte("0x\u{e9}").unwrap_err(),
            LiteralError::InvalidHexLength {
                text: "0x\u{e9}".to_string()
            }
        );
        assert!(matches!(
            parse_byte("0b111111\u{e9}").unwrap_err(),
            LiteralError::InvalidBinaryLength { .. }
        ));
        assert!(matches!(
            parse_byte("0x\u{e9}1").unwrap_err(),
            LiteralError::NotNumerical { .. }
        ));
    }

    #[test]
    fn ranges_are_checked() {
        assert!(matches!(
            parse_byte("-129").unwrap_err(),
            LiteralError::SignedOutOfRange { .. }
        ));
        assert!(matches!(
            parse_byte("256").unwrap_err(),
            LiteralError::UnsignedOutOfRange { .. }
        ));
        assert!(matches!(
            parse_byte("99999999999999999999999").unwrap_err(),
            LiteralError::UnsignedOutOfRange { .. }
        ));
    }

    #[test]
    fn non_numbers_are_rejected() {
        for text in ["abc", "", "-", "0xZZ", "0b1111111x", "0b+1111111"] {
            let err = parse_byte(text).unwrap_err();
            assert!(
                matches!(err, LiteralError::NotNumerical { .. }),
                "{text}: {err:?}"
            );
        }
    }

    #[test]
    fn sign_reinterpretation_round_trips() {
        for value in 0..=255u8 {
            assert_eq!(to_unsigned(to_signed(value)), value);
            assert_eq!(to_signed(to_unsigned(to_signed(value))), to_signed(value));
        }
    }

    #[test]
    fn formats_unsigned_patterns() {
        assert_eq!(format_hex(0x21), "0x21");
        assert_eq!(format_hex(5), "0x5");
        assert_eq!(format_hex(-1), "0xff");
        assert_eq!(format_binary(-128), "0b10000000");
    }
}

use crate::command::{CommandDescriptor, LinearFormat};

use super::bits;
use super::error::LinearError;
use super::layout;

/// Encode `value` into the two wire bytes `[lower, upper]` of a linear command.
///
/// The integer part (truncated toward zero) fills the high mantissa bits and
/// the fractional part is expanded bit by bit into the `-exponent` low
/// mantissa bits. The command's fixed exponent is written into the exponent
/// field.
///
/// # Examples
/// ```
/// use pmbus_core::{decode, encode, parse_descriptor};
///
/// let row = ["VOUT_COMMAND", "0x21", "T", "T", "2", "T", "-3", "11", "5", "F"];
/// let descriptor = parse_descriptor(&row).unwrap();
/// let bytes = encode(&descriptor, 34.0).unwrap();
/// assert_eq!(bytes, [0x10, 0xE9]);
/// assert_eq!(decode(&descriptor, bytes).unwrap(), 34.0);
/// ```
///
/// # Errors
/// Returns `LinearError` when the command is not linear, the value is not
/// finite, or a field cannot hold its part of the value.
pub fn encode(
    descriptor: &CommandDescriptor,
    value: f64,
) -> Result<[u8; layout::WORD_BYTES], LinearError> {
    let command = descriptor.name();
    let format = linear_format(descriptor)?;
    if !value.is_finite() {
        return Err(LinearError::NotFinite {
            command: command.to_string(),
            value,
        });
    }

    let fraction_bits = format.fraction_bits();
    let integer_bits = format
        .mantissa_bits
        .checked_sub(fraction_bits)
        .ok_or_else(|| LinearError::FractionTooWide {
            command: command.to_string(),
            fraction_bits,
            mantissa_bits: format.mantissa_bits,
        })?;

    let integer = value.trunc();
    let integer_field = pack_integer(integer, integer_bits, format.signed).ok_or_else(|| {
        LinearError::ValueOutOfRange {
            command: command.to_string(),
            value,
            integer_bits,
            signed: format.signed,
        }
    })?;
    let fraction_field = expand_fraction(value - integer, fraction_bits);
    let mantissa_field = (integer_field << fraction_bits) | fraction_field;

    let exponent_field = exponent_field(command, format)?;
    let word = (exponent_field << format.mantissa_bits) | mantissa_field;
    let word = (word & bits::field_mask(layout::WORD_BITS)) as u16;

    let [lower, upper] = word.to_le_bytes();
    let mut bytes = [0u8; layout::WORD_BYTES];
    bytes[layout::LOWER_BYTE_INDEX] = lower;
    bytes[layout::UPPER_BYTE_INDEX] = upper;
    Ok(bytes)
}

/// Decode the wire bytes `[lower, upper]` of a linear command into a value.
///
/// When the command has an exponent field, its content must equal the
/// command's fixed exponent. The fixed exponent is always used for scaling.
///
/// # Errors
/// Returns `LinearError::ExponentMismatch` when the received exponent
/// differs, or `LinearError::NotLinear` for raw commands.
pub fn decode(
    descriptor: &CommandDescriptor,
    bytes: [u8; layout::WORD_BYTES],
) -> Result<f64, LinearError> {
    let command = descriptor.name();
    let format = linear_format(descriptor)?;

    let word = u16::from_le_bytes([
        bytes[layout::LOWER_BYTE_INDEX],
        bytes[layout::UPPER_BYTE_INDEX],
    ]) as u32;

    if format.exponent_bits > 0 {
        let field = word >> format.mantissa_bits;
        let actual = bits::unpack_signed(field, format.exponent_bits);
        if actual != i64::from(format.exponent) {
            return Err(LinearError::ExponentMismatch {
                command: command.to_string(),
                expected: format.exponent,
                actual,
            });
        }
    }

    let mantissa = if format.signed {
        bits::unpack_signed(word, format.mantissa_bits)
    } else {
        bits::unpack_unsigned(word, format.mantissa_bits)
    };
    Ok(mantissa as f64 * 2f64.powi(format.exponent))
}

fn linear_format(descriptor: &CommandDescriptor) -> Result<&LinearFormat, LinearError> {
    descriptor
        .linear_format()
        .ok_or_else(|| LinearError::NotLinear {
            command: descriptor.name().to_string(),
        })
}

fn pack_integer(integer: f64, width: u32, signed: bool) -> Option<u32> {
    let (min, max) = bits::field_range(width, signed);
    if integer < min as f64 || integer > max as f64 {
        return None;
    }
    bits::pack(integer as i64, width, signed)
}

/// Binary expansion of `fraction` into `width` bits, most significant first.
///
/// Negative remainders emit zero bits.
fn expand_fraction(fraction: f64, width: u32) -> u32 {
    let mut remaining = fraction;
    let mut weight = layout::FIRST_FRACTION_WEIGHT;
    let mut field = 0u32;
    for _ in 0..width {
        field <<= 1;
        if remaining >= weight {
            field |= 1;
            remaining -= weight;
        }
        weight /= 2.0;
    }
    field
}

fn exponent_field(command: &str, format: &LinearFormat) -> Result<u32, LinearError> {
    if format.exponent_bits == 0 {
        return Ok(0);
    }
    bits::pack(i64::from(format.exponent), format.exponent_bits, true).ok_or_else(|| {
        LinearError::ExponentOutOfRange {
            command: command.to_string(),
            exponent: format.exponent,
            exponent_bits: format.exponent_bits,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, expand_fraction};
    use crate::command::{CommandDescriptor, parse_descriptor};
    use crate::linear::error::LinearError;

    fn linear(
        exponent: i32,
        mantissa_bits: u32,
        exponent_bits: u32,
        signed: bool,
    ) -> CommandDescriptor {
        let exponent = exponent.to_string();
        let mantissa_bits = mantissa_bits.to_string();
        let exponent_bits = exponent_bits.to_string();
        let signed = if signed { "T" } else { "F" };
        parse_descriptor(&[
            "VOUT_COMMAND",
            "0x21",
            "T",
            "T",
            "2",
            "T",
            &exponent,
            &mantissa_bits,
            &exponent_bits,
            signed,
        ])
        .unwrap()
    }

    #[test]
    fn encode_integer_value() {
        let descriptor = linear(-3, 11, 5, false);
        assert_eq!(encode(&descriptor, 34.0).unwrap(), [0x10, 0xE9]);
        assert_eq!(decode(&descriptor, [0x10, 0xE9]).unwrap(), 34.0);
    }

    #[test]
    fn encode_fractional_value() {
        let descriptor = linear(-3, 11, 5, false);
        assert_eq!(encode(&descriptor, 1.625).unwrap(), [0x0D, 0xE8]);
        assert_eq!(decode(&descriptor, [0x0D, 0xE8]).unwrap(), 1.625);
    }

    #[test]
    fn inexact_fraction_is_truncated() {
        let descriptor = linear(-3, 11, 5, false);
        let bytes = encode(&descriptor, 2.3).unwrap();
        assert_eq!(decode(&descriptor, bytes).unwrap(), 2.25);
    }

    #[test]
    fn encode_signed_negative_value() {
        let descriptor = linear(-2, 11, 5, true);
        let bytes = encode(&descriptor, -5.0).unwrap();
        assert_eq!(bytes, [0xEC, 0xF7]);
        assert_eq!(decode(&descriptor, bytes).unwrap(), -5.0);
    }

    #[test]
    fn implied_exponent_uses_full_word() {
        let descriptor = linear(-9, 16, 0, false);
        let bytes = encode(&descriptor, 12.0).unwrap();
        assert_eq!(bytes, [0x00, 0x18]);
        assert_eq!(decode(&descriptor, bytes).unwrap(), 12.0);
    }

    #[test]
    fn round_trip_representable_values() {
        let descriptor = linear(-3, 11, 5, false);
        for value in [0.0, 0.125, 34.0, 100.5, 255.875] {
            let bytes = encode(&descriptor, value).unwrap();
            assert_eq!(decode(&descriptor, bytes).unwrap(), value);
        }
        let descriptor = linear(0, 11, 5, true);
        for value in [-1024.0, -1.0, 0.0, 1023.0] {
            let bytes = encode(&descriptor, value).unwrap();
            assert_eq!(decode(&descriptor, bytes).unwrap(), value);
        }
    }

    #[test]
    fn value_out_of_range_is_rejected() {
        let descriptor = linear(-3, 11, 5, false);
        assert!(encode(&descriptor, 255.0).is_ok());
        assert!(matches!(
            encode(&descriptor, 256.0),
            Err(LinearError::ValueOutOfRange {
                integer_bits: 8,
                signed: false,
                ..
            })
        ));
        assert!(matches!(
            encode(&descriptor, -1.0),
            Err(LinearError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let descriptor = linear(-3, 11, 5, false);
        assert!(matches!(
            encode(&descriptor, f64::NAN),
            Err(LinearError::NotFinite { .. })
        ));
        assert!(matches!(
            encode(&descriptor, f64::INFINITY),
            Err(LinearError::NotFinite { .. })
        ));
    }

    #[test]
    fn fraction_wider_than_mantissa_is_rejected() {
        let descriptor = linear(-12, 11, 5, false);
        assert!(matches!(
            encode(&descriptor, 1.0),
            Err(LinearError::FractionTooWide {
                fraction_bits: 12,
                mantissa_bits: 11,
                ..
            })
        ));
    }

    #[test]
    fn exponent_wider_than_field_is_rejected() {
        let descriptor = linear(-9, 12, 4, false);
        assert!(matches!(
            encode(&descriptor, 1.0),
            Err(LinearError::ExponentOutOfRange { exponent: -9, .. })
        ));
    }

    #[test]
    fn decode_rejects_exponent_mismatch() {
        let descriptor = linear(-3, 11, 5, false);
        let err = decode(&descriptor, [0x10, 0xF1]).unwrap_err();
        assert_eq!(
            err,
            LinearError::ExponentMismatch {
                command: "VOUT_COMMAND".to_string(),
                expected: -3,
                actual: -2,
            }
        );
    }

    #[test]
    fn raw_commands_are_not_linear() {
        let descriptor =
            parse_descriptor(&["OPERATION", "0x01", "T", "T", "1", "F", "0", "0", "0", "F"])
                .unwrap();
        assert!(matches!(
            encode(&descriptor, 1.0),
            Err(LinearError::NotLinear { .. })
        ));
        assert!(matches!(
            decode(&descriptor, [0, 0]),
            Err(LinearError::NotLinear { .. })
        ));
    }

    #[test]
    fn fraction_expansion_is_msb_first() {
        assert_eq!(expand_fraction(0.625, 3), 0b101);
        assert_eq!(expand_fraction(0.75, 4), 0b1100);
        assert_eq!(expand_fraction(-0.5, 3), 0);
        assert_eq!(expand_fraction(0.9, 0), 0);
    }
}

use serde::Serialize;

use crate::literal::{format_hex, parse_byte};

use super::error::DescriptorError;
use super::layout;
use super::reader::FieldReader;

/// Parameters of a linear-format register.
///
/// The exponent is a per-command constant; the encoded word always carries
/// this exponent and decoding rejects words that carry a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinearFormat {
    /// Fixed power-of-two scale (always `<= 0`).
    pub exponent: i32,
    /// Width of the mantissa field.
    pub mantissa_bits: u32,
    /// Width of the exponent field (0 when the exponent is implied).
    pub exponent_bits: u32,
    /// Whether the mantissa is two's complement.
    pub signed: bool,
}

impl LinearFormat {
    /// Number of mantissa bits that hold the fractional part.
    pub fn fraction_bits(&self) -> u32 {
        self.exponent.unsigned_abs()
    }
}

/// Data representation of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataFormat {
    /// Bytes are passed through unchanged.
    Raw,
    /// Two-byte linear word.
    Linear(LinearFormat),
}

/// Protocol metadata for one device register, validated at load time.
///
/// # Examples
/// ```
/// use pmbus_core::parse_descriptor;
///
/// let row = ["VOUT_COMMAND", "0x21", "T", "T", "2", "T", "-3", "11", "5", "F"];
/// let descriptor = parse_descriptor(&row).unwrap();
/// assert_eq!(descriptor.address_hex(), "0x21");
/// assert!(descriptor.linear_format().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    name: String,
    address: i8,
    address_hex: String,
    read_enabled: bool,
    write_enabled: bool,
    num_data_bytes: usize,
    format: DataFormat,
}

impl CommandDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register address as parsed from the table (signed byte).
    pub fn address(&self) -> i8 {
        self.address
    }

    /// Register address as sent on the bus.
    pub fn register(&self) -> u8 {
        self.address as u8
    }

    pub fn address_hex(&self) -> &str {
        &self.address_hex
    }

    pub fn is_read_enabled(&self) -> bool {
        self.read_enabled
    }

    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    pub fn num_data_bytes(&self) -> usize {
        self.num_data_bytes
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn is_linear(&self) -> bool {
        matches!(self.format, DataFormat::Linear(_))
    }

    pub fn linear_format(&self) -> Option<&LinearFormat> {
        match &self.format {
            DataFormat::Linear(format) => Some(format),
            DataFormat::Raw => None,
        }
    }
}

/// Build a descriptor from the ten tokens of one table row.
///
/// Tokens are: name, address, read flag, write flag, byte count, linear
/// flag, exponent, mantissa bits, exponent bits, signed flag. The four
/// linear-only tokens are ignored unless the linear flag is `T`.
///
/// # Errors
/// Returns `DescriptorError` for the first token that fails validation.
pub fn parse_descriptor(fields: &[&str]) -> Result<CommandDescriptor, DescriptorError> {
    let reader = FieldReader::new(fields);
    reader.require_count(layout::FIELD_COUNT)?;
    let command = reader.command();
    if command.trim().is_empty() {
        return Err(DescriptorError::EmptyName);
    }

    let address_token = reader.read_token(layout::ADDRESS_INDEX)?;
    let address = parse_byte(address_token).map_err(|source| DescriptorError::Address {
        command: command.to_string(),
        source,
    })?;

    let read_enabled = reader.read_bool(layout::READ_ENABLED_INDEX)?;
    let write_enabled = reader.read_bool(layout::WRITE_ENABLED_INDEX)?;

    let num_data_bytes = reader.read_int(layout::NUM_DATA_BYTES_INDEX)?;
    let num_data_bytes =
        usize::try_from(num_data_bytes).map_err(|_| DescriptorError::InvalidNumBytes {
            command: command.to_string(),
            value: num_data_bytes,
        })?;

    let format = if reader.read_bool(layout::LINEAR_INDEX)? {
        DataFormat::Linear(read_linear_format(&reader)?)
    } else {
        DataFormat::Raw
    };

    Ok(CommandDescriptor {
        name: command.to_string(),
        address,
        address_hex: format_hex(address),
        read_enabled,
        write_enabled,
        num_data_bytes,
        format,
    })
}

fn read_linear_format(reader: &FieldReader<'_>) -> Result<LinearFormat, DescriptorError> {
    let command = reader.command();

    let exponent = reader.read_int(layout::EXPONENT_INDEX)?;
    if exponent > 0 {
        return Err(DescriptorError::InvalidExponent {
            command: command.to_string(),
            value: exponent,
        });
    }
    let exponent = i32::try_from(exponent).map_err(|_| DescriptorError::InvalidExponent {
        command: command.to_string(),
        value: exponent,
    })?;

    let mantissa_bits = reader.read_int(layout::MANTISSA_BITS_INDEX)?;
    let exponent_bits = reader.read_int(layout::EXPONENT_BITS_INDEX)?;
    if mantissa_bits < 0
        || exponent_bits < 0
        || mantissa_bits.checked_add(exponent_bits) != Some(layout::LINEAR_WORD_BITS)
    {
        return Err(DescriptorError::InvalidBitWidths {
            command: command.to_string(),
            mantissa_bits,
            exponent_bits,
        });
    }

    let signed = reader.read_bool(layout::DATA_SIGNED_INDEX)?;

    Ok(LinearFormat {
        exponent,
        mantissa_bits: mantissa_bits as u32,
        exponent_bits: exponent_bits as u32,
        signed,
    })
}

use thiserror::Error;

use crate::literal::LiteralError;

use super::table::CommandKey;

/// Errors raised while validating one command row.
///
/// # Examples
/// ```
/// use pmbus_core::{DescriptorError, parse_descriptor};
///
/// let err = parse_descriptor(&["VOUT_COMMAND", "0x21"]).unwrap_err();
/// assert!(matches!(err, DescriptorError::ParameterCount { expected: 10, actual: 2, .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("invalid number of parameters for {command}; expected {expected}, but received {actual}")]
    ParameterCount {
        command: String,
        expected: usize,
        actual: usize,
    },
    #[error("missing command name")]
    EmptyName,
    #[error("invalid address for {command} command: {source}")]
    Address {
        command: String,
        #[source]
        source: LiteralError,
    },
    #[error("invalid boolean parameter {token:?} for {command} command; must be T or F")]
    InvalidBoolean { command: String, token: String },
    #[error("invalid integer parameter {token:?} for {command} command; must be a base 10 integer")]
    InvalidInteger { command: String, token: String },
    #[error("invalid number of bytes {value} for {command} command; must be a non-negative integer")]
    InvalidNumBytes { command: String, value: i64 },
    #[error("invalid exponent {value} for {command} command; must be a non-positive integer")]
    InvalidExponent { command: String, value: i64 },
    #[error(
        "invalid bit widths for {command} command (mantissa {mantissa_bits}, exponent {exponent_bits}); both must be non-negative and sum to 16"
    )]
    InvalidBitWidths {
        command: String,
        mantissa_bits: i64,
        exponent_bits: i64,
    },
}

/// Errors raised while loading or querying a command table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read command table {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}:{line}: {source}")]
    Row {
        origin: String,
        line: usize,
        #[source]
        source: DescriptorError,
    },
    #[error("{origin}:{line}: duplicate command key {key}")]
    DuplicateKey {
        origin: String,
        line: usize,
        key: CommandKey,
    },
    #[error("{key} command does not exist in table from {origin}")]
    CommandNotFound { key: CommandKey, origin: String },
}

use thiserror::Error;

/// Errors returned when a byte numeral cannot be parsed.
///
/// # Examples
/// ```
/// use pmbus_core::{LiteralError, parse_byte};
///
/// let err = parse_byte("0x1").unwrap_err();
/// assert!(matches!(err, LiteralError::InvalidHexLength { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("invalid binary byte string {text}; must have 8 bits")]
    InvalidBinaryLength { text: String },
    #[error("invalid hex byte string {text}; must have 2 hex digits")]
    InvalidHexLength { text: String },
    #[error("invalid signed int byte string {text}; must be in [-128, 127]")]
    SignedOutOfRange { text: String },
    #[error("invalid unsigned int byte string {text}; must be in [0, 255]")]
    UnsignedOutOfRange { text: String },
    #[error("invalid byte string {text}; must be a binary, hex, int, or uint byte number")]
    NotNumerical { text: String },
}

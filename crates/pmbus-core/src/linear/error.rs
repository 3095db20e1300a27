use thiserror::Error;

/// Errors returned by the linear codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinearError {
    #[error("{command} does not use the linear data format")]
    NotLinear { command: String },
    #[error("{command}: value {value} is not a finite number")]
    NotFinite { command: String, value: f64 },
    #[error(
        "{command}: exponent needs {fraction_bits} fractional bits but the mantissa has only {mantissa_bits}"
    )]
    FractionTooWide {
        command: String,
        fraction_bits: u32,
        mantissa_bits: u32,
    },
    #[error("{command}: value {value} does not fit in {integer_bits} integer bits (signed: {signed})")]
    ValueOutOfRange {
        command: String,
        value: f64,
        integer_bits: u32,
        signed: bool,
    },
    #[error("{command}: exponent {exponent} does not fit in {exponent_bits} exponent bits")]
    ExponentOutOfRange {
        command: String,
        exponent: i32,
        exponent_bits: u32,
    },
    #[error("{command} expects exponent = {expected}, but read exponent = {actual}")]
    ExponentMismatch {
        command: String,
        expected: i32,
        actual: i64,
    },
}

//! Single-byte numeral parsing.
//!
//! Addresses and raw byte arguments are written as one of four textual
//! forms: `0b` followed by eight binary digits, `0x` followed by two hex
//! digits, a base-10 signed value with a leading `-`, or a base-10 unsigned
//! value. Every form resolves to a signed 8-bit integer; unsigned values
//! above 127 are reinterpreted as two's complement.
//!
//! Prefixes and digit counts live in `layout`; the conversion rules live in
//! `parser`.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::LiteralError;
pub use parser::{format_binary, format_hex, parse_byte, to_signed, to_unsigned};

//! Linear-format codec.
//!
//! A linear word is 16 bits wide: an exponent field followed by a mantissa
//! field, most significant bit first, with `value = mantissa * 2^exponent`.
//! The exponent is fixed per command. Encoding always writes the command's
//! exponent; decoding checks the received exponent field against it and
//! rejects mismatches instead of rescaling.
//!
//! On the wire the word is two bytes, least significant byte first.
//! Field widths and byte order live in `layout`; two's-complement field
//! packing lives in `bits`.

pub mod bits;
pub mod codec;
pub mod error;
pub mod layout;

pub use codec::{decode, encode};
pub use error::LinearError;

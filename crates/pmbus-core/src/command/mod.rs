//! Command descriptors and the command table.
//!
//! A command table is comma-separated text: one header line followed by one
//! row per register with ten fields (name, address, read flag, write flag,
//! byte count, linear flag, exponent, mantissa bits, exponent bits, signed
//! flag). Rows are validated into immutable `CommandDescriptor`s and indexed
//! both by name and by register address.
//!
//! Field positions and tokens live in `layout`; `reader` wraps token access
//! so every error names the offending command.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;
pub mod table;

pub use error::{DescriptorError, TableError};
pub use parser::{CommandDescriptor, DataFormat, LinearFormat, parse_descriptor};
pub use table::{CommandKey, CommandTable, DuplicatePolicy, ShadowedKey};

//! PMBus command toolkit core.
//!
//! Devices are described by command tables: per-register metadata (address,
//! permissions, byte count, data format) loaded from comma-separated text.
//! Values for linear-format registers are converted to and from the two-byte
//! wire word by the `linear` codec. A `DeviceSession` ties a table to a
//! device address and a `Transport`, checking permissions and byte counts
//! before anything reaches the bus.
//!
//! Module layout follows one convention throughout: `layout` holds field
//! positions and constants, `reader`/`bits` give checked access to tokens and
//! bit fields, `parser`/`codec` build the values, and `error` carries one
//! error enum per component.
//!
//! Invariants:
//! - A loaded table is read-only; name and address lookups of one row yield
//!   the same descriptor.
//! - Linear words always carry the command's fixed exponent.
//! - No transfer happens unless the command exists, is permitted and the
//!   payload has exactly the declared byte count.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//!
//! use pmbus_core::{DeviceRegistry, DeviceSession, MemoryTransport};
//!
//! let registry = DeviceRegistry::with_builtin();
//! let table = Arc::new(registry.load_table("q48sc12050", None)?);
//! let mut brick = DeviceSession::new(0x29, table, MemoryTransport::new(0x29));
//! brick.write_value("VOUT_COMMAND", 12.0)?;
//! assert_eq!(brick.transport().writes()[0].data, vec![0x00, 0x18]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod command;
pub mod config;
pub mod linear;
pub mod literal;
pub mod registry;
pub mod session;
pub mod transport;

pub use command::{
    CommandDescriptor, CommandKey, CommandTable, DataFormat, DescriptorError, DuplicatePolicy,
    LinearFormat, ShadowedKey, TableError, parse_descriptor,
};
pub use config::{BusConfig, ConfigError, DeviceConfig};
pub use linear::{LinearError, decode, encode};
pub use literal::{LiteralError, format_binary, format_hex, parse_byte, to_signed, to_unsigned};
pub use registry::{Bus, DeviceRegistry, RegistryError};
pub use session::{DeviceSession, Payload, Reading, SessionError};
pub use transport::{MemoryTransport, Transport, TransportError};

/// Current listing schema version.
pub const LISTING_VERSION: u32 = 1;

/// Machine-readable view of a command table.
///
/// # Examples
/// ```
/// use pmbus_core::{CommandTable, make_listing};
///
/// let table = CommandTable::parse("header\nOPERATION,0x01,T,T,1,F,0,0,0,F\n", "inline")?;
/// let listing = make_listing(&table);
/// assert_eq!(listing.listing_version, pmbus_core::LISTING_VERSION);
/// assert_eq!(listing.commands[0].address, "0x1");
/// # Ok::<(), pmbus_core::TableError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableListing {
    /// Listing schema version (not the binary version).
    pub listing_version: u32,
    pub tool: ToolInfo,
    pub table: TableInfo,
    /// Reachable commands ordered by register address.
    pub commands: Vec<CommandSummary>,
}

/// Tool metadata embedded in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Where a table came from and what loading it replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub origin: String,
    pub commands: usize,
    /// Keys taken over by later rows, in load order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shadowed: Vec<ShadowedSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowedSummary {
    pub key: String,
    pub line: usize,
}

/// One command row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSummary {
    pub name: String,
    /// Register address as lower-case hex (`0x8b`).
    pub address: String,
    pub read: bool,
    pub write: bool,
    pub num_data_bytes: usize,
    /// Present for linear commands only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear: Option<LinearSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSummary {
    pub exponent: i32,
    pub mantissa_bits: u32,
    pub exponent_bits: u32,
    pub signed: bool,
}

/// Build the listing of a loaded table.
pub fn make_listing(table: &CommandTable) -> TableListing {
    TableListing {
        listing_version: LISTING_VERSION,
        tool: ToolInfo {
            name: "pmbus".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        table: TableInfo {
            origin: table.origin().to_string(),
            commands: table.len(),
            shadowed: table
                .shadowed_keys()
                .iter()
                .map(|shadowed| ShadowedSummary {
                    key: shadowed.key.to_string(),
                    line: shadowed.line,
                })
                .collect(),
        },
        commands: table.iter().map(summarize).collect(),
    }
}

fn summarize(descriptor: &CommandDescriptor) -> CommandSummary {
    CommandSummary {
        name: descriptor.name().to_string(),
        address: descriptor.address_hex().to_string(),
        read: descriptor.is_read_enabled(),
        write: descriptor.is_write_enabled(),
        num_data_bytes: descriptor.num_data_bytes(),
        linear: descriptor.linear_format().map(|format| LinearSummary {
            exponent: format.exponent,
            mantissa_bits: format.mantissa_bits,
            exponent_bits: format.exponent_bits,
            signed: format.signed,
        }),
    }
}

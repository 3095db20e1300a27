use thiserror::Error;

use crate::command::TableError;
use crate::literal::format_hex;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{device_type} is not a valid device type; choose from {known}")]
    UnknownType { device_type: String, known: String },
    #[error("device type {device_type} needs a command table path")]
    MissingTable { device_type: String },
    #[error("device type {device_type} has a built-in command table; remove the table path")]
    UnexpectedTable { device_type: String },
    #[error("{} is not a valid device address; addresses are 7-bit (0x0..0x7f)", hex(.address))]
    InvalidDeviceAddress { address: u8 },
    #[error("device with address {} is already configured", hex(.address))]
    DuplicateDevice { address: u8 },
    #[error("{} is not a configured device address; choose from [{configured}]", hex(.address))]
    UnknownDevice { address: u8, configured: String },
    #[error("{index} is not a valid device index; {}", index_range(.configured))]
    InvalidIndex { index: usize, configured: usize },
    #[error(transparent)]
    Table(#[from] TableError),
}

fn hex(value: &u8) -> String {
    format_hex(*value as i8)
}

fn index_range(configured: &usize) -> String {
    match configured {
        0 => "no devices are configured".to_string(),
        n => format!("valid indices are [0, {}]", n - 1),
    }
}

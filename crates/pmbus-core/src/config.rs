//! Bus configuration files.
//!
//! A configuration lists the devices on one bus as JSON:
//!
//! ```json
//! { "devices": [ { "type": "q48sc12050", "address": "0x29" },
//!                { "type": "other", "address": "0x30", "table": "custom.csv" } ] }
//! ```
//!
//! Addresses use the byte-literal grammar and must be 7-bit. Relative table
//! paths are resolved against the directory holding the configuration file.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::command::CommandTable;
use crate::literal::{LiteralError, parse_byte, to_unsigned};
use crate::registry::{Bus, DeviceRegistry, RegistryError, check_device_address};
use crate::session::DeviceSession;
use crate::transport::Transport;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("device address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: LiteralError,
    },
    #[error("device {address}: {source}")]
    Device {
        address: String,
        #[source]
        source: RegistryError,
    },
}

/// One configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Device type tag, as registered in a `DeviceRegistry`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Device address literal (`0x29`, `41`, `0b00101001`).
    pub address: String,
    /// Command table path for types without a built-in table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<PathBuf>,
}

impl DeviceConfig {
    /// Parse and range-check the address literal.
    pub fn device_address(&self) -> Result<u8, ConfigError> {
        let address = parse_byte(&self.address).map_err(|source| ConfigError::Address {
            address: self.address.clone(),
            source,
        })?;
        check_device_address(to_unsigned(address)).map_err(|source| ConfigError::Device {
            address: self.address.clone(),
            source,
        })
    }
}

/// Devices on one bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    pub devices: Vec<DeviceConfig>,
}

impl BusConfig {
    /// Read a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, &path.display().to_string(), base)
    }

    /// Parse configuration text; relative table paths are joined onto `base`.
    pub fn parse(text: &str, origin: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: BusConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;
        for device in &mut config.devices {
            if let Some(table) = device.table.as_mut() {
                if table.is_relative() {
                    *table = base.join(&*table);
                }
            }
        }
        Ok(config)
    }

    /// Create one session per device, each with its own transport.
    ///
    /// Devices of the same type and table path share one loaded table.
    ///
    /// # Errors
    /// The first device that fails (bad address, unknown type, table error,
    /// duplicate address) aborts the build.
    pub fn build_bus<T, F>(
        &self,
        registry: &DeviceRegistry,
        mut transport: F,
    ) -> Result<Bus<T>, ConfigError>
    where
        T: Transport,
        F: FnMut(u8) -> T,
    {
        let mut tables: HashMap<(String, Option<PathBuf>), Arc<CommandTable>> = HashMap::new();
        let mut bus = Bus::new();

        for device in &self.devices {
            let address = device.device_address()?;
            let wrap = |source| ConfigError::Device {
                address: device.address.clone(),
                source,
            };

            let key = (device.device_type.clone(), device.table.clone());
            let table = match tables.get(&key) {
                Some(table) => Arc::clone(table),
                None => {
                    let table = registry
                        .load_table(&device.device_type, device.table.as_deref())
                        .map_err(wrap)?;
                    let table = Arc::new(table);
                    tables.insert(key, Arc::clone(&table));
                    table
                }
            };

            bus.add(DeviceSession::new(address, table, transport(address)))
                .map_err(wrap)?;
        }

        debug!(devices = bus.len(), tables = tables.len(), "bus configured");
        Ok(bus)
    }
}

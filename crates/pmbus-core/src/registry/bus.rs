use std::collections::BTreeMap;

use tracing::debug;

use crate::literal::format_hex;
use crate::session::DeviceSession;
use crate::transport::Transport;

use super::error::RegistryError;
use super::MAX_DEVICE_ADDRESS;

/// Device sessions keyed by device address, in address order.
#[derive(Debug)]
pub struct Bus<T> {
    devices: BTreeMap<u8, DeviceSession<T>>,
}

impl<T: Transport> Bus<T> {
    pub fn new() -> Self {
        Bus {
            devices: BTreeMap::new(),
        }
    }

    /// Add a session under its device address.
    ///
    /// # Errors
    /// `InvalidDeviceAddress` outside the 7-bit range, `DuplicateDevice` when
    /// the address is taken.
    pub fn add(&mut self, session: DeviceSession<T>) -> Result<(), RegistryError> {
        let address = check_device_address(session.address())?;
        if self.devices.contains_key(&address) {
            return Err(RegistryError::DuplicateDevice { address });
        }
        debug!(
            device = address,
            origin = session.table().origin(),
            "device added"
        );
        self.devices.insert(address, session);
        Ok(())
    }

    pub fn remove(&mut self, address: u8) -> Result<DeviceSession<T>, RegistryError> {
        match self.devices.remove(&address) {
            Some(session) => Ok(session),
            None => Err(self.unknown(address)),
        }
    }

    pub fn get(&self, address: u8) -> Result<&DeviceSession<T>, RegistryError> {
        self.devices
            .get(&address)
            .ok_or_else(|| self.unknown(address))
    }

    pub fn get_mut(&mut self, address: u8) -> Result<&mut DeviceSession<T>, RegistryError> {
        if !self.devices.contains_key(&address) {
            return Err(self.unknown(address));
        }
        self.devices
            .get_mut(&address)
            .ok_or(RegistryError::UnknownDevice {
                address,
                configured: String::new(),
            })
    }

    /// Address of the `index`-th device in address order.
    pub fn address_at(&self, index: usize) -> Result<u8, RegistryError> {
        self.devices
            .keys()
            .nth(index)
            .copied()
            .ok_or(RegistryError::InvalidIndex {
                index,
                configured: self.devices.len(),
            })
    }

    pub fn addresses(&self) -> impl Iterator<Item = u8> + '_ {
        self.devices.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceSession<T>> + '_ {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn unknown(&self, address: u8) -> RegistryError {
        let configured = self
            .devices
            .keys()
            .map(|&address| format_hex(address as i8))
            .collect::<Vec<_>>()
            .join(", ");
        RegistryError::UnknownDevice {
            address,
            configured,
        }
    }
}

impl<T: Transport> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept only 7-bit device addresses.
pub fn check_device_address(address: u8) -> Result<u8, RegistryError> {
    if address > MAX_DEVICE_ADDRESS {
        return Err(RegistryError::InvalidDeviceAddress { address });
    }
    Ok(address)
}

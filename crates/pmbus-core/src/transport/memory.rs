use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use super::Transport;
use super::error::TransportError;

/// One `write_block` call as seen by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWrite {
    pub register: u8,
    pub data: Vec<u8>,
}

/// In-memory register file answering a single device address.
///
/// Writes are logged and stored per register; reads return the stored bytes
/// unchanged, or `count` zero bytes for a register never written. Requests
/// for any other device address are not acknowledged.
///
/// # Examples
/// ```
/// use pmbus_core::{MemoryTransport, Transport};
///
/// let mut bus = MemoryTransport::new(0x29);
/// bus.write_block(0x29, 0x21, &[0x10, 0xE9]).unwrap();
/// assert_eq!(bus.read_block(0x29, 0x21, 2).unwrap(), vec![0x10, 0xE9]);
/// assert!(bus.read_block(0x30, 0x21, 2).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    device: u8,
    registers: BTreeMap<u8, Vec<u8>>,
    writes: Vec<BlockWrite>,
    /// Failures returned by the next transfers, oldest first.
    failures: VecDeque<String>,
    responding: bool,
}

impl MemoryTransport {
    pub fn new(device: u8) -> Self {
        MemoryTransport {
            device,
            registers: BTreeMap::new(),
            writes: Vec::new(),
            failures: VecDeque::new(),
            responding: true,
        }
    }

    /// Preload a register, as if the device had produced the bytes itself.
    pub fn with_register(mut self, register: u8, bytes: &[u8]) -> Self {
        self.set_register(register, bytes);
        self
    }

    pub fn set_register(&mut self, register: u8, bytes: &[u8]) {
        self.registers.insert(register, bytes.to_vec());
    }

    pub fn register(&self, register: u8) -> Option<&[u8]> {
        self.registers.get(&register).map(Vec::as_slice)
    }

    pub fn device(&self) -> u8 {
        self.device
    }

    /// Every write received so far, in order.
    pub fn writes(&self) -> &[BlockWrite] {
        &self.writes
    }

    /// Make the next transfer fail with a bus fault carrying `message`.
    ///
    /// Calls queue up: each failure is consumed by exactly one transfer.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.failures.push_back(message.into());
    }

    /// When `false`, every transfer is answered with a NACK.
    pub fn set_responding(&mut self, responding: bool) {
        self.responding = responding;
    }

    fn check(&mut self, device: u8, register: u8) -> Result<(), TransportError> {
        if device != self.device || !self.responding {
            return Err(TransportError::Nack { device, register });
        }
        if let Some(message) = self.failures.pop_front() {
            return Err(TransportError::Bus(message));
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn write_block(
        &mut self,
        device: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.check(device, register)?;
        trace!(device, register, len = data.len(), "memory write");
        self.writes.push(BlockWrite {
            register,
            data: data.to_vec(),
        });
        if !data.is_empty() {
            self.registers.insert(register, data.to_vec());
        }
        Ok(())
    }

    fn read_block(
        &mut self,
        device: u8,
        register: u8,
        count: usize,
    ) -> Result<Vec<u8>, TransportError> {
        self.check(device, register)?;
        let bytes = self
            .registers
            .get(&register)
            .cloned()
            .unwrap_or_else(|| vec![0; count]);
        trace!(device, register, len = bytes.len(), "memory read");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockWrite, MemoryTransport};
    use crate::transport::{Transport, TransportError};

    #[test]
    fn writes_are_logged_and_stored() {
        let mut bus = MemoryTransport::new(0x29);
        bus.write_block(0x29, 0x01, &[0x80]).unwrap();
        bus.write_block(0x29, 0x03, &[]).unwrap();

        assert_eq!(
            bus.writes(),
            &[
                BlockWrite {
                    register: 0x01,
                    data: vec![0x80],
                },
                BlockWrite {
                    register: 0x03,
                    data: vec![],
                },
            ]
        );
        assert_eq!(bus.register(0x01), Some(&[0x80][..]));
        // a bare command leaves no register content behind
        assert_eq!(bus.register(0x03), None);
    }

    #[test]
    fn unwritten_registers_read_as_zero() {
        let mut bus = MemoryTransport::new(0x29);
        assert_eq!(bus.read_block(0x29, 0x8B, 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn preloaded_bytes_are_returned_unchanged() {
        let mut bus = MemoryTransport::new(0x29).with_register(0x8B, &[1, 2, 3]);
        assert_eq!(bus.read_block(0x29, 0x8B, 2).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn other_devices_are_not_acknowledged() {
        let mut bus = MemoryTransport::new(0x29);
        let err = bus.write_block(0x30, 0x01, &[0]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Nack {
                device: 0x30,
                register: 0x01
            }
        ));
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn injected_failures_are_consumed_in_order() {
        let mut bus = MemoryTransport::new(0x29);
        bus.fail_next("arbitration lost");
        let err = bus.read_block(0x29, 0x8B, 2).unwrap_err();
        assert_eq!(err.to_string(), "bus fault: arbitration lost");
        assert!(bus.read_block(0x29, 0x8B, 2).is_ok());
    }

    #[test]
    fn silent_device_nacks() {
        let mut bus = MemoryTransport::new(0x29);
        bus.set_responding(false);
        assert!(matches!(
            bus.read_block(0x29, 0x8B, 2),
            Err(TransportError::Nack { .. })
        ));
    }
}

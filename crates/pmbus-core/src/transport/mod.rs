//! Block transfers to a device register.
//!
//! [`Transport`] is the only seam between device sessions and the bus. A
//! session resolves the command, validates and encodes the payload, then
//! hands the register address and data bytes to `write_block` (or asks
//! `read_block` for a byte count). Bytes travel in wire order, LSByte first.
//!
//! [`MemoryTransport`] is an in-process register file used by tests and by
//! the CLI's scripted runs.

pub mod error;
pub mod memory;

pub use error::TransportError;
pub use memory::MemoryTransport;

/// Synchronous register-level access to devices on one bus.
pub trait Transport {
    /// Write `data` to `register` of `device`.
    ///
    /// An empty `data` slice is a bare command ("send byte").
    fn write_block(
        &mut self,
        device: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Read `count` bytes from `register` of `device`.
    fn read_block(
        &mut self,
        device: u8,
        register: u8,
        count: usize,
    ) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_block(
        &mut self,
        device: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        (**self).write_block(device, register, data)
    }

    fn read_block(
        &mut self,
        device: u8,
        register: u8,
        count: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_block(device, register, count)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_block(
        &mut self,
        device: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        (**self).write_block(device, register, data)
    }

    fn read_block(
        &mut self,
        device: u8,
        register: u8,
        count: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_block(device, register, count)
    }
}

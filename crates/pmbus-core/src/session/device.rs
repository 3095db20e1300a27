use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::command::{CommandDescriptor, CommandKey, CommandTable};
use crate::linear::{self, layout::WORD_BYTES};
use crate::transport::Transport;

use super::error::SessionError;

/// Data for a write.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Real value, encoded with the command's linear format.
    Value(f64),
    /// Bytes in wire order (LSByte first), sent unchanged.
    Raw(Vec<u8>),
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Value(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(bytes.to_vec())
    }
}

/// Result of a read: a decoded value for linear commands, bytes otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Value(f64),
    Raw(Vec<u8>),
}

/// Command-level access to one device.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use pmbus_core::{CommandTable, DeviceSession, MemoryTransport};
///
/// let text = "header\nVOUT_COMMAND,0x21,T,T,2,T,-3,11,5,F\n";
/// let table = Arc::new(CommandTable::parse(text, "inline")?);
/// let mut session = DeviceSession::new(0x29, table, MemoryTransport::new(0x29));
/// session.write_value("VOUT_COMMAND", 34.0)?;
/// assert_eq!(session.read_value("VOUT_COMMAND")?, 34.0);
/// # Ok::<(), pmbus_core::SessionError>(())
/// ```
#[derive(Debug)]
pub struct DeviceSession<T> {
    address: u8,
    table: Arc<CommandTable>,
    transport: T,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(address: u8, table: Arc<CommandTable>, transport: T) -> Self {
        DeviceSession {
            address,
            table,
            transport,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write a command. Zero-byte commands take `Payload::Raw(vec![])`.
    ///
    /// # Errors
    /// Fails before any transfer when the command is unknown, not writable,
    /// or the payload does not produce exactly `num_data_bytes` bytes.
    pub fn write<K: Into<CommandKey>>(
        &mut self,
        key: K,
        payload: impl Into<Payload>,
    ) -> Result<(), SessionError> {
        let table = Arc::clone(&self.table);
        let descriptor = table.get(key)?;
        if !descriptor.is_write_enabled() {
            return Err(SessionError::WriteNotPermitted {
                command: descriptor.name().to_string(),
            });
        }

        let bytes = match payload.into() {
            Payload::Value(value) => {
                if !descriptor.is_linear() {
                    return Err(SessionError::ValueOnRawCommand {
                        command: descriptor.name().to_string(),
                    });
                }
                linear::encode(descriptor, value)?.to_vec()
            }
            Payload::Raw(bytes) => bytes,
        };
        check_count(descriptor, bytes.len())?;

        debug!(
            device = self.address,
            command = descriptor.name(),
            register = descriptor.register(),
            bytes = ?bytes,
            "write"
        );
        self.transport
            .write_block(self.address, descriptor.register(), &bytes)?;
        Ok(())
    }

    /// Read a command, decoding linear commands into a value.
    pub fn read<K: Into<CommandKey>>(&mut self, key: K) -> Result<Reading, SessionError> {
        let table = Arc::clone(&self.table);
        let descriptor = table.get(key)?;
        let bytes = self.transfer_in(descriptor)?;
        if descriptor.is_linear() {
            Ok(Reading::Value(decode_word(descriptor, &bytes)?))
        } else {
            Ok(Reading::Raw(bytes))
        }
    }

    pub fn write_value<K: Into<CommandKey>>(
        &mut self,
        key: K,
        value: f64,
    ) -> Result<(), SessionError> {
        self.write(key, Payload::Value(value))
    }

    pub fn write_bytes<K: Into<CommandKey>>(
        &mut self,
        key: K,
        bytes: &[u8],
    ) -> Result<(), SessionError> {
        self.write(key, Payload::Raw(bytes.to_vec()))
    }

    /// Read and decode a linear command.
    pub fn read_value<K: Into<CommandKey>>(&mut self, key: K) -> Result<f64, SessionError> {
        let table = Arc::clone(&self.table);
        let descriptor = table.get(key)?;
        if !descriptor.is_linear() {
            return Err(linear::LinearError::NotLinear {
                command: descriptor.name().to_string(),
            }
            .into());
        }
        let bytes = self.transfer_in(descriptor)?;
        decode_word(descriptor, &bytes)
    }

    /// Read a command's bytes in wire order without decoding.
    pub fn read_bytes<K: Into<CommandKey>>(&mut self, key: K) -> Result<Vec<u8>, SessionError> {
        let table = Arc::clone(&self.table);
        let descriptor = table.get(key)?;
        self.transfer_in(descriptor)
    }

    fn transfer_in(&mut self, descriptor: &CommandDescriptor) -> Result<Vec<u8>, SessionError> {
        if !descriptor.is_read_enabled() {
            return Err(SessionError::ReadNotPermitted {
                command: descriptor.name().to_string(),
            });
        }
        let bytes = self.transport.read_block(
            self.address,
            descriptor.register(),
            descriptor.num_data_bytes(),
        )?;
        debug!(
            device = self.address,
            command = descriptor.name(),
            register = descriptor.register(),
            bytes = ?bytes,
            "read"
        );
        check_count(descriptor, bytes.len())?;
        Ok(bytes)
    }
}

fn check_count(descriptor: &CommandDescriptor, actual: usize) -> Result<(), SessionError> {
    if actual != descriptor.num_data_bytes() {
        return Err(SessionError::ByteCount {
            command: descriptor.name().to_string(),
            expected: descriptor.num_data_bytes(),
            actual,
        });
    }
    Ok(())
}

fn decode_word(descriptor: &CommandDescriptor, bytes: &[u8]) -> Result<f64, SessionError> {
    let word: [u8; WORD_BYTES] = bytes.try_into().map_err(|_| SessionError::ByteCount {
        command: descriptor.name().to_string(),
        expected: WORD_BYTES,
        actual: bytes.len(),
    })?;
    Ok(linear::decode(descriptor, word)?)
}

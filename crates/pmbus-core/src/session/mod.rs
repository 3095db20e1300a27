//! Read and write device commands by name or register address.
//!
//! A [`DeviceSession`] binds one device address, a shared command table and
//! a transport. Every operation resolves the command first, enforces the
//! read/write permissions and byte count from its descriptor, and only then
//! touches the bus. Linear commands accept and return real values; raw
//! commands move bytes unchanged.

pub mod device;
pub mod error;

pub use device::{DeviceSession, Payload, Reading};
pub use error::SessionError;

use std::io;

use thiserror::Error;

use crate::literal::format_hex;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device {} did not acknowledge register {}", hex(.device), hex(.register))]
    Nack { device: u8, register: u8 },
    #[error("bus fault: {0}")]
    Bus(String),
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),
}

fn hex(value: &u8) -> String {
    format_hex(*value as i8)
}

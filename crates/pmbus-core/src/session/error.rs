use thiserror::Error;

use crate::command::TableError;
use crate::linear::LinearError;
use crate::transport::TransportError;

/// Failure of a session-level read or write.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("{command} is not write accessible")]
    WriteNotPermitted { command: String },
    #[error("{command} is not read accessible")]
    ReadNotPermitted { command: String },
    #[error("{command} expects {expected} bytes, but {actual} are provided")]
    ByteCount {
        command: String,
        expected: usize,
        actual: usize,
    },
    #[error("{command} is not a linear command; supply raw bytes instead of a value")]
    ValueOnRawCommand { command: String },
    #[error(transparent)]
    Linear(#[from] LinearError),
    #[error("transfer failed: {0}")]
    Transport(#[from] TransportError),
}

//! Error types for SMBus operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The bus device node could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bus handle is already bound to this client.
    #[error("Bus handle already open")]
    AlreadyOpen,

    /// The address-select control operation failed.
    #[error("Address 0x{address:02x} rejected: {source}")]
    AddressRejected {
        address: u8,
        #[source]
        source: io::Error,
    },

    /// Rejected before reaching the kernel.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The kernel transaction returned an error status.
    #[error("SMBus transaction failed: {0}")]
    TransactionFailed(#[source] io::Error),

    /// Operation attempted on a closed client.
    #[error("Client is closed")]
    InvalidState,
}

impl Error {
    /// Raw OS error number behind a kernel failure, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::OpenFailed { source, .. }
            | Error::AddressRejected { source, .. }
            | Error::TransactionFailed(source) => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for flashscan-core
//!
//! Every variant is a failed operation; the variants only differ in what
//! they tell the caller about where and why it failed. The type is
//! `no_std` compatible and `Copy`.

use core::fmt;

use crate::handler::HandlerStatus;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The operation footprint does not fit inside the addressable range
    AddressOutOfRange {
        /// Start address of the rejected operation
        addr: u32,
    },
    /// A full-memory operation was requested while another one is running
    Busy {
        /// Status of the handler at the time of the request
        status: HandlerStatus,
    },
    /// The backend failed to erase a page
    EraseFailed {
        /// Page address
        addr: u32,
    },
    /// The backend failed to program a page
    WriteFailed {
        /// Page address
        addr: u32,
    },
    /// The backend failed to read a page
    ReadFailed {
        /// Page address
        addr: u32,
    },
}

impl Error {
    /// Address of the failed operation, if the failure is tied to one
    pub fn addr(&self) -> Option<u32> {
        match *self {
            Self::AddressOutOfRange { addr }
            | Self::EraseFailed { addr }
            | Self::WriteFailed { addr }
            | Self::ReadFailed { addr } => Some(addr),
            Self::Busy { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange { addr } => {
                write!(f, "address 0x{:08X} is out of range", addr)
            }
            Self::Busy { status } => write!(f, "flash handler is busy ({})", status),
            Self::EraseFailed { addr } => write!(f, "erase failed at address 0x{:08X}", addr),
            Self::WriteFailed { addr } => write!(f, "write failed at address 0x{:08X}", addr),
            Self::ReadFailed { addr } => write!(f, "read failed at address 0x{:08X}", addr),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

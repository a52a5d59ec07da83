//! Error types for rawnet

use thiserror::Error;

/// Result type alias for rawnet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the rawnet codecs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read addressed bytes at or beyond the logical buffer length
    #[error("Read of {width} byte(s) at offset {offset} is out of bounds (length {len})")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// A textual address did not parse to an IPv4 address
    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// The protocol number is not one the codecs model
    #[error("Unsupported protocol number: {0}")]
    UnsupportedProtocol(u8),

    /// Parse-mode input is not a usable header
    #[error("Malformed packet: {0}")]
    Malformed(String),

    /// Packet construction error
    #[error("Packet construction error: {0}")]
    PacketConstruction(String),
}

impl Error {
    /// Create an out-of-bounds error for a read of `width` bytes at `offset`
    pub fn out_of_bounds(offset: usize, width: usize, len: usize) -> Self {
        Error::OutOfBounds { offset, width, len }
    }

    /// Create an invalid address error
    pub fn invalid_address<S: Into<String>>(addr: S) -> Self {
        Error::InvalidAddress(addr.into())
    }

    /// Create a malformed packet error with a custom message
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Error::Malformed(msg.into())
    }

    /// Create a packet construction error with a custom message
    pub fn construction<S: Into<String>>(msg: S) -> Self {
        Error::PacketConstruction(msg.into())
    }
}

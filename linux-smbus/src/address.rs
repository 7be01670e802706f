//! 7-bit bus addresses.

use std::fmt;

use crate::config::MAX_ADDRESS;
use crate::error::{Error, Result};

/// A validated 7-bit target address (0x00-0x77).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusAddress(u8);

impl BusAddress {
    /// Validate a raw address. 0x78-0x7F are reserved by the protocol and
    /// anything above 0x7F does not fit in 7 bits.
    pub fn new(address: u8) -> Result<Self> {
        if address > MAX_ADDRESS {
            return Err(Error::InvalidArgument(format!(
                "address 0x{:02x} outside 0x00-0x{:02x}",
                address, MAX_ADDRESS
            )));
        }
        Ok(Self(address))
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BusAddress> for u8 {
    fn from(address: BusAddress) -> Self {
        address.0
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

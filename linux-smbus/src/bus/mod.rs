//! Bus handle abstraction.
//!
//! A [`BusHandle`] owns one open adapter and knows how to pin it to a target
//! address and push a single [`Transaction`] through it. The Linux
//! implementation issues ioctls on `/dev/i2c-N`; tests use an in-memory fake.
//!
//! Errors here are plain `std::io::Error` carrying the OS error number; the
//! client maps them into the crate's taxonomy.

use std::io;

use crate::address::BusAddress;
use crate::functionality::Functionality;
use crate::transaction::Transaction;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(test)]
pub(crate) mod fake;

#[cfg(target_os = "linux")]
pub use linux::I2cDevice;

/// Raw access to one I2C adapter.
pub trait BusHandle: Send {
    /// Direct subsequent transactions at `address`.
    fn select_address(&mut self, address: BusAddress) -> io::Result<()>;

    /// Run one SMBus transaction. The kernel reads from or writes into
    /// `txn.data` in place.
    fn submit(&mut self, txn: &mut Transaction) -> io::Result<()>;

    /// Query which transactions the adapter supports.
    fn functionality(&mut self) -> io::Result<Functionality>;
}

impl<B: BusHandle + ?Sized> BusHandle for Box<B> {
    fn select_address(&mut self, address: BusAddress) -> io::Result<()> {
        (**self).select_address(address)
    }

    fn submit(&mut self, txn: &mut Transaction) -> io::Result<()> {
        (**self).submit(txn)
    }

    fn functionality(&mut self) -> io::Result<Functionality> {
        (**self).functionality()
    }
}

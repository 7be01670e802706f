//! SMBus client.
//!
//! [`SmbusClient`] is the public face of the crate: one method per SMBus
//! protocol primitive. Each call
//!
//! 1. fails with [`Error::InvalidState`] once the client is closed,
//! 2. validates buffer lengths before touching the kernel,
//! 3. makes sure the cached target address is selected on the handle,
//! 4. submits one [`Transaction`] and decodes the result.
//!
//! Address selection is cached: the select ioctl is only issued when the
//! address changes or a fresh handle is attached. Nothing is retried; a NACK
//! or bus error comes back to the caller as [`Error::TransactionFailed`].
//!
//! All methods take `&mut self`. Share a client between threads with
//! [`crate::shared::SharedSmbus`], which holds a lock across select and
//! transfer.

use crate::address::BusAddress;
use crate::bus::BusHandle;
use crate::config::SMBUS_BLOCK_MAX;
use crate::error::{Error, Result};
use crate::functionality::Functionality;
use crate::tracing::prelude::*;
use crate::transaction::Transaction;

#[cfg(target_os = "linux")]
use crate::{bus::I2cDevice, config::BusConfig};

/// SMBus operations against one target address on one bus.
#[derive(Debug)]
pub struct SmbusClient<B: BusHandle> {
    handle: Option<B>,
    address: BusAddress,
    /// Address currently pinned on `handle`, if any.
    selected: Option<BusAddress>,
}

#[cfg(target_os = "linux")]
impl SmbusClient<I2cDevice> {
    /// Open `/dev/i2c-<bus>` and select `address`.
    pub fn open(bus: u32, address: u8) -> Result<Self> {
        Self::open_with(&BusConfig::new(bus), address)
    }

    pub fn open_with(config: &BusConfig, address: u8) -> Result<Self> {
        let address = BusAddress::new(address)?;
        let device = I2cDevice::open_with(config)?;
        Self::with_handle(device, address)
    }

    /// Open a new bus on a closed client, reselecting the cached address.
    pub fn bus_open(&mut self, bus: u32) -> Result<()> {
        if self.handle.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let device = I2cDevice::open(bus)?;
        self.attach(device)
    }
}

impl<B: BusHandle> SmbusClient<B> {
    /// Wrap an already-open handle and select `address` on it.
    pub fn new(handle: B, address: u8) -> Result<Self> {
        Self::with_handle(handle, BusAddress::new(address)?)
    }

    pub fn with_handle(handle: B, address: BusAddress) -> Result<Self> {
        let mut client = Self {
            handle: Some(handle),
            address,
            selected: None,
        };
        client.ensure_selected()?;
        Ok(client)
    }

    /// Wrap a handle without selecting yet. The select is issued by the first
    /// operation or [`set_address`](Self::set_address), so a rejected address
    /// surfaces there instead of losing the handle.
    pub fn deferred(handle: B, address: BusAddress) -> Self {
        Self {
            handle: Some(handle),
            address,
            selected: None,
        }
    }

    /// Bind a fresh handle to a closed client.
    pub fn attach(&mut self, handle: B) -> Result<()> {
        if self.handle.is_some() {
            return Err(Error::AlreadyOpen);
        }
        self.handle = Some(handle);
        self.selected = None;
        self.ensure_selected()
    }

    /// Release the bus handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!(address = %self.address, "Closed SMBus client");
        }
        self.selected = None;
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn address(&self) -> BusAddress {
        self.address
    }

    /// Change the target address. The select is issued right away when the
    /// value differs from the cached one and skipped otherwise.
    pub fn set_address(&mut self, address: u8) -> Result<()> {
        let address = BusAddress::new(address)?;
        if self.handle.is_none() {
            return Err(Error::InvalidState);
        }
        self.address = address;
        self.ensure_selected()
    }

    /// Adapter capabilities.
    pub fn functionality(&mut self) -> Result<Functionality> {
        self.handle_mut()?
            .functionality()
            .map_err(Error::TransactionFailed)
    }

    fn handle_mut(&mut self) -> Result<&mut B> {
        self.handle.as_mut().ok_or(Error::InvalidState)
    }

    fn ensure_selected(&mut self) -> Result<()> {
        let address = self.address;
        if self.selected == Some(address) {
            return Ok(());
        }

        let handle = self.handle.as_mut().ok_or(Error::InvalidState)?;
        handle
            .select_address(address)
            .map_err(|source| Error::AddressRejected {
                address: address.as_u8(),
                source,
            })?;

        debug!(address = %address, "Selected target address");
        self.selected = Some(address);
        Ok(())
    }

    fn execute(&mut self, op: &'static str, mut txn: Transaction) -> Result<Transaction> {
        self.ensure_selected()?;

        let address = self.address;
        let handle = self.handle_mut()?;
        match handle.submit(&mut txn) {
            Ok(()) => {
                trace!(
                    op,
                    address = %address,
                    command = %format!("{:#04x}", txn.command),
                    size = %txn.size,
                    "SMBus transfer"
                );
                Ok(txn)
            }
            Err(e) => {
                debug!(op, address = %address, error = %e, "SMBus transfer failed");
                Err(Error::TransactionFailed(e))
            }
        }
    }

    /// Send a single bit in the R/W position.
    pub fn write_quick(&mut self, bit: bool) -> Result<()> {
        self.execute("write_quick", Transaction::write_quick(bit))?;
        Ok(())
    }

    /// Receive Byte: read one byte without naming a register.
    ///
    /// Some devices are simple enough that this is all they need; for others
    /// it re-reads whatever register the previous command selected.
    pub fn read_byte(&mut self) -> Result<u8> {
        let txn = self.execute("read_byte", Transaction::read_byte())?;
        Ok(txn.byte())
    }

    /// Send Byte: the inverse of [`read_byte`](Self::read_byte).
    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.execute("write_byte", Transaction::write_byte(value))?;
        Ok(())
    }

    pub fn read_byte_data(&mut self, command: u8) -> Result<u8> {
        let txn = self.execute("read_byte_data", Transaction::read_byte_data(command))?;
        Ok(txn.byte())
    }

    pub fn write_byte_data(&mut self, command: u8, value: u8) -> Result<()> {
        self.execute(
            "write_byte_data",
            Transaction::write_byte_data(command, value),
        )?;
        Ok(())
    }

    pub fn read_word_data(&mut self, command: u8) -> Result<u16> {
        let txn = self.execute("read_word_data", Transaction::read_word_data(command))?;
        Ok(txn.word())
    }

    pub fn write_word_data(&mut self, command: u8, value: u16) -> Result<()> {
        self.execute(
            "write_word_data",
            Transaction::write_word_data(command, value),
        )?;
        Ok(())
    }

    /// Send a word to `command` and read a word back in the same transaction.
    pub fn process_call(&mut self, command: u8, value: u16) -> Result<u16> {
        let txn = self.execute("process_call", Transaction::process_call(command, value))?;
        Ok(txn.word())
    }

    /// Block Read into `buf`, returning how many bytes the device sent.
    ///
    /// `buf.len()` (1..=32) caps what is accepted; the device decides the
    /// actual count, which may be smaller. Bytes past the returned count are
    /// left untouched.
    pub fn read_block_data(&mut self, command: u8, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let txn = Transaction::read_block_data(command, buf.len())?;
        let txn = self.execute("read_block_data", txn)?;
        Ok(copy_reply("read_block_data", txn.block(), buf))
    }

    /// Block Write of 1..=32 bytes. Returns the count the device accepted,
    /// which the caller should compare against `buf.len()`.
    pub fn write_block_data(&mut self, command: u8, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        let txn = Transaction::write_block_data(command, buf)?;
        let txn = self.execute("write_block_data", txn)?;
        Ok(accepted(&txn, buf.len()))
    }

    /// I2C Block Read for devices that don't send an SMBus count byte.
    /// Requests exactly `buf.len()` bytes.
    pub fn read_i2c_block_data(&mut self, command: u8, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let txn = Transaction::read_i2c_block_data(command, buf.len())?;
        let txn = self.execute("read_i2c_block_data", txn)?;
        Ok(copy_reply("read_i2c_block_data", txn.block(), buf))
    }

    /// I2C Block Write: like [`write_block_data`](Self::write_block_data)
    /// without the count byte on the wire.
    pub fn write_i2c_block_data(&mut self, command: u8, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        let txn = Transaction::write_i2c_block_data(command, buf)?;
        let txn = self.execute("write_i2c_block_data", txn)?;
        Ok(accepted(&txn, buf.len()))
    }

    /// Send 1..=31 bytes to `command` and read 1..=31 bytes back in one
    /// transaction.
    ///
    /// The reply length is chosen by the device and is independent of the
    /// request length, so the reply is returned as its own buffer.
    pub fn block_process_call(&mut self, command: u8, payload: &[u8]) -> Result<Vec<u8>> {
        self.check_open()?;
        let txn = Transaction::block_process_call(command, payload)?;
        let txn = self.execute("block_process_call", txn)?;
        Ok(txn.block().to_vec())
    }

    fn check_open(&self) -> Result<()> {
        if self.handle.is_none() {
            return Err(Error::InvalidState);
        }
        Ok(())
    }
}

/// Copy a block reply into the caller's buffer, truncating to its capacity.
fn copy_reply(op: &str, reply: &[u8], buf: &mut [u8]) -> usize {
    if reply.len() > buf.len() {
        warn!(
            op,
            received = reply.len(),
            capacity = buf.len(),
            "Block reply truncated to buffer"
        );
    }
    let n = reply.len().min(buf.len());
    buf[..n].copy_from_slice(&reply[..n]);
    n
}

/// Bytes the device took from a block write. The kernel leaves the count
/// untouched on success.
fn accepted(txn: &Transaction, requested: usize) -> usize {
    txn.data
        .as_ref()
        .map(|d| usize::from(d.block_len()).min(requested).min(SMBUS_BLOCK_MAX))
        .unwrap_or(requested)
}

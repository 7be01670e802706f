//! SMBus transaction encoding.
//!
//! Every SMBus operation maps onto the same kernel record,
//! `struct i2c_smbus_ioctl_data`:
//!
//! ```text
//! struct i2c_smbus_ioctl_data {
//!     __u8  read_write;              // I2C_SMBUS_READ / I2C_SMBUS_WRITE
//!     __u8  command;                 // register byte
//!     __u32 size;                    // transaction shape (QUICK, BYTE, ...)
//!     union i2c_smbus_data *data;    // in/out payload, may be NULL
//! };
//!
//! union i2c_smbus_data {
//!     __u8  byte;
//!     __u16 word;
//!     __u8  block[I2C_SMBUS_BLOCK_MAX + 2];  // block[0] is the length
//! };
//! ```
//!
//! [`Transaction`] is the typed form of that record. The constructors here
//! build one per operation and the accessors decode the payload after the
//! kernel has filled it in. Validation of caller buffers happens in the
//! constructors so that a bad length never reaches the kernel.
//!
//! Quirks worth knowing:
//!
//! - Send Byte (`write_byte`) carries its value in the `command` field and
//!   has no data block.
//! - Quick Command encodes its single bit in `read_write`.
//! - Words live in the union in host byte order. The kernel puts them on the
//!   wire LSB first.
//! - For block transfers `block[0]` is the count: the requested length on the
//!   way in, the length the device actually returned on the way out.

use std::fmt;

use crate::config::{self, size, BLOCK_PROC_CALL_MAX, SMBUS_BLOCK_MAX};
use crate::error::{Error, Result};

/// Transfer direction as seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Write = config::I2C_SMBUS_WRITE,
    Read = config::I2C_SMBUS_READ,
}

/// Shape of the transaction (`size` field of the ioctl record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProtocolSize {
    Quick = size::QUICK,
    Byte = size::BYTE,
    ByteData = size::BYTE_DATA,
    WordData = size::WORD_DATA,
    ProcCall = size::PROC_CALL,
    BlockData = size::BLOCK_DATA,
    BlockProcCall = size::BLOCK_PROC_CALL,
    I2cBlockData = size::I2C_BLOCK_DATA,
}

impl ProtocolSize {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolSize::Quick => "QUICK",
            ProtocolSize::Byte => "BYTE",
            ProtocolSize::ByteData => "BYTE_DATA",
            ProtocolSize::WordData => "WORD_DATA",
            ProtocolSize::ProcCall => "PROC_CALL",
            ProtocolSize::BlockData => "BLOCK_DATA",
            ProtocolSize::BlockProcCall => "BLOCK_PROC_CALL",
            ProtocolSize::I2cBlockData => "I2C_BLOCK_DATA",
        }
    }
}

impl fmt::Display for ProtocolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kernel `union i2c_smbus_data`.
///
/// Represented as the largest member (the block) with the union's 2-byte
/// alignment; `byte` and `word` alias the first bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(2))]
pub struct SmbusData {
    block: [u8; SMBUS_BLOCK_MAX + 2],
}

impl SmbusData {
    pub fn new() -> Self {
        Self {
            block: [0; SMBUS_BLOCK_MAX + 2],
        }
    }

    pub fn byte(&self) -> u8 {
        self.block[0]
    }

    pub fn set_byte(&mut self, value: u8) {
        self.block[0] = value;
    }

    pub fn word(&self) -> u16 {
        u16::from_ne_bytes([self.block[0], self.block[1]])
    }

    pub fn set_word(&mut self, value: u16) {
        self.block[..2].copy_from_slice(&value.to_ne_bytes());
    }

    /// Length prefix of a block transfer.
    pub fn block_len(&self) -> u8 {
        self.block[0]
    }

    pub fn set_block_len(&mut self, len: u8) {
        self.block[0] = len;
    }

    /// Payload selected by the length prefix, clamped to the protocol ceiling.
    pub fn block(&self) -> &[u8] {
        let len = usize::from(self.block[0]).min(SMBUS_BLOCK_MAX);
        &self.block[1..=len]
    }

    /// Store `payload` with its length prefix. Caller has validated the length.
    pub fn set_block(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= SMBUS_BLOCK_MAX);
        self.block[0] = payload.len() as u8;
        self.block[1..=payload.len()].copy_from_slice(payload);
    }

    /// Whole backing array, length prefix included.
    pub fn raw(&self) -> &[u8; SMBUS_BLOCK_MAX + 2] {
        &self.block
    }
}

impl Default for SmbusData {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SmbusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SmbusData({:02x?})", &self.block[..])
    }
}

/// Kernel `struct i2c_smbus_ioctl_data`.
#[derive(Debug)]
#[repr(C)]
pub struct SmbusIoctlData {
    pub read_write: u8,
    pub command: u8,
    pub size: u32,
    pub data: *mut SmbusData,
}

/// One SMBus round trip: what to send and where the kernel puts the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub direction: Direction,
    pub size: ProtocolSize,
    pub command: u8,
    pub data: Option<SmbusData>,
}

/// Check a caller buffer against the block limits.
pub fn check_block_len(len: usize, max: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::InvalidArgument("empty block buffer".to_string()));
    }
    if len > max {
        return Err(Error::InvalidArgument(format!(
            "block of {} bytes exceeds limit of {}",
            len, max
        )));
    }
    Ok(())
}

impl Transaction {
    fn new(direction: Direction, size: ProtocolSize, command: u8, data: Option<SmbusData>) -> Self {
        Self {
            direction,
            size,
            command,
            data,
        }
    }

    fn with_byte(value: u8) -> SmbusData {
        let mut data = SmbusData::new();
        data.set_byte(value);
        data
    }

    fn with_word(value: u16) -> SmbusData {
        let mut data = SmbusData::new();
        data.set_word(value);
        data
    }

    fn with_block(payload: &[u8]) -> SmbusData {
        let mut data = SmbusData::new();
        data.set_block(payload);
        data
    }

    /// Quick Command: the bit travels in the R/W position, no payload.
    pub fn write_quick(bit: bool) -> Self {
        let direction = if bit { Direction::Read } else { Direction::Write };
        Self::new(direction, ProtocolSize::Quick, 0, None)
    }

    /// Receive Byte.
    pub fn read_byte() -> Self {
        Self::new(Direction::Read, ProtocolSize::Byte, 0, Some(SmbusData::new()))
    }

    /// Send Byte.
    pub fn write_byte(value: u8) -> Self {
        Self::new(Direction::Write, ProtocolSize::Byte, value, None)
    }

    pub fn read_byte_data(command: u8) -> Self {
        Self::new(
            Direction::Read,
            ProtocolSize::ByteData,
            command,
            Some(SmbusData::new()),
        )
    }

    pub fn write_byte_data(command: u8, value: u8) -> Self {
        Self::new(
            Direction::Write,
            ProtocolSize::ByteData,
            command,
            Some(Self::with_byte(value)),
        )
    }

    pub fn read_word_data(command: u8) -> Self {
        Self::new(
            Direction::Read,
            ProtocolSize::WordData,
            command,
            Some(SmbusData::new()),
        )
    }

    pub fn write_word_data(command: u8, value: u16) -> Self {
        Self::new(
            Direction::Write,
            ProtocolSize::WordData,
            command,
            Some(Self::with_word(value)),
        )
    }

    /// Process Call: write a word and read a word in one transaction.
    pub fn process_call(command: u8, value: u16) -> Self {
        Self::new(
            Direction::Write,
            ProtocolSize::ProcCall,
            command,
            Some(Self::with_word(value)),
        )
    }

    /// Block Read. `capacity` is the caller's buffer size; the device chooses
    /// the actual count.
    pub fn read_block_data(command: u8, capacity: usize) -> Result<Self> {
        check_block_len(capacity, SMBUS_BLOCK_MAX)?;
        Ok(Self::new(
            Direction::Read,
            ProtocolSize::BlockData,
            command,
            Some(SmbusData::new()),
        ))
    }

    pub fn write_block_data(command: u8, payload: &[u8]) -> Result<Self> {
        check_block_len(payload.len(), SMBUS_BLOCK_MAX)?;
        Ok(Self::new(
            Direction::Write,
            ProtocolSize::BlockData,
            command,
            Some(Self::with_block(payload)),
        ))
    }

    /// I2C Block Read: no count byte on the wire, so the host asks for
    /// exactly `len` bytes through `block[0]`.
    pub fn read_i2c_block_data(command: u8, len: usize) -> Result<Self> {
        check_block_len(len, SMBUS_BLOCK_MAX)?;
        let mut data = SmbusData::new();
        data.set_block_len(len as u8);
        Ok(Self::new(
            Direction::Read,
            ProtocolSize::I2cBlockData,
            command,
            Some(data),
        ))
    }

    pub fn write_i2c_block_data(command: u8, payload: &[u8]) -> Result<Self> {
        check_block_len(payload.len(), SMBUS_BLOCK_MAX)?;
        Ok(Self::new(
            Direction::Write,
            ProtocolSize::I2cBlockData,
            command,
            Some(Self::with_block(payload)),
        ))
    }

    pub fn block_process_call(command: u8, payload: &[u8]) -> Result<Self> {
        check_block_len(payload.len(), BLOCK_PROC_CALL_MAX)?;
        Ok(Self::new(
            Direction::Write,
            ProtocolSize::BlockProcCall,
            command,
            Some(Self::with_block(payload)),
        ))
    }

    /// Decoded byte result.
    pub fn byte(&self) -> u8 {
        self.data.as_ref().map(SmbusData::byte).unwrap_or(0)
    }

    /// Decoded word result.
    pub fn word(&self) -> u16 {
        self.data.as_ref().map(SmbusData::word).unwrap_or(0)
    }

    /// Block result, truncated to the count the kernel reported.
    pub fn block(&self) -> &[u8] {
        self.data.as_ref().map(SmbusData::block).unwrap_or(&[])
    }

    /// Build the raw ioctl record. The pointer borrows `self.data`, so the
    /// record must not outlive this transaction.
    pub fn as_ioctl_data(&mut self) -> SmbusIoctlData {
        SmbusIoctlData {
            read_write: self.direction as u8,
            command: self.command,
            size: self.size as u32,
            data: self
                .data
                .as_mut()
                .map_or(std::ptr::null_mut(), |d| d as *mut SmbusData),
        }
    }
}

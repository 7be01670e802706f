//! SMBus protocol commands over the Linux i2c-dev interface.
//!
//! SMBus is a constrained subset of I2C with a fixed menu of command shapes:
//! quick command, byte, word, process call and block transfers. Linux exposes
//! all of them through one generic ioctl on `/dev/i2c-N`; this crate turns
//! typed calls into that ioctl and back.
//!
//! ```no_run
//! # fn demo() -> linux_smbus::Result<()> {
//! use linux_smbus::SmbusClient;
//!
//! let mut client = SmbusClient::open(1, 0x4c)?;
//! let mfg_id = client.read_byte_data(0xfe)?;
//! client.write_byte_data(0x4c, 0x80)?;
//!
//! let mut block = [0u8; 32];
//! let n = client.read_block_data(0x9a, &mut block)?;
//! println!("{:#04x} {:02x?}", mfg_id, &block[..n]);
//! client.close();
//! # Ok(())
//! # }
//! ```
//!
//! Reference: <https://www.kernel.org/doc/Documentation/i2c/smbus-protocol>

pub mod address;
pub mod bus;
pub mod client;
pub mod config;
pub mod error;
pub mod functionality;
pub mod shared;
pub mod tracing;
pub mod transaction;

pub use address::BusAddress;
pub use bus::BusHandle;
#[cfg(target_os = "linux")]
pub use bus::I2cDevice;
pub use client::SmbusClient;
pub use config::BusConfig;
pub use error::{Error, Result};
pub use functionality::Functionality;
pub use shared::{RegisterAccess, SharedSmbus, SmbusDevice};
pub use transaction::{Direction, ProtocolSize, Transaction};

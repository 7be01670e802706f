//! Kernel interface constants and bus configuration.
//!
//! The ioctl request codes and SMBus size tags mirror
//! `include/uapi/linux/i2c-dev.h` and `include/uapi/linux/i2c.h`. They are
//! part of the kernel ABI and never change at runtime.
//!
//! [`BusConfig`] collects the handful of per-process settings (which bus,
//! whether to force address selection) and can be populated from the
//! environment.

use std::path::PathBuf;

/// Select the target address; fails with EBUSY if a kernel driver owns it.
pub const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Select the target address even if a kernel driver has claimed it.
pub const I2C_SLAVE_FORCE: libc::c_ulong = 0x0706;

/// Query the adapter functionality mask.
pub const I2C_FUNCS: libc::c_ulong = 0x0705;

/// Generic SMBus transfer.
pub const I2C_SMBUS: libc::c_ulong = 0x0720;

/// `read_write` marker values of `struct i2c_smbus_ioctl_data`.
pub const I2C_SMBUS_WRITE: u8 = 0;
pub const I2C_SMBUS_READ: u8 = 1;

/// SMBus transaction size tags (`size` field).
pub mod size {
    pub const QUICK: u32 = 0;
    pub const BYTE: u32 = 1;
    pub const BYTE_DATA: u32 = 2;
    pub const WORD_DATA: u32 = 3;
    pub const PROC_CALL: u32 = 4;
    pub const BLOCK_DATA: u32 = 5;
    pub const BLOCK_PROC_CALL: u32 = 7;
    pub const I2C_BLOCK_DATA: u32 = 8;
}

/// Maximum payload of an SMBus block transfer.
pub const SMBUS_BLOCK_MAX: usize = 32;

/// Maximum payload of a block process call. The adapter needs one byte of the
/// 32-byte block for the reply count.
pub const BLOCK_PROC_CALL_MAX: usize = SMBUS_BLOCK_MAX - 1;

/// Highest usable 7-bit address; 0x78-0x7F are reserved by the protocol.
pub const MAX_ADDRESS: u8 = 0x77;

/// Character device for the given bus number.
pub fn device_path(bus: u32) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{}", bus))
}

/// Settings used when opening a bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Adapter number, as in `/dev/i2c-<bus>`.
    pub bus: u32,

    /// Use `I2C_SLAVE_FORCE` so addresses bound to a kernel driver can still
    /// be reached. Dangerous; mirrors i2c-tools' `-f`.
    pub force: bool,

    /// Explicit device node, overriding the path derived from `bus`.
    pub device: Option<PathBuf>,
}

impl BusConfig {
    pub fn new(bus: u32) -> Self {
        Self {
            bus,
            force: false,
            device: None,
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Returns `Some(config)` if `SMBUS_BUS` is set to a bus number,
    /// `None` otherwise.
    ///
    /// # Environment Variables
    ///
    /// - `SMBUS_BUS`: Adapter number (presence enables the config)
    /// - `SMBUS_FORCE`: `1`/`true` to force address selection (default: off)
    /// - `SMBUS_DEVICE`: Device node override (default: `/dev/i2c-<bus>`)
    pub fn from_env() -> Option<Self> {
        let bus = std::env::var("SMBUS_BUS")
            .ok()
            .and_then(|s| s.trim().parse().ok())?;

        let force = std::env::var("SMBUS_FORCE")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let device = std::env::var_os("SMBUS_DEVICE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Some(Self { bus, force, device })
    }

    /// Device node this configuration opens.
    pub fn path(&self) -> PathBuf {
        self.device
            .clone()
            .unwrap_or_else(|| device_path(self.bus))
    }

    /// Address-select request code for this configuration.
    pub fn select_request(&self) -> libc::c_ulong {
        if self.force {
            I2C_SLAVE_FORCE
        } else {
            I2C_SLAVE
        }
    }
}

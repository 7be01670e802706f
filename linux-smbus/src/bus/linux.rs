//! Linux i2c-dev implementation.
//!
//! Opens `/dev/i2c-N` and talks to the adapter with three ioctls:
//!
//! - `I2C_SLAVE` / `I2C_SLAVE_FORCE` to select the target address
//! - `I2C_SMBUS` to run one transaction
//! - `I2C_FUNCS` to read the adapter's capability mask
//!
//! Each call blocks until the adapter driver completes the transfer.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use crate::address::BusAddress;
use crate::config::{BusConfig, I2C_FUNCS, I2C_SMBUS};
use crate::error::{Error, Result};
use crate::functionality::Functionality;
use crate::tracing::prelude::*;
use crate::transaction::Transaction;

use super::BusHandle;

/// An open `/dev/i2c-N` character device.
#[derive(Debug)]
pub struct I2cDevice {
    file: File,
    path: PathBuf,
    select_request: libc::c_ulong,
}

impl I2cDevice {
    /// Open bus `bus` with default settings.
    pub fn open(bus: u32) -> Result<Self> {
        Self::open_with(&BusConfig::new(bus))
    }

    /// Open the bus described by `config`.
    pub fn open_with(config: &BusConfig) -> Result<Self> {
        let path = config.path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| Error::OpenFailed {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), force = config.force, "Opened I2C bus");

        Ok(Self {
            file,
            path,
            select_request: config.select_request(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ioctl(&self, request: libc::c_ulong, arg: libc::c_ulong) -> io::Result<libc::c_int> {
        // SAFETY: the descriptor is owned by `self.file` and stays open for the
        // call. `arg` is either a plain integer or a pointer the caller keeps
        // alive across the call.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }
}

impl BusHandle for I2cDevice {
    fn select_address(&mut self, address: BusAddress) -> io::Result<()> {
        self.ioctl(self.select_request, libc::c_ulong::from(address.as_u8()))?;
        Ok(())
    }

    fn submit(&mut self, txn: &mut Transaction) -> io::Result<()> {
        let mut args = txn.as_ioctl_data();
        // `args.data` points into `txn`, which outlives this call.
        self.ioctl(I2C_SMBUS, &mut args as *mut _ as libc::c_ulong)?;
        Ok(())
    }

    fn functionality(&mut self) -> io::Result<Functionality> {
        let mut funcs: libc::c_ulong = 0;
        self.ioctl(I2C_FUNCS, &mut funcs as *mut libc::c_ulong as libc::c_ulong)?;
        Ok(Functionality::from_bits_truncate(funcs as u32))
    }
}

impl Drop for I2cDevice {
    fn drop(&mut self) {
        trace!(path = %self.path.display(), "Closing I2C bus");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_surfaces_os_error() {
        let config = BusConfig {
            bus: 0,
            force: false,
            device: Some(PathBuf::from("/nonexistent/i2c-404")),
        };

        match I2cDevice::open_with(&config) {
            Err(Error::OpenFailed { path, source }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/i2c-404"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected OpenFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_transactions_on_non_i2c_file_fail_with_os_error() {
        // /dev/null opens fine but rejects i2c-dev ioctls (ENOTTY)
        let config = BusConfig {
            bus: 0,
            force: false,
            device: Some(PathBuf::from("/dev/null")),
        };
        let mut dev = I2cDevice::open_with(&config).unwrap();

        let err = dev.select_address(BusAddress::new(0x50).unwrap()).unwrap_err();
        assert!(err.raw_os_error().is_some());

        let mut txn = Transaction::read_byte();
        assert!(dev.submit(&mut txn).unwrap_err().raw_os_error().is_some());
    }
}

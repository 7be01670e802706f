//! Shared, async-friendly access to one bus.
//!
//! [`SmbusClient`] is single-owner and blocking. Boards usually have several
//! devices on one adapter, polled from different tasks, so this module wraps a
//! client in a mutex and makes "select address, then transfer" one critical
//! section. Without that, another thread could retarget the handle between
//! the select and the transfer.
//!
//! The async entry points run the blocking ioctl on tokio's blocking pool so
//! a stuck bus never stalls the executor.
//!
//! ```no_run
//! # async fn demo() -> linux_smbus::Result<()> {
//! use linux_smbus::{RegisterAccess, SharedSmbus, SmbusClient};
//!
//! let bus = SharedSmbus::new(SmbusClient::open(1, 0x4c)?);
//! let fan = bus.device(0x4c)?;
//! let vr = bus.device(0x24)?;
//!
//! let mfg_id = fan.read_register(0xfe).await?;
//! let status = vr.read_register_word(0x79).await?;
//! # let _ = (mfg_id, status);
//! # Ok(())
//! # }
//! ```

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::address::BusAddress;
use crate::bus::BusHandle;
use crate::client::SmbusClient;
use crate::config::SMBUS_BLOCK_MAX;
use crate::error::{Error, Result};

/// Register-level access to a single device, the shape most drivers need.
#[async_trait]
pub trait RegisterAccess: Send + Sync {
    /// Read one byte from `register`.
    async fn read_register(&self, register: u8) -> Result<u8>;

    /// Write one byte to `register`.
    async fn write_register(&self, register: u8, value: u8) -> Result<()>;

    /// Read a 16-bit little-endian word from `register`.
    async fn read_register_word(&self, register: u8) -> Result<u16>;

    /// Write a 16-bit word to `register`.
    async fn write_register_word(&self, register: u8, value: u16) -> Result<()>;

    /// SMBus block read from `register`.
    async fn read_register_block(&self, register: u8) -> Result<Vec<u8>>;
}

/// A cloneable handle to one client, serialising access across threads.
pub struct SharedSmbus<B: BusHandle> {
    inner: Arc<Mutex<SmbusClient<B>>>,
}

impl<B: BusHandle> Clone for SharedSmbus<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: BusHandle + 'static> SharedSmbus<B> {
    pub fn new(client: SmbusClient<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    /// Exclusive access to the underlying client.
    ///
    /// A panic while holding the lock leaves the client usable; the address
    /// cache is always consistent with the last completed select.
    pub fn lock(&self) -> MutexGuard<'_, SmbusClient<B>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Target `address` and run `f` without releasing the lock in between.
    pub fn with_address<R>(
        &self,
        address: u8,
        f: impl FnOnce(&mut SmbusClient<B>) -> Result<R>,
    ) -> Result<R> {
        let mut client = self.lock();
        client.set_address(address)?;
        f(&mut client)
    }

    /// Async form of [`with_address`](Self::with_address); `f` runs on the
    /// blocking thread pool.
    pub async fn run<R, F>(&self, address: u8, f: F) -> Result<R>
    where
        F: FnOnce(&mut SmbusClient<B>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let shared = self.clone();
        match tokio::task::spawn_blocking(move || shared.with_address(address, f)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::TransactionFailed(io::Error::other(e))),
        }
    }

    /// A register-access view of the device at `address`.
    pub fn device(&self, address: u8) -> Result<SmbusDevice<B>> {
        Ok(SmbusDevice {
            bus: self.clone(),
            address: BusAddress::new(address)?,
        })
    }

    /// Close the shared client. Outstanding handles see `InvalidState`.
    pub fn close(&self) {
        self.lock().close();
    }
}

/// One device on a shared bus.
pub struct SmbusDevice<B: BusHandle> {
    bus: SharedSmbus<B>,
    address: BusAddress,
}

impl<B: BusHandle> Clone for SmbusDevice<B> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            address: self.address,
        }
    }
}

impl<B: BusHandle + 'static> SmbusDevice<B> {
    pub fn address(&self) -> BusAddress {
        self.address
    }

    /// Run arbitrary client operations against this device.
    pub async fn run<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SmbusClient<B>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.bus.run(self.address.as_u8(), f).await
    }
}

#[async_trait]
impl<B: BusHandle + 'static> RegisterAccess for SmbusDevice<B> {
    async fn read_register(&self, register: u8) -> Result<u8> {
        self.run(move |c| c.read_byte_data(register)).await
    }

    async fn write_register(&self, register: u8, value: u8) -> Result<()> {
        self.run(move |c| c.write_byte_data(register, value)).await
    }

    async fn read_register_word(&self, register: u8) -> Result<u16> {
        self.run(move |c| c.read_word_data(register)).await
    }

    async fn write_register_word(&self, register: u8, value: u16) -> Result<()> {
        self.run(move |c| c.write_word_data(register, value)).await
    }

    async fn read_register_block(&self, register: u8) -> Result<Vec<u8>> {
        self.run(move |c| {
            let mut buf = [0u8; SMBUS_BLOCK_MAX];
            let n = c.read_block_data(register, &mut buf)?;
            Ok(buf[..n].to_vec())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::fake::FakeBus;

    fn shared() -> (SharedSmbus<FakeBus>, Arc<Mutex<crate::bus::fake::FakeLog>>) {
        let (bus, log) = FakeBus::new();
        (SharedSmbus::new(SmbusClient::new(bus, 0x4c).unwrap()), log)
    }

    #[test]
    fn test_with_address_retargets_under_lock() {
        let (bus, log) = shared();

        bus.with_address(0x24, |c| c.write_byte_data(0x01, 0x80)).unwrap();
        bus.with_address(0x24, |c| c.read_byte_data(0x01)).unwrap();
        assert_eq!(bus.lock().address().as_u8(), 0x24);

        let selects: Vec<u8> = log.lock().unwrap().selects.iter().map(|a| a.as_u8()).collect();
        assert_eq!(selects, vec![0x4c, 0x24]);
    }

    #[tokio::test]
    async fn test_devices_share_one_handle() {
        let (bus, log) = shared();
        let fan = bus.device(0x4c).unwrap();
        let vr = bus.device(0x24).unwrap();

        fan.write_register(0x4c, 0x80).await.unwrap();
        vr.write_register_word(0x21, 0x0266).await.unwrap();

        assert_eq!(fan.read_register(0x4c).await.unwrap(), 0x80);
        assert_eq!(vr.read_register_word(0x21).await.unwrap(), 0x0266);

        // Each switch between devices costs exactly one select
        let selects: Vec<u8> = log.lock().unwrap().selects.iter().map(|a| a.as_u8()).collect();
        assert_eq!(selects, vec![0x4c, 0x24, 0x4c, 0x24]);
    }

    #[tokio::test]
    async fn test_block_read_through_device() {
        let (fake, _log) = FakeBus::new();
        let mut client = SmbusClient::new(fake, 0x24).unwrap();
        client.write_block_data(0x9a, b"TI").unwrap();

        let bus = SharedSmbus::new(client);
        let vr = bus.device(0x24).unwrap();
        assert_eq!(vr.read_register_block(0x9a).await.unwrap(), b"TI".to_vec());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_keep_select_and_transfer_together() {
        let (bus, log) = shared();

        let mut tasks = Vec::new();
        for (i, address) in [0x20u8, 0x21, 0x22, 0x23].into_iter().enumerate() {
            let device = bus.device(address).unwrap();
            tasks.push(tokio::spawn(async move {
                for n in 0..25u8 {
                    device.write_register(i as u8, n).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.submits.len(), 100);
        // Never more selects than transfers (plus the initial one)
        assert!(log.selects.len() <= 101);
    }

    #[tokio::test]
    async fn test_closed_bus_reports_invalid_state() {
        let (bus, _log) = shared();
        let fan = bus.device(0x4c).unwrap();
        bus.close();

        assert!(matches!(
            fan.read_register(0x00).await,
            Err(Error::InvalidState)
        ));
    }

    #[test]
    fn test_device_rejects_reserved_address() {
        let (bus, _log) = shared();
        assert!(matches!(bus.device(0x7c), Err(Error::InvalidArgument(_))));
    }
}

//! In-memory bus handle for tests.
//!
//! Models a single device with a 256-byte register file. Writes land in the
//! register file and reads echo it back, so values written with one
//! operation can be read with another. Replies can be overridden per
//! transaction and failures injected.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use crate::address::BusAddress;
use crate::functionality::Functionality;
use crate::transaction::{Direction, ProtocolSize, Transaction};

use super::BusHandle;

/// Observations shared between a [`FakeBus`] and the test holding it.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub selects: Vec<BusAddress>,
    pub submits: Vec<Transaction>,
    pub released: usize,
}

#[derive(Debug)]
pub struct FakeBus {
    log: Arc<Mutex<FakeLog>>,
    registers: [[u8; 34]; 256],
    last_register: u8,
    replies: VecDeque<Vec<u8>>,
    accept_limit: Option<u8>,
    fail_with: Option<i32>,
    reject_select: bool,
}

impl FakeBus {
    pub fn new() -> (Self, Arc<Mutex<FakeLog>>) {
        let log = Arc::new(Mutex::new(FakeLog::default()));
        let bus = Self {
            log: log.clone(),
            registers: [[0; 34]; 256],
            last_register: 0,
            replies: VecDeque::new(),
            accept_limit: None,
            fail_with: None,
            reject_select: false,
        };
        (bus, log)
    }

    /// Queue a raw block reply (payload only) for the next block read or
    /// block process call.
    pub fn reply_block(&mut self, payload: &[u8]) {
        self.replies.push_back(payload.to_vec());
    }

    /// Fail every transaction with this errno.
    pub fn fail_with(&mut self, errno: i32) {
        self.fail_with = Some(errno);
    }

    /// Fail address selection with EBUSY.
    pub fn reject_select(&mut self) {
        self.reject_select = true;
    }

    /// Report at most `n` bytes accepted on block writes.
    pub fn accept_at_most(&mut self, n: u8) {
        self.accept_limit = Some(n);
    }

    fn handle(&mut self, txn: &mut Transaction) {
        let cmd = txn.command as usize;
        let reply = if matches!(
            txn.size,
            ProtocolSize::BlockData | ProtocolSize::BlockProcCall | ProtocolSize::I2cBlockData
        ) {
            self.replies.pop_front()
        } else {
            None
        };

        match (txn.size, txn.direction) {
            (ProtocolSize::Quick, _) => {}
            (ProtocolSize::Byte, Direction::Write) => self.last_register = txn.command,
            (ProtocolSize::Byte, Direction::Read) => {
                let value = self.registers[self.last_register as usize][0];
                txn.data.get_or_insert_with(Default::default).set_byte(value);
            }
            (ProtocolSize::ByteData, Direction::Write) => {
                self.registers[cmd][0] = txn.byte();
            }
            (ProtocolSize::ByteData, Direction::Read) => {
                let value = self.registers[cmd][0];
                txn.data.get_or_insert_with(Default::default).set_byte(value);
            }
            (ProtocolSize::WordData, Direction::Write) => {
                self.registers[cmd][..2].copy_from_slice(&txn.word().to_le_bytes());
            }
            (ProtocolSize::WordData, Direction::Read) => {
                let value = u16::from_le_bytes([self.registers[cmd][0], self.registers[cmd][1]]);
                txn.data.get_or_insert_with(Default::default).set_word(value);
            }
            (ProtocolSize::ProcCall, _) => {
                // Device answers with the bitwise complement
                let value = !txn.word();
                txn.data.get_or_insert_with(Default::default).set_word(value);
            }
            (ProtocolSize::BlockData | ProtocolSize::I2cBlockData, Direction::Write) => {
                let payload = txn.block().to_vec();
                self.registers[cmd][0] = payload.len() as u8;
                self.registers[cmd][1..=payload.len()].copy_from_slice(&payload);
                if let Some(limit) = self.accept_limit {
                    let data = txn.data.get_or_insert_with(Default::default);
                    data.set_block_len(limit.min(payload.len() as u8));
                }
            }
            (ProtocolSize::BlockData, Direction::Read) => {
                let stored = self.registers[cmd];
                let payload = reply.unwrap_or_else(|| stored[1..=stored[0] as usize].to_vec());
                txn.data.get_or_insert_with(Default::default).set_block(&payload);
            }
            (ProtocolSize::I2cBlockData, Direction::Read) => {
                let requested = txn.data.as_ref().map(|d| d.block_len()).unwrap_or(0) as usize;
                let stored = self.registers[cmd];
                let payload =
                    reply.unwrap_or_else(|| stored[1..=requested.min(32)].to_vec());
                txn.data.get_or_insert_with(Default::default).set_block(&payload);
            }
            (ProtocolSize::BlockProcCall, _) => {
                let payload = reply.unwrap_or_else(|| txn.block().iter().rev().copied().collect());
                txn.data.get_or_insert_with(Default::default).set_block(&payload);
            }
        }
    }
}

impl BusHandle for FakeBus {
    fn select_address(&mut self, address: BusAddress) -> io::Result<()> {
        self.log.lock().unwrap().selects.push(address);
        if self.reject_select {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        Ok(())
    }

    fn submit(&mut self, txn: &mut Transaction) -> io::Result<()> {
        self.log.lock().unwrap().submits.push(txn.clone());
        if let Some(errno) = self.fail_with {
            return Err(io::Error::from_raw_os_error(errno));
        }
        self.handle(txn);
        Ok(())
    }

    fn functionality(&mut self) -> io::Result<Functionality> {
        Ok(Functionality::all())
    }
}

impl Drop for FakeBus {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.released += 1;
        }
    }
}

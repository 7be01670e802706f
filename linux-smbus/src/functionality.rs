//! Adapter functionality flags.
//!
//! Reported by the `I2C_FUNCS` ioctl; values from
//! `include/uapi/linux/i2c.h`. Not every adapter implements every SMBus
//! transaction, so callers can check before issuing one.

use bitflags::bitflags;

bitflags! {
    /// Capabilities of an I2C adapter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Functionality: u32 {
        const I2C = 0x0000_0001;
        const TEN_BIT_ADDR = 0x0000_0002;
        const PROTOCOL_MANGLING = 0x0000_0004;
        const SMBUS_PEC = 0x0000_0008;
        const NOSTART = 0x0000_0010;
        const SLAVE = 0x0000_0020;
        const SMBUS_BLOCK_PROC_CALL = 0x0000_8000;
        const SMBUS_QUICK = 0x0001_0000;
        const SMBUS_READ_BYTE = 0x0002_0000;
        const SMBUS_WRITE_BYTE = 0x0004_0000;
        const SMBUS_READ_BYTE_DATA = 0x0008_0000;
        const SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
        const SMBUS_READ_WORD_DATA = 0x0020_0000;
        const SMBUS_WRITE_WORD_DATA = 0x0040_0000;
        const SMBUS_PROC_CALL = 0x0080_0000;
        const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;
        const SMBUS_READ_I2C_BLOCK = 0x0400_0000;
        const SMBUS_WRITE_I2C_BLOCK = 0x0800_0000;
        const SMBUS_HOST_NOTIFY = 0x1000_0000;

        const SMBUS_BYTE = Self::SMBUS_READ_BYTE.bits() | Self::SMBUS_WRITE_BYTE.bits();
        const SMBUS_BYTE_DATA =
            Self::SMBUS_READ_BYTE_DATA.bits() | Self::SMBUS_WRITE_BYTE_DATA.bits();
        const SMBUS_WORD_DATA =
            Self::SMBUS_READ_WORD_DATA.bits() | Self::SMBUS_WRITE_WORD_DATA.bits();
        const SMBUS_BLOCK_DATA =
            Self::SMBUS_READ_BLOCK_DATA.bits() | Self::SMBUS_WRITE_BLOCK_DATA.bits();
        const SMBUS_I2C_BLOCK =
            Self::SMBUS_READ_I2C_BLOCK.bits() | Self::SMBUS_WRITE_I2C_BLOCK.bits();
    }
}

impl Functionality {
    /// Human-readable rows in the style of `i2cdetect -F`.
    pub fn describe(&self) -> Vec<(&'static str, bool)> {
        const ROWS: &[(&str, Functionality)] = &[
            ("I2C", Functionality::I2C),
            ("SMBus Quick Command", Functionality::SMBUS_QUICK),
            ("SMBus Send Byte", Functionality::SMBUS_WRITE_BYTE),
            ("SMBus Receive Byte", Functionality::SMBUS_READ_BYTE),
            ("SMBus Write Byte", Functionality::SMBUS_WRITE_BYTE_DATA),
            ("SMBus Read Byte", Functionality::SMBUS_READ_BYTE_DATA),
            ("SMBus Write Word", Functionality::SMBUS_WRITE_WORD_DATA),
            ("SMBus Read Word", Functionality::SMBUS_READ_WORD_DATA),
            ("SMBus Process Call", Functionality::SMBUS_PROC_CALL),
            ("SMBus Block Write", Functionality::SMBUS_WRITE_BLOCK_DATA),
            ("SMBus Block Read", Functionality::SMBUS_READ_BLOCK_DATA),
            ("SMBus Block Process Call", Functionality::SMBUS_BLOCK_PROC_CALL),
            ("SMBus PEC", Functionality::SMBUS_PEC),
            ("I2C Block Write", Functionality::SMBUS_WRITE_I2C_BLOCK),
            ("I2C Block Read", Functionality::SMBUS_READ_I2C_BLOCK),
        ];

        ROWS.iter()
            .map(|(name, flag)| (*name, self.contains(*flag)))
            .collect()
    }
}

//! I2C master port.
//!
//! The relay speaks in Wire-library terms: a write returns a status byte
//! (0 = success) and a read reports how many bytes actually arrived.
//! [`HalI2c`] maps any `embedded-hal` bus onto those semantics.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use log::debug;

// ───────────────────────────────────────────────────────────────
// Wire status codes
// ───────────────────────────────────────────────────────────────

pub const STATUS_OK: u8 = 0;
/// Payload longer than the transmit buffer.
pub const STATUS_DATA_TOO_LONG: u8 = 1;
pub const STATUS_NACK_ADDRESS: u8 = 2;
pub const STATUS_NACK_DATA: u8 = 3;
pub const STATUS_OTHER: u8 = 4;

/// Master side of an I2C bus.
pub trait I2cMaster {
    /// Write `bytes` to `address`; returns the bus status.
    fn write(&mut self, address: u8, bytes: &[u8]) -> u8;

    /// Read up to `buf.len()` bytes from `address`; returns the count received.
    fn request_from(&mut self, address: u8, buf: &mut [u8]) -> usize;
}

/// Adapter from an `embedded-hal` I2C bus.
pub struct HalI2c<I>(pub I);

impl<I> HalI2c<I> {
    pub fn into_inner(self) -> I {
        self.0
    }
}

pub fn status_of(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => STATUS_NACK_ADDRESS,
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => STATUS_NACK_DATA,
        _ => STATUS_OTHER,
    }
}

impl<I: I2c> I2cMaster for HalI2c<I> {
    fn write(&mut self, address: u8, bytes: &[u8]) -> u8 {
        match self.0.write(address, bytes) {
            Ok(()) => STATUS_OK,
            Err(e) => {
                debug!("I2C[0x{:02x}]: write error {:?}", address, e.kind());
                status_of(e.kind())
            }
        }
    }

    fn request_from(&mut self, address: u8, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        match self.0.read(address, buf) {
            Ok(()) => buf.len(),
            Err(e) => {
                debug!("I2C[0x{:02x}]: read error {:?}", address, e.kind());
                0
            }
        }
    }
}

/// Placeholder bus for nodes without secondaries; every address NACKs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBus;

impl I2cMaster for NoBus {
    fn write(&mut self, _address: u8, _bytes: &[u8]) -> u8 {
        STATUS_NACK_ADDRESS
    }

    fn request_from(&mut self, _address: u8, _buf: &mut [u8]) -> usize {
        0
    }
}

/// Delay that returns immediately.  Pairs with [`NoBus`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

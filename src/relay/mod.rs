//! I2C relay: forward a request to a secondary node and return its reply.
//!
//! ```text
//!   WRITE ──▶ POLL_LENGTH(attempt) ──▶ READ_DATA ──▶ DONE
//!     │          │    ▲   │ 0xFF          │
//!     │          │    └───┘               │
//!     └──────────┴────────────────────────┴──▶ ERROR
//! ```
//!
//! The secondary answers each one-byte poll with `0xFF` until its reply is
//! ready, then with the reply length.  [`RelayMachine`] holds the protocol
//! logic and never sleeps; [`I2cRelay`] drives it against a real bus and a
//! blocking delay.

pub mod bus;
pub mod responder;

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::ProtocolConfig;
use crate::error::RelayError;

pub use bus::{HalI2c, I2cMaster, NoBus, NoDelay};
pub use responder::I2cResponder;

/// Poll answer meaning "request not processed yet".
pub const NOT_READY: u8 = 0xFF;

/// Largest doubling applied in the slow phase; keeps the delay finite for
/// attempt budgets beyond the default.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Wait before poll number `attempt` (0-based).
///
/// 1 ms for attempts 0-4, 10 ms for 5-9, then 10 ms doubling per attempt.
pub fn backoff_delay(attempt: u8) -> Duration {
    match attempt {
        0..=4 => Duration::from_millis(1),
        5..=9 => Duration::from_millis(10),
        _ => {
            let shift = u32::from(attempt - 10).min(MAX_BACKOFF_SHIFT);
            Duration::from_millis(10u64 << shift)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// State machine
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Write,
    PollLength { attempt: u8 },
    ReadData { expected: u8 },
    Done { len: u8 },
    Error(RelayError),
}

/// Next bus operation requested by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Master-write the request.
    Write,
    /// Wait `delay`, then master-read one length byte.
    Poll { attempt: u8, delay: Duration },
    /// Master-read exactly `len` bytes.
    Read { len: u8 },
    Done { len: u8 },
    Failed(RelayError),
}

/// Relay sub-protocol, advanced by bus results.
#[derive(Debug, Clone)]
pub struct RelayMachine {
    state: RelayState,
    max_attempts: u8,
    transfer_limit: u8,
}

impl RelayMachine {
    pub fn new(max_attempts: u8, transfer_limit: u8) -> Self {
        Self {
            state: RelayState::Write,
            max_attempts,
            transfer_limit,
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.max_i2c_attempts, config.i2c_transfer_limit)
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn step(&self) -> Step {
        match self.state {
            RelayState::Write => Step::Write,
            RelayState::PollLength { attempt } => Step::Poll {
                attempt,
                delay: backoff_delay(attempt),
            },
            RelayState::ReadData { expected } => Step::Read { len: expected },
            RelayState::Done { len } => Step::Done { len },
            RelayState::Error(e) => Step::Failed(e),
        }
    }

    /// Result of the master write.
    pub fn wrote(&mut self, status: u8) -> Step {
        if let RelayState::Write = self.state {
            self.state = if status == bus::STATUS_OK {
                RelayState::PollLength { attempt: 0 }
            } else {
                RelayState::Error(RelayError::I2cWriteFailed(status))
            };
        }
        self.step()
    }

    /// Result of a length poll: bytes received and the first of them.
    pub fn polled(&mut self, received: usize, byte: u8) -> Step {
        let RelayState::PollLength { attempt } = self.state else {
            return self.step();
        };
        self.state = if received != 1 {
            RelayState::Error(RelayError::I2cShortRead {
                expected: 1,
                actual: received.min(usize::from(u8::MAX)) as u8,
            })
        } else if byte == NOT_READY {
            let next = attempt + 1;
            if next >= self.max_attempts {
                RelayState::Error(RelayError::I2cTimeout {
                    attempts: self.max_attempts,
                })
            } else {
                RelayState::PollLength { attempt: next }
            }
        } else if byte > self.transfer_limit {
            RelayState::Error(RelayError::I2cInvalidLength(byte))
        } else {
            RelayState::ReadData { expected: byte }
        };
        self.step()
    }

    /// Result of the data read.
    pub fn read(&mut self, received: usize) -> Step {
        if let RelayState::ReadData { expected } = self.state {
            self.state = if received == usize::from(expected) {
                RelayState::Done { len: expected }
            } else {
                RelayState::Error(RelayError::I2cShortRead {
                    expected,
                    actual: received.min(usize::from(u8::MAX)) as u8,
                })
            };
        }
        self.step()
    }
}

// ───────────────────────────────────────────────────────────────
// Blocking driver
// ───────────────────────────────────────────────────────────────

/// Runs the relay synchronously on the node's single thread.
pub struct I2cRelay<M, D> {
    bus: M,
    delay: D,
    max_attempts: u8,
    transfer_limit: u8,
}

impl<M: I2cMaster, D: DelayNs> I2cRelay<M, D> {
    pub fn new(bus: M, delay: D, config: &ProtocolConfig) -> Self {
        Self {
            bus,
            delay,
            max_attempts: config.max_i2c_attempts,
            transfer_limit: config.i2c_transfer_limit,
        }
    }

    pub fn bus_mut(&mut self) -> &mut M {
        &mut self.bus
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    pub fn into_parts(self) -> (M, D) {
        (self.bus, self.delay)
    }

    /// Forward `request` to `address` and copy the reply into `out`.
    ///
    /// Returns the reply length.  Blocks for the whole backoff schedule in
    /// the worst case.
    pub fn forward(
        &mut self,
        address: u8,
        request: &[u8],
        out: &mut [u8],
    ) -> Result<usize, RelayError> {
        if request.len() > usize::from(self.transfer_limit) {
            warn!(
                "I2C[0x{:02x}]: request of {} B exceeds transfer limit {}",
                address,
                request.len(),
                self.transfer_limit
            );
            return Err(RelayError::I2cWriteFailed(bus::STATUS_DATA_TOO_LONG));
        }

        let mut machine = RelayMachine::new(self.max_attempts, self.transfer_limit);
        let mut step = machine.step();
        loop {
            step = match step {
                Step::Write => machine.wrote(self.bus.write(address, request)),
                Step::Poll { attempt, delay } => {
                    self.delay.delay_ms(delay.as_millis() as u32);
                    let mut byte = [NOT_READY];
                    let received = self.bus.request_from(address, &mut byte);
                    debug!(
                        "I2C[0x{:02x}]: poll {} -> {} B (0x{:02x})",
                        address, attempt, received, byte[0]
                    );
                    machine.polled(received, byte[0])
                }
                Step::Read { len } => {
                    let len = usize::from(len);
                    let Some(dst) = out.get_mut(..len) else {
                        return Err(RelayError::I2cInvalidLength(len as u8));
                    };
                    machine.read(self.bus.request_from(address, dst))
                }
                Step::Done { len } => {
                    info!("I2C[0x{:02x}]: relayed {} B reply", address, len);
                    return Ok(usize::from(len));
                }
                Step::Failed(e) => {
                    warn!("I2C[0x{:02x}]: {}", address, e);
                    return Err(e);
                }
            };
        }
    }
}

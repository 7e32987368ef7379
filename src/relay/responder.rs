//! Secondary-node side of the relay.
//!
//! Bus callbacks only move bytes; the request itself runs later, from the
//! main loop, in [`I2cResponder::service`].  Until then every length poll
//! is answered with [`NOT_READY`].

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::rpc::engine::CommandProcessor;
use crate::rpc::node::Node;

use super::{I2cMaster, NOT_READY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Idle,
    /// Request stored, not yet processed.
    Pending { len: usize },
    /// Reply ready; next read returns its length.
    Ready { len: usize },
    /// Length sent; next read returns the reply bytes.
    SizeSent { len: usize },
}

/// Slave-side request/response buffer of `N` bytes.
pub struct I2cResponder<const N: usize> {
    buffer: [u8; N],
    state: ResponderState,
}

impl<const N: usize> Default for I2cResponder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> I2cResponder<N> {
    pub fn new() -> Self {
        Self {
            buffer: [0; N],
            state: ResponderState::Idle,
        }
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ResponderState::Pending { .. })
    }

    /// Master wrote `bytes`.
    pub fn on_receive(&mut self, bytes: &[u8]) {
        match self.buffer.get_mut(..bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                self.state = ResponderState::Pending { len: bytes.len() };
            }
            None => {
                warn!("I2C: {} B request exceeds {} B buffer", bytes.len(), N);
                self.state = ResponderState::Ready { len: 0 };
            }
        }
    }

    /// Master reads; fills `out` and returns how many bytes were supplied.
    pub fn on_request(&mut self, out: &mut [u8]) -> usize {
        match self.state {
            ResponderState::SizeSent { len } => {
                let n = len.min(out.len());
                out[..n].copy_from_slice(&self.buffer[..n]);
                self.state = ResponderState::Idle;
                n
            }
            _ if out.is_empty() => 0,
            ResponderState::Ready { len } => {
                out[0] = len as u8;
                self.state = ResponderState::SizeSent { len };
                1
            }
            ResponderState::Idle | ResponderState::Pending { .. } => {
                out[0] = NOT_READY;
                1
            }
        }
    }

    /// Run a pending request through `processor`.  Returns whether one ran.
    ///
    /// A failed request answers with an empty reply.
    pub fn service<Nd, M, D, const CAP: usize>(
        &mut self,
        processor: &mut CommandProcessor<'_, Nd, M, D, CAP>,
    ) -> bool
    where
        Nd: Node,
        M: I2cMaster,
        D: DelayNs,
    {
        let ResponderState::Pending { len } = self.state else {
            return false;
        };
        let reply = match processor.process_command(&mut self.buffer, len) {
            // A length byte of 0xFF would read as "not ready".
            Ok(n) if n < usize::from(NOT_READY) => n,
            Ok(n) => {
                warn!("I2C: {} B reply too long for a length byte", n);
                0
            }
            Err(_) => 0,
        };
        debug!("I2C: request of {} B serviced, reply {} B", len, reply);
        self.state = ResponderState::Ready { len: reply };
        true
    }
}

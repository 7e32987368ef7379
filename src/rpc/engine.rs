//! Command processor: the node-side dispatcher.
//!
//! **Buffer-in, buffer-out**: the processor does not own a transport.
//! Callers hand it the request buffer (code byte first) and the received
//! length; it decodes in place, runs the bound method, and overwrites the
//! front of the same buffer with the response.
//!
//! Every request passes through the same state sequence:
//!
//! ```text
//! AWAIT_BUFFER ──▶ DECODE_HEADER ──▶ DISPATCH ──▶ ENCODE_RESPONSE ──▶ DONE
//!                        │               │
//!                        └───────────────┴──▶ ERROR
//! ```
//!
//! Errors never leave the processor in a different state for the next
//! request.  The built-in relay command is handled here, outside the
//! [`Node`], and its reply bytes go back verbatim.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::error::{DispatchError, RelayError};
use crate::protocol::wire;
use crate::protocol::{Builtin, Protocol};
use crate::relay::bus::STATUS_DATA_TOO_LONG;
use crate::relay::{I2cMaster, I2cRelay, NoBus, NoDelay};
use crate::schema::{Arg, Scalar};

use super::node::{Call, Node, ReturnSlot};

/// Length-addressed failure marker.
pub const ERROR_SENTINEL: u16 = 0xFFFF;

/// Default scratch size; matches the default node buffer.
pub const DEFAULT_SCRATCH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitBuffer,
    DecodeHeader,
    Dispatch,
    EncodeResponse,
    Done,
    Error,
}

/// Diagnostic counters; never consulted while decoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub processed: u32,
    pub rejected: u32,
}

/// Node-side dispatcher over a shared [`Protocol`].
///
/// `CAP` sizes the one scratch buffer used for method results and relay
/// payloads.
pub struct CommandProcessor<'p, N, M = NoBus, D = NoDelay, const CAP: usize = DEFAULT_SCRATCH> {
    protocol: &'p Protocol,
    node: N,
    relay: I2cRelay<M, D>,
    scratch: [u8; CAP],
    state: DispatchState,
    stats: DispatchStats,
}

impl<'p, N: Node, const CAP: usize> CommandProcessor<'p, N, NoBus, NoDelay, CAP> {
    /// Processor without I2C secondaries; relay requests fail with a NACK
    /// status.
    pub fn new(protocol: &'p Protocol, node: N) -> Self {
        let relay = I2cRelay::new(NoBus, NoDelay, protocol.config());
        Self::with_relay(protocol, node, relay)
    }
}

impl<'p, N: Node, M: I2cMaster, D: DelayNs, const CAP: usize> CommandProcessor<'p, N, M, D, CAP> {
    pub fn with_relay(protocol: &'p Protocol, node: N, relay: I2cRelay<M, D>) -> Self {
        Self {
            protocol,
            node,
            relay,
            scratch: [0; CAP],
            state: DispatchState::AwaitBuffer,
            stats: DispatchStats::default(),
        }
    }

    pub fn protocol(&self) -> &'p Protocol {
        self.protocol
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut N {
        &mut self.node
    }

    pub fn relay_mut(&mut self) -> &mut I2cRelay<M, D> {
        &mut self.relay
    }

    /// Terminal state of the last request (`AwaitBuffer` before the first).
    pub fn last_state(&self) -> DispatchState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Process one request held in `buffer[..request_len]`.
    ///
    /// `buffer.len()` is the capacity available for the response.  Returns
    /// the response length written to the front of `buffer`.
    pub fn process_command(
        &mut self,
        buffer: &mut [u8],
        request_len: usize,
    ) -> Result<usize, DispatchError> {
        self.state = DispatchState::AwaitBuffer;
        let result = self.run(buffer, request_len);
        match result {
            Ok(_) => {
                self.state = DispatchState::Done;
                self.stats.processed = self.stats.processed.wrapping_add(1);
            }
            Err(e) => {
                warn!("RPC[0x{:02x}]: {}", buffer.first().copied().unwrap_or(0), e);
                self.state = DispatchState::Error;
                self.stats.rejected = self.stats.rejected.wrapping_add(1);
            }
        }
        result
    }

    /// [`process_command`](Self::process_command) with the length-addressed
    /// result: byte count, or [`ERROR_SENTINEL`].
    pub fn process(&mut self, buffer: &mut [u8], request_len: usize) -> u16 {
        match self.process_command(buffer, request_len) {
            Ok(n) => u16::try_from(n).unwrap_or(ERROR_SENTINEL),
            Err(_) => ERROR_SENTINEL,
        }
    }

    fn run(&mut self, buffer: &mut [u8], request_len: usize) -> Result<usize, DispatchError> {
        if request_len == 0 {
            return Err(DispatchError::MalformedRequest("empty request"));
        }
        if request_len > buffer.len() {
            return Err(DispatchError::MalformedRequest("length exceeds buffer"));
        }

        // ── DECODE_HEADER ─────────────────────────────────────
        self.state = DispatchState::DecodeHeader;
        let protocol = self.protocol;
        let code = buffer[0];
        let command = protocol
            .command(code)
            .ok_or(DispatchError::UnknownCommand(code))?;
        let args = wire::decode_request(command.layout, &buffer[..request_len])?;

        // ── DISPATCH ──────────────────────────────────────────
        self.state = DispatchState::Dispatch;
        if command.builtin() == Some(Builtin::ForwardI2cRequest) {
            let (address, len) = self.stage_relay(&args)?;
            // The reply overwrites the request; release the views first.
            drop(args);
            let n = self.relay.forward(address, &self.scratch[..len], buffer)?;
            self.state = DispatchState::EncodeResponse;
            return Ok(n);
        }

        let call = Call::new(code, command.name(), &args);
        let mut slot = ReturnSlot::new(command.layout.return_type(), &mut self.scratch);
        self.node.call(&call, &mut slot)?;
        let n = slot.finish()?;
        drop(args);

        // ── ENCODE_RESPONSE ───────────────────────────────────
        self.state = DispatchState::EncodeResponse;
        if n > buffer.len() {
            return Err(DispatchError::ResponseOverflow {
                needed: n,
                capacity: buffer.len(),
            });
        }
        buffer[..n].copy_from_slice(&self.scratch[..n]);
        info!("RPC[0x{:02x}]: {} -> {} B", code, command.name(), n);
        Ok(n)
    }

    /// Copy the relay payload out of the request buffer so the reply can
    /// overwrite it.
    fn stage_relay(&mut self, args: &[Arg<'_>]) -> Result<(u8, usize), DispatchError> {
        let [Arg::Scalar(Scalar::Uint8(address)), Arg::Array(payload)] = args else {
            return Err(DispatchError::MalformedRequest("relay arguments"));
        };
        let bytes = payload.as_bytes();
        let dst = self
            .scratch
            .get_mut(..bytes.len())
            .ok_or(RelayError::I2cWriteFailed(STATUS_DATA_TOO_LONG))?;
        dst.copy_from_slice(bytes);
        Ok((*address, bytes.len()))
    }
}

//! Transport abstraction.
//!
//! Two layers:
//! - [`ByteChannel`]: any byte-oriented link (UART, USB CDC, TCP socket).
//! - [`Transport`]: whole messages.  The host proxy only sees this one.
//!
//! [`FramedTransport`] bridges the two with the packet codec, so adding a
//! new link requires zero changes to the RPC logic.

use log::{debug, warn};

use crate::error::{DeviceErrorCode, TransportError};

use super::codec::{FrameDecoder, FrameKind, frame_to_vec};

/// Byte-oriented channel.
pub trait ByteChannel {
    /// Error type for this channel.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read; 0 when nothing arrived
    /// within the channel's own timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the channel.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A null channel that discards all writes and never reads.
/// Useful as a default when nothing is connected.
pub struct NullChannel;

impl ByteChannel for NullChannel {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// One complete message from the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Data(Vec<u8>),
    Nack(DeviceErrorCode),
}

/// Message-level transport used by the host proxy.
///
/// One request in flight at a time: the protocol has no request ids.
pub trait Transport {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError>;

    /// Block until one complete reply arrives.
    fn receive(&mut self) -> Result<Reply, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        (**self).send(request)
    }

    fn receive(&mut self) -> Result<Reply, TransportError> {
        (**self).receive()
    }
}

/// Read chunk size for channel polling.
const READ_CHUNK: usize = 64;

/// [`Transport`] over a [`ByteChannel`] using packet frames.
///
/// `N` bounds the reply payload size.
pub struct FramedTransport<C, const N: usize = 1024> {
    channel: C,
    decoder: FrameDecoder<N>,
    pending: Vec<u8>,
}

impl<C: ByteChannel, const N: usize> FramedTransport<C, N> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            decoder: FrameDecoder::new(),
            pending: Vec::new(),
        }
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    fn channel_error(e: &C::Error) -> TransportError {
        TransportError::Channel(format!("{e:?}"))
    }

    fn abandon_partial(&mut self) {
        if !self.pending.is_empty() {
            debug!("FRAME: dropping {} B of incomplete reply", self.pending.len());
        }
        self.decoder.reset();
        self.pending.clear();
    }

    /// Pull one reply out of already-buffered bytes, if complete.
    fn take_buffered(&mut self) -> Option<Reply> {
        while !self.pending.is_empty() {
            let (used, frame) = self.decoder.feed(&self.pending);
            let reply = frame.map(|f| match f.kind {
                FrameKind::Data => Reply::Data(f.payload.to_vec()),
                FrameKind::Nack => Reply::Nack(DeviceErrorCode::from_bytes(f.payload)),
            });
            self.pending.drain(..used);
            if reply.is_some() {
                return reply;
            }
            if used == 0 {
                break;
            }
        }
        None
    }
}

impl<C: ByteChannel, const N: usize> Transport for FramedTransport<C, N> {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        let frame = frame_to_vec(FrameKind::Data, request).ok_or(TransportError::Parse)?;
        let mut written = 0;
        while written < frame.len() {
            let n = self
                .channel
                .write(&frame[written..])
                .map_err(|e| Self::channel_error(&e))?;
            if n == 0 {
                return Err(TransportError::Channel("channel accepted no bytes".into()));
            }
            written += n;
        }
        self.channel.flush().map_err(|e| Self::channel_error(&e))?;
        debug!("FRAME: sent {} B request", request.len());
        Ok(())
    }

    fn receive(&mut self) -> Result<Reply, TransportError> {
        let discarded_before = self.decoder.discarded();
        loop {
            if let Some(reply) = self.take_buffered() {
                return Ok(reply);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = match self.channel.read(&mut chunk) {
                Ok(n) => n,
                Err(e) => {
                    self.abandon_partial();
                    return Err(Self::channel_error(&e));
                }
            };
            if n == 0 {
                // A half-received reply must not prefix the next one.
                self.abandon_partial();
                // Garbage without a frame reads as a parse failure.
                return Err(if self.decoder.discarded() > discarded_before {
                    warn!("FRAME: no valid reply, stream out of sync");
                    TransportError::Parse
                } else {
                    TransportError::Timeout
                });
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

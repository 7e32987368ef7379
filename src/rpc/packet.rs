//! Node-side packet handler: channel bytes in, framed replies out.
//!
//! Each complete DATA frame is copied into the node buffer and run through
//! the [`CommandProcessor`].  The reply is a DATA frame with the response
//! bytes, or a NACK frame carrying the [`DeviceErrorCode`].

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::error::DeviceErrorCode;
use crate::relay::I2cMaster;

use super::codec::{FrameDecoder, FrameKind, HEADER_SIZE};
use super::engine::CommandProcessor;
use super::node::Node;
use super::transport::ByteChannel;

/// Read chunk size for channel polling.
const READ_CHUNK: usize = 64;

/// Frame decoder plus the node's request/response buffer.
///
/// `N` is the physical buffer size; only the first `buffer_capacity`
/// bytes of the protocol config are used.
pub struct PacketHandler<const N: usize = 256> {
    decoder: FrameDecoder<N>,
    buffer: [u8; N],
}

impl<const N: usize> Default for PacketHandler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketHandler<N> {
    pub fn new() -> Self {
        Self {
            decoder: FrameDecoder::new(),
            buffer: [0; N],
        }
    }

    /// Read what the channel has and answer every complete frame in it.
    ///
    /// Returns the number of frames answered.
    pub fn poll<C, Nd, M, D, const CAP: usize>(
        &mut self,
        channel: &mut C,
        processor: &mut CommandProcessor<'_, Nd, M, D, CAP>,
    ) -> Result<usize, C::Error>
    where
        C: ByteChannel,
        Nd: Node,
        M: I2cMaster,
        D: DelayNs,
    {
        let mut chunk = [0u8; READ_CHUNK];
        let n = channel.read(&mut chunk)?;

        let mut offset = 0;
        let mut answered = 0;
        while offset < n {
            let (used, frame) = self.decoder.feed(&chunk[offset..n]);
            offset += used;
            let Some(frame) = frame else {
                continue;
            };
            let (kind, len) = answer(&mut self.buffer, frame.kind, frame.payload, processor);
            write_frame(channel, kind, &self.buffer[..len])?;
            answered += 1;
        }
        Ok(answered)
    }

    /// Answer one already-decoded frame.  Returns the reply kind and payload.
    pub fn handle_frame<Nd, M, D, const CAP: usize>(
        &mut self,
        kind: FrameKind,
        payload: &[u8],
        processor: &mut CommandProcessor<'_, Nd, M, D, CAP>,
    ) -> (FrameKind, &[u8])
    where
        Nd: Node,
        M: I2cMaster,
        D: DelayNs,
    {
        let (kind, len) = answer(&mut self.buffer, kind, payload, processor);
        (kind, &self.buffer[..len])
    }
}

fn nack(buffer: &mut [u8], code: DeviceErrorCode) -> (FrameKind, usize) {
    buffer[..DeviceErrorCode::LEN].copy_from_slice(&code.to_bytes());
    (FrameKind::Nack, DeviceErrorCode::LEN)
}

fn answer<Nd, M, D, const CAP: usize>(
    buffer: &mut [u8],
    kind: FrameKind,
    payload: &[u8],
    processor: &mut CommandProcessor<'_, Nd, M, D, CAP>,
) -> (FrameKind, usize)
where
    Nd: Node,
    M: I2cMaster,
    D: DelayNs,
{
    if kind != FrameKind::Data || payload.is_empty() {
        warn!("RPC: rejecting {:?} frame of {} B", kind, payload.len());
        return nack(buffer, DeviceErrorCode::BadPacket);
    }

    let capacity = usize::from(processor.protocol().config().buffer_capacity).min(buffer.len());
    if payload.len() > capacity {
        warn!("RPC: {} B request exceeds {} B buffer", payload.len(), capacity);
        return nack(buffer, DeviceErrorCode::MalformedRequest);
    }

    buffer[..payload.len()].copy_from_slice(payload);
    match processor.process_command(&mut buffer[..capacity], payload.len()) {
        Ok(n) => {
            debug!("RPC: reply {} B", n);
            (FrameKind::Data, n)
        }
        Err(e) => nack(buffer, e.into()),
    }
}

fn write_all<C: ByteChannel>(channel: &mut C, mut data: &[u8]) -> Result<(), C::Error> {
    while !data.is_empty() {
        let n = channel.write(data)?;
        if n == 0 {
            warn!("RPC: channel stalled, {} B dropped", data.len());
            break;
        }
        data = &data[n..];
    }
    Ok(())
}

fn write_frame<C: ByteChannel>(
    channel: &mut C,
    kind: FrameKind,
    payload: &[u8],
) -> Result<(), C::Error> {
    let len = payload.len() as u16;
    let [lo, hi] = len.to_le_bytes();
    let header: [u8; HEADER_SIZE] = [kind as u8, lo, hi];
    write_all(channel, &header)?;
    write_all(channel, payload)?;
    channel.flush()
}

//! Packet frame codec for byte-stream links.
//!
//! Wire format:
//! ```text
//! ┌──────────┬────────────┬───────────────────────┐
//! │ Kind (1B)│ Length (2B)│ Payload (N B)         │
//! │          │ LE u16     │ request/response/code │
//! └──────────┴────────────┴───────────────────────┘
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete frames.
//! This handles partial reads gracefully: a single channel read may return
//! part of the header, part of the payload, or several frames back to back.
//! An invalid header is dropped one byte at a time until the stream lines
//! up with a valid one again.

use log::debug;

/// Frame header size (kind + LE-u16 length).
pub const HEADER_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Request (host to node) or response (node to host).
    Data = 0x01,
    /// Node rejected the request; payload is a `DeviceErrorCode`.
    Nack = 0x02,
}

impl FrameKind {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Data),
            0x02 => Some(Self::Nack),
            _ => None,
        }
    }
}

/// A complete frame borrowed from the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: FrameKind,
    pub payload: &'a [u8],
}

/// Decoder state machine.
enum DecoderState {
    /// Waiting for header bytes.
    ReadingHeader { collected: usize },
    /// Header received, reading payload.
    ReadingPayload {
        kind: FrameKind,
        expected: usize,
        collected: usize,
    },
}

/// Streaming frame decoder with an `N`-byte payload ceiling.
pub struct FrameDecoder<const N: usize> {
    state: DecoderState,
    header_buf: [u8; HEADER_SIZE],
    payload_buf: [u8; N],
    discarded: usize,
}

impl<const N: usize> Default for FrameDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameDecoder<N> {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header_buf: [0; HEADER_SIZE],
            payload_buf: [0; N],
            discarded: 0,
        }
    }

    /// Bytes dropped while resynchronizing, since construction.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns how many bytes of `data` were consumed and, when a frame
    /// completed, the frame.  Consumption stops right after a completed
    /// frame; feed the remainder in the next call.  The frame is valid until
    /// the next call to `feed`.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<Frame<'_>>) {
        let mut offset = 0;

        // Zero-length frames complete as soon as their header does.
        let mut completed: Option<(FrameKind, usize)> = None;

        while offset < data.len() && completed.is_none() {
            match &mut self.state {
                DecoderState::ReadingHeader { collected } => {
                    self.header_buf[*collected] = data[offset];
                    *collected += 1;
                    offset += 1;

                    if *collected < HEADER_SIZE {
                        continue;
                    }

                    let kind = FrameKind::from_u8(self.header_buf[0]);
                    let expected =
                        usize::from(u16::from_le_bytes([self.header_buf[1], self.header_buf[2]]));

                    match kind {
                        Some(kind) if expected <= N => {
                            if expected == 0 {
                                self.state = DecoderState::ReadingHeader { collected: 0 };
                                completed = Some((kind, 0));
                            } else {
                                self.state = DecoderState::ReadingPayload {
                                    kind,
                                    expected,
                                    collected: 0,
                                };
                            }
                        }
                        _ => {
                            // Invalid header: slide by one byte and retry.
                            debug!(
                                "FRAME: dropping byte 0x{:02x} (bad header)",
                                self.header_buf[0]
                            );
                            self.header_buf.copy_within(1.., 0);
                            self.state = DecoderState::ReadingHeader {
                                collected: HEADER_SIZE - 1,
                            };
                            self.discarded += 1;
                        }
                    }
                }

                DecoderState::ReadingPayload {
                    kind,
                    expected,
                    collected,
                } => {
                    let needed = *expected - *collected;
                    let available = data.len() - offset;
                    let to_copy = needed.min(available);

                    self.payload_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);

                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        completed = Some((*kind, *expected));
                        self.state = DecoderState::ReadingHeader { collected: 0 };
                    }
                }
            }
        }

        let frame = completed.map(|(kind, len)| Frame {
            kind,
            payload: &self.payload_buf[..len],
        });
        (offset, frame)
    }

    /// Reset decoder state (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
    }
}

/// Encode a payload into a frame.
///
/// Writes `[kind][LE-u16 length][payload]` into `out_buf`.
/// Returns the total number of bytes written.
pub fn encode_frame(kind: FrameKind, payload: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    let len = u16::try_from(payload.len()).ok()?;
    let total = HEADER_SIZE + payload.len();
    if total > out_buf.len() {
        return None;
    }

    out_buf[0] = kind as u8;
    out_buf[1..HEADER_SIZE].copy_from_slice(&len.to_le_bytes());
    out_buf[HEADER_SIZE..total].copy_from_slice(payload);

    Some(total)
}

/// Heap-allocating variant for the host.
pub fn frame_to_vec(kind: FrameKind, payload: &[u8]) -> Option<Vec<u8>> {
    let mut out = vec![0u8; HEADER_SIZE + payload.len()];
    encode_frame(kind, payload, &mut out)?;
    Some(out)
}

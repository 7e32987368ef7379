//! Mock adapters for integration tests.
//!
//! Simulated I2C secondaries, a delay that records instead of sleeping,
//! and an in-memory serial link that runs a node behind a host transport.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use nanorpc::config::ProtocolConfig;
use nanorpc::protocol::Protocol;
use nanorpc::relay::bus::{STATUS_NACK_ADDRESS, STATUS_OK};
use nanorpc::relay::{I2cMaster, I2cResponder, NOT_READY};
use nanorpc::rpc::{ByteChannel, Call, CommandProcessor, Node, PacketHandler, ReturnSlot};
use nanorpc::schema::{AtomType, InterfaceDescription, MethodSignature, TypeSpec};
use nanorpc::HandlerError;

// ── Demo interface ────────────────────────────────────────────

/// Methods every test node implements, in declaration order:
/// 0x80 `ram_free`, 0x81 `add`, 0x82 `sum`, 0x83 `reverse`, 0x84 `set_led`.
pub fn board_interface() -> InterfaceDescription {
    InterfaceDescription::new(vec![
        MethodSignature::new("ram_free").returns(TypeSpec::Scalar(AtomType::Uint16)),
        MethodSignature::new("add")
            .arg("a", TypeSpec::Scalar(AtomType::Int32))
            .arg("b", TypeSpec::Scalar(AtomType::Int32))
            .returns(TypeSpec::Scalar(AtomType::Int32)),
        MethodSignature::new("sum")
            .arg("values", TypeSpec::Array(AtomType::Int16))
            .returns(TypeSpec::Scalar(AtomType::Int32)),
        MethodSignature::new("reverse")
            .arg("data", TypeSpec::Array(AtomType::Uint8))
            .returns(TypeSpec::Array(AtomType::Uint8)),
        MethodSignature::new("set_led").arg("on", TypeSpec::Scalar(AtomType::Bool)),
    ])
}

pub fn board_protocol() -> Protocol {
    Protocol::build(&[board_interface()], ProtocolConfig::default()).unwrap()
}

/// Node implementing [`board_interface`], with observable state.
#[derive(Debug, Default)]
pub struct Board {
    pub led: bool,
    pub calls: u32,
}

impl Node for Board {
    fn call(&mut self, call: &Call<'_>, ret: &mut ReturnSlot<'_>) -> Result<(), HandlerError> {
        self.calls += 1;
        match call.name {
            "ram_free" => ret.set(1234u16),
            "add" => ret.set(call.scalar::<i32>(0)?.wrapping_add(call.scalar::<i32>(1)?)),
            "sum" => ret.set(call.array(0)?.iter_as::<i16>().map(i32::from).sum::<i32>()),
            "reverse" => {
                let mut bytes = call.array(0)?.as_bytes().to_vec();
                bytes.reverse();
                ret.set_array(&bytes)
            }
            "set_led" => {
                self.led = call.scalar::<bool>(0)?;
                Ok(())
            }
            _ => Err(HandlerError::Failed),
        }
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Records every requested delay in milliseconds.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}

// ── Scripted secondary ────────────────────────────────────────

/// Secondary that answers `not_ready` polls with 0xFF, then `length`,
/// then serves `reply` on the data read.
#[derive(Debug, Default)]
pub struct ScriptedSlave {
    pub address: u8,
    pub not_ready: usize,
    pub length: Option<u8>,
    pub reply: Vec<u8>,
    /// Bytes actually delivered on the data read; defaults to `reply.len()`.
    pub deliver: Option<usize>,
    pub writes: Vec<Vec<u8>>,
    pub polls: usize,
    pub data_reads: usize,
}

impl ScriptedSlave {
    pub fn new(address: u8, not_ready: usize, reply: &[u8]) -> Self {
        Self {
            address,
            not_ready,
            reply: reply.to_vec(),
            ..Self::default()
        }
    }
}

impl I2cMaster for ScriptedSlave {
    fn write(&mut self, address: u8, bytes: &[u8]) -> u8 {
        if address != self.address {
            return STATUS_NACK_ADDRESS;
        }
        self.writes.push(bytes.to_vec());
        STATUS_OK
    }

    fn request_from(&mut self, address: u8, buf: &mut [u8]) -> usize {
        if address != self.address {
            return 0;
        }
        // One-byte reads are length polls until the length went out.
        if buf.len() == 1 && self.polls <= self.not_ready {
            self.polls += 1;
            buf[0] = if self.polls <= self.not_ready {
                NOT_READY
            } else {
                self.length.unwrap_or(self.reply.len() as u8)
            };
            return 1;
        }
        self.data_reads += 1;
        let n = self.deliver.unwrap_or(self.reply.len()).min(buf.len());
        buf[..n].copy_from_slice(&self.reply[..n]);
        n
    }
}

// ── Responder-backed secondary ────────────────────────────────

/// A full secondary node on the bus: its responder plus its own processor.
///
/// The secondary's main loop services the pending request after
/// `service_after` polls have been answered with 0xFF.
pub struct SecondaryBus<'p, N: Node> {
    pub address: u8,
    pub responder: I2cResponder<80>,
    pub processor: CommandProcessor<'p, N>,
    pub service_after: usize,
    pub polls: usize,
}

impl<'p, N: Node> SecondaryBus<'p, N> {
    pub fn new(address: u8, protocol: &'p Protocol, node: N, service_after: usize) -> Self {
        Self {
            address,
            responder: I2cResponder::new(),
            processor: CommandProcessor::new(protocol, node),
            service_after,
            polls: 0,
        }
    }
}

impl<N: Node> I2cMaster for SecondaryBus<'_, N> {
    fn write(&mut self, address: u8, bytes: &[u8]) -> u8 {
        if address != self.address {
            return STATUS_NACK_ADDRESS;
        }
        self.polls = 0;
        self.responder.on_receive(bytes);
        STATUS_OK
    }

    fn request_from(&mut self, address: u8, buf: &mut [u8]) -> usize {
        if address != self.address {
            return 0;
        }
        if self.responder.is_pending() {
            if self.polls >= self.service_after {
                self.responder.service(&mut self.processor);
            }
            self.polls += 1;
        }
        self.responder.on_request(buf)
    }
}

// ── Serial link ───────────────────────────────────────────────

/// One byte stream direction.
#[derive(Debug, Default)]
pub struct Pipe {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl ByteChannel for Pipe {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.input.len());
        for (dst, src) in buf.iter_mut().zip(self.input.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.output.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// Host end of a serial link whose far end is a live node.
///
/// Bytes the host writes are run through the node's packet handler as
/// soon as the host reads.
pub struct NodeLink<'p, N: Node, M: I2cMaster = nanorpc::relay::NoBus, D: DelayNs = nanorpc::relay::NoDelay> {
    pub handler: PacketHandler<256>,
    pub processor: CommandProcessor<'p, N, M, D>,
    to_node: Pipe,
    from_node: VecDeque<u8>,
    /// XOR mask applied to the next reply's bytes, for corruption tests.
    pub garble_next: Option<u8>,
    pub frames_answered: usize,
}

impl<'p, N: Node, M: I2cMaster, D: DelayNs> NodeLink<'p, N, M, D> {
    pub fn new(processor: CommandProcessor<'p, N, M, D>) -> Self {
        Self {
            handler: PacketHandler::new(),
            processor,
            to_node: Pipe::default(),
            from_node: VecDeque::new(),
            garble_next: None,
            frames_answered: 0,
        }
    }

    fn run_node(&mut self) {
        while !self.to_node.input.is_empty() {
            match self.handler.poll(&mut self.to_node, &mut self.processor) {
                Ok(n) => self.frames_answered += n,
                Err(()) => break,
            }
        }
        let mut reply: Vec<u8> = self.to_node.output.drain(..).collect();
        if let Some(mask) = self.garble_next.take() {
            for b in &mut reply {
                *b ^= mask;
            }
        }
        self.from_node.extend(reply);
    }
}

impl<N: Node, M: I2cMaster, D: DelayNs> ByteChannel for NodeLink<'_, N, M, D> {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        if self.from_node.is_empty() {
            self.run_node();
        }
        let n = buf.len().min(self.from_node.len());
        for (dst, src) in buf.iter_mut().zip(self.from_node.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.to_node.input.extend(data.iter().copied());
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

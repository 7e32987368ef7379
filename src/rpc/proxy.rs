//! Host-side proxy: the inverse of the command processor.
//!
//! ```text
//!   call("add", [2, 3])
//!        │ encode_request (code, struct, array bytes)
//!        ▼
//!   Transport::send ──▶ node ──▶ Transport::receive
//!                                     │ DATA: decode_response
//!                                     │ NACK: ProxyError::Rejected
//!                                     ▼
//!                               Option<Value>
//! ```
//!
//! One call in flight per transport.  Nothing is retried here; transport
//! timeouts and parse errors go straight to the caller.

use log::{debug, warn};

use crate::error::ProxyError;
use crate::protocol::builtin::FORWARD_I2C_REQUEST_NAME;
use crate::protocol::{Command, Protocol, wire};
use crate::schema::{Array, Value};

use super::transport::{Reply, Transport};

pub struct Proxy<'p, T> {
    protocol: &'p Protocol,
    transport: T,
}

impl<'p, T: Transport> Proxy<'p, T> {
    pub fn new(protocol: &'p Protocol, transport: T) -> Self {
        Self {
            protocol,
            transport,
        }
    }

    pub fn protocol(&self) -> &'p Protocol {
        self.protocol
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn command(&self, name: &str) -> Result<Command<'p>, ProxyError> {
        self.protocol
            .command_by_name(name)
            .ok_or_else(|| ProxyError::UnknownMethod(name.into()))
    }

    /// Invoke `name` on the node and decode its return value.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, ProxyError> {
        let command = self.command(name)?;
        let request = wire::encode_request(command.code(), command.layout, args)?;
        let reply = self.exchange(&request)?;
        wire::decode_response(command.layout, &reply)
    }

    /// Send `payload` to the secondary node at `address` through the
    /// built-in relay command; returns the secondary's raw reply.
    pub fn forward_i2c_request(&mut self, address: u8, payload: &[u8]) -> Result<Vec<u8>, ProxyError> {
        let args = [Value::from(address), Value::Array(Array::of(payload))];
        match self.call(FORWARD_I2C_REQUEST_NAME, &args)? {
            Some(Value::Array(reply)) => Ok(reply.as_bytes().to_vec()),
            _ => Err(ProxyError::MalformedResponse("relay returned no bytes")),
        }
    }

    /// Invoke `name` on the secondary at `address`, relayed by the node.
    ///
    /// The secondary must run the same protocol.
    pub fn call_remote(
        &mut self,
        address: u8,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ProxyError> {
        let command = self.command(name)?;
        let inner = wire::encode_request(command.code(), command.layout, args)?;
        let reply = self.forward_i2c_request(address, &inner)?;
        wire::decode_response(command.layout, &reply)
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ProxyError> {
        let capacity = self.protocol.config().buffer_capacity;
        if request.len() > usize::from(capacity) {
            return Err(ProxyError::RequestTooLarge {
                size: request.len(),
                capacity,
            });
        }

        self.transport.send(request)?;
        match self.transport.receive()? {
            Reply::Data(bytes) => {
                debug!("PROXY: 0x{:02x} -> {} B", request[0], bytes.len());
                Ok(bytes)
            }
            Reply::Nack(code) => {
                warn!("PROXY: 0x{:02x} rejected: {}", request[0], code);
                Err(ProxyError::Rejected(code))
            }
        }
    }
}

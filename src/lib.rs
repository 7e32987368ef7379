//! nanorpc: struct-layout command dispatch for small nodes.
//!
//! One [`Protocol`] artifact, built from interface descriptions, is shared
//! by both ends.  The node runs a [`CommandProcessor`] over its fixed
//! buffer; the host calls methods through a [`Proxy`].  Requests for
//! secondary nodes are relayed over I2C.

#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod rpc;
pub mod schema;

pub use config::ProtocolConfig;
pub use error::{
    BuildError, DeviceErrorCode, DispatchError, Error, HandlerError, ProxyError, RelayError,
    Result, TransportError,
};
pub use protocol::Protocol;
pub use relay::{I2cRelay, I2cResponder};
pub use rpc::{CommandProcessor, ERROR_SENTINEL, Node, Proxy, SharedProxy};
pub use schema::{AtomType, InterfaceDescription, MethodSignature, TypeSpec, Value};

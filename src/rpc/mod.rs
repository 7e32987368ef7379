//! Runtime RPC: node-side dispatch, host-side proxy, and the link between.
//!
//! ```text
//! ┌─────────────────────────── host ───────────────────────────┐
//! │  Proxy ──▶ Transport (trait) ──▶ FramedTransport ──▶ codec │
//! └──────────────────────────────────────────────┬─────────────┘
//!                                                │ ByteChannel
//! ┌─────────────────────────── node ─────────────▼─────────────┐
//! │  PacketHandler ──▶ CommandProcessor ──▶ Node (user code)   │
//! │                          │                                 │
//! │                          └──▶ I2cRelay ──▶ secondary nodes │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod engine;
pub mod node;
pub mod packet;
pub mod proxy;
pub mod shared;
pub mod transport;

pub use codec::{Frame, FrameDecoder, FrameKind, encode_frame};
pub use engine::{CommandProcessor, DispatchState, DispatchStats, ERROR_SENTINEL};
pub use node::{Call, Node, ReturnSlot};
pub use packet::PacketHandler;
pub use proxy::Proxy;
pub use shared::SharedProxy;
pub use transport::{ByteChannel, FramedTransport, NullChannel, Reply, Transport};

//! Unified error types for nanorpc.
//!
//! One enum per failure domain, each convertible into the top-level
//! [`Error`].  Runtime errors on the node side are `Copy` so they can be
//! passed out of the dispatch path without allocation; build and host
//! errors may carry method names.

use core::fmt;

use crate::schema::TypeSpec;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The command table or layouts could not be built.
    Build(BuildError),
    /// A request could not be dispatched on the node.
    Dispatch(DispatchError),
    /// A host-side call failed.
    Proxy(ProxyError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(e) => write!(f, "build: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Proxy(e) => write!(f, "proxy: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Build-time errors
// ---------------------------------------------------------------------------

/// Configuration bugs detected while building the protocol.  Always fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Two surviving methods ended up on the same command code.
    DuplicateCommandCode { code: u8, first: String, second: String },
    /// A source declares more methods than `source_stride` leaves room for.
    StrideTooSmall { source_index: usize, methods: usize, stride: u8 },
    /// A computed code does not fit in one byte.
    CodeOverflow { method: String, code: usize },
    /// A method name appears twice within one source.
    DuplicateMethod { source_index: usize, name: String },
    /// A user method uses the name of a built-in command.
    ReservedName(String),
    /// Two arguments of one method share a name.
    DuplicateArgument { method: String, name: String },
    /// More arguments than the node can decode in one call.
    TooManyArguments { method: String, count: usize, max: usize },
    /// The request (plus command byte) does not fit the node buffer.
    LayoutTooLarge { method: String, size: usize, capacity: u16 },
    InvalidConfig(&'static str),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCommandCode {
                code,
                first,
                second,
            } => write!(
                f,
                "command code 0x{code:02x} assigned to both `{first}` and `{second}`"
            ),
            Self::StrideTooSmall {
                source_index,
                methods,
                stride,
            } => write!(
                f,
                "source {source_index} has {methods} methods but stride is {stride}"
            ),
            Self::CodeOverflow { method, code } => {
                write!(f, "code {code:#x} for `{method}` exceeds one byte")
            }
            Self::DuplicateMethod { source_index, name } => {
                write!(f, "method `{name}` declared twice in source {source_index}")
            }
            Self::ReservedName(name) => write!(f, "`{name}` is a built-in command name"),
            Self::DuplicateArgument { method, name } => {
                write!(f, "argument `{name}` declared twice in `{method}`")
            }
            Self::TooManyArguments { method, count, max } => {
                write!(f, "`{method}` takes {count} arguments, at most {max} supported")
            }
            Self::LayoutTooLarge {
                method,
                size,
                capacity,
            } => write!(
                f,
                "request for `{method}` needs {size} bytes, buffer holds {capacity}"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl From<BuildError> for Error {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

// ---------------------------------------------------------------------------
// I2C relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// Master write ended with a non-zero bus status.
    I2cWriteFailed(u8),
    /// The secondary reported a length above the transfer limit.
    I2cInvalidLength(u8),
    /// The secondary never reported a length within the retry budget.
    I2cTimeout { attempts: u8 },
    /// A master read returned a different byte count than requested.
    I2cShortRead { expected: u8, actual: u8 },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2cWriteFailed(status) => write!(f, "I2C write failed (status {status})"),
            Self::I2cInvalidLength(n) => write!(f, "I2C secondary reported invalid length {n}"),
            Self::I2cTimeout { attempts } => {
                write!(f, "I2C secondary not ready after {attempts} polls")
            }
            Self::I2cShortRead { expected, actual } => {
                write!(f, "I2C read returned {actual} of {expected} bytes")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Node dispatch errors
// ---------------------------------------------------------------------------

/// Failures reported by a bound method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    /// The method itself reported failure.
    Failed,
    /// The method asked for an argument of the wrong type or position.
    ArgumentMismatch,
    /// The method produced a value of the wrong type (or none when one was
    /// declared).
    ReturnMismatch,
    /// An array result did not fit the scratch buffer.
    ResultTooLarge,
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "method failed"),
            Self::ArgumentMismatch => write!(f, "argument does not match signature"),
            Self::ReturnMismatch => write!(f, "return value does not match signature"),
            Self::ResultTooLarge => write!(f, "array result exceeds scratch buffer"),
        }
    }
}

/// Recoverable request failures on the node.  Each one turns into the
/// error sentinel and leaves the processor ready for the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    UnknownCommand(u8),
    /// A descriptor or the struct header would read outside the request.
    MalformedRequest(&'static str),
    /// The response does not fit the buffer.
    ResponseOverflow { needed: usize, capacity: usize },
    Handler(HandlerError),
    Relay(RelayError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(code) => write!(f, "unknown command 0x{code:02x}"),
            Self::MalformedRequest(why) => write!(f, "malformed request: {why}"),
            Self::ResponseOverflow { needed, capacity } => {
                write!(f, "response needs {needed} bytes, buffer holds {capacity}")
            }
            Self::Handler(e) => write!(f, "handler: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
        }
    }
}

impl From<HandlerError> for DispatchError {
    fn from(e: HandlerError) -> Self {
        Self::Handler(e)
    }
}

impl From<RelayError> for DispatchError {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Wire error code (NACK payload)
// ---------------------------------------------------------------------------

/// Two-byte `[kind, detail]` code a node sends back in a NACK frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorCode {
    UnknownCommand(u8),
    MalformedRequest,
    ResponseOverflow,
    HandlerFailed,
    I2cWriteFailed(u8),
    I2cInvalidLength(u8),
    I2cTimeout,
    I2cShortRead,
    /// The node rejected the frame itself (wrong packet kind, empty).
    BadPacket,
    /// A kind byte this host does not know.
    Other(u8, u8),
}

impl DeviceErrorCode {
    pub const LEN: usize = 2;

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        match self {
            Self::UnknownCommand(code) => [1, code],
            Self::MalformedRequest => [2, 0],
            Self::ResponseOverflow => [3, 0],
            Self::HandlerFailed => [4, 0],
            Self::I2cWriteFailed(status) => [5, status],
            Self::I2cInvalidLength(n) => [6, n],
            Self::I2cTimeout => [7, 0],
            Self::I2cShortRead => [8, 0],
            Self::BadPacket => [9, 0],
            Self::Other(kind, detail) => [kind, detail],
        }
    }

    /// Decode a NACK payload.  Short payloads decode as `Other`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let (kind, detail) = match bytes {
            [k, d, ..] => (*k, *d),
            [k] => (*k, 0),
            [] => (0, 0),
        };
        match kind {
            1 => Self::UnknownCommand(detail),
            2 => Self::MalformedRequest,
            3 => Self::ResponseOverflow,
            4 => Self::HandlerFailed,
            5 => Self::I2cWriteFailed(detail),
            6 => Self::I2cInvalidLength(detail),
            7 => Self::I2cTimeout,
            8 => Self::I2cShortRead,
            9 => Self::BadPacket,
            _ => Self::Other(kind, detail),
        }
    }
}

impl From<DispatchError> for DeviceErrorCode {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::UnknownCommand(code) => Self::UnknownCommand(code),
            DispatchError::MalformedRequest(_) => Self::MalformedRequest,
            DispatchError::ResponseOverflow { .. } => Self::ResponseOverflow,
            DispatchError::Handler(_) => Self::HandlerFailed,
            DispatchError::Relay(RelayError::I2cWriteFailed(s)) => Self::I2cWriteFailed(s),
            DispatchError::Relay(RelayError::I2cInvalidLength(n)) => Self::I2cInvalidLength(n),
            DispatchError::Relay(RelayError::I2cTimeout { .. }) => Self::I2cTimeout,
            DispatchError::Relay(RelayError::I2cShortRead { .. }) => Self::I2cShortRead,
        }
    }
}

impl fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(code) => write!(f, "unknown command 0x{code:02x}"),
            Self::MalformedRequest => write!(f, "malformed request"),
            Self::ResponseOverflow => write!(f, "response overflow"),
            Self::HandlerFailed => write!(f, "handler failed"),
            Self::I2cWriteFailed(s) => write!(f, "I2C write failed (status {s})"),
            Self::I2cInvalidLength(n) => write!(f, "I2C invalid length {n}"),
            Self::I2cTimeout => write!(f, "I2C timeout"),
            Self::I2cShortRead => write!(f, "I2C short read"),
            Self::BadPacket => write!(f, "bad packet"),
            Self::Other(k, d) => write!(f, "device error {k}/{d}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport + host errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No complete message arrived in time.
    Timeout,
    /// The byte stream could not be parsed into a message.
    Parse,
    /// The underlying channel reported an error.
    Channel(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for response"),
            Self::Parse => write!(f, "error parsing response"),
            Self::Channel(msg) => write!(f, "channel error: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProxyError {
    UnknownMethod(String),
    ArgumentCount { expected: usize, actual: usize },
    ArgumentType { index: usize, expected: TypeSpec, actual: TypeSpec },
    /// The encoded request exceeds the node buffer.
    RequestTooLarge { size: usize, capacity: u16 },
    Transport(TransportError),
    /// The node answered with a NACK.
    Rejected(DeviceErrorCode),
    MalformedResponse(&'static str),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod(name) => write!(f, "unknown method `{name}`"),
            Self::ArgumentCount { expected, actual } => {
                write!(f, "expected {expected} arguments, got {actual}")
            }
            Self::ArgumentType {
                index,
                expected,
                actual,
            } => write!(f, "argument {index}: expected {expected}, got {actual}"),
            Self::RequestTooLarge { size, capacity } => {
                write!(f, "request is {size} bytes, node buffer holds {capacity}")
            }
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Rejected(code) => write!(f, "rejected by node: {code}"),
            Self::MalformedResponse(why) => write!(f, "malformed response: {why}"),
        }
    }
}

impl From<TransportError> for ProxyError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ProxyError> for Error {
    fn from(e: ProxyError) -> Self {
        Self::Proxy(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;

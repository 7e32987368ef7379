//! Commands every node understands, below the user code range.

use crate::schema::{AtomType, MethodSignature, TypeSpec};

/// Relay a request to a secondary node on the I2C bus.
pub const FORWARD_I2C_REQUEST: u8 = 0x10;

pub const FORWARD_I2C_REQUEST_NAME: &str = "forward_i2c_request";

/// Identity of a built-in command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Builtin {
    ForwardI2cRequest,
}

impl Builtin {
    pub const fn code(self) -> u8 {
        match self {
            Self::ForwardI2cRequest => FORWARD_I2C_REQUEST,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ForwardI2cRequest => FORWARD_I2C_REQUEST_NAME,
        }
    }

    /// `forward_i2c_request(address: uint8, request: uint8[]) -> uint8[]`
    pub fn signature(self) -> MethodSignature {
        match self {
            Self::ForwardI2cRequest => MethodSignature::new(FORWARD_I2C_REQUEST_NAME)
                .arg("address", TypeSpec::Scalar(AtomType::Uint8))
                .arg("request", TypeSpec::Array(AtomType::Uint8))
                .returns(TypeSpec::Array(AtomType::Uint8)),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        (name == FORWARD_I2C_REQUEST_NAME).then_some(Self::ForwardI2cRequest)
    }
}

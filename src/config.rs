//! Protocol configuration parameters
//!
//! All tunable parameters shared by the build step, the node and the host.
//! Values are normally loaded from the same JSON file the signature
//! extractor writes next to its interface descriptions.

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::protocol::builtin::{Builtin, FORWARD_I2C_REQUEST};
use crate::protocol::layout::StructLayout;

/// Core protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    // --- Command table ---
    /// First code handed to user methods; everything below is reserved
    pub starting_value: u8,
    /// Code offset between merged interface sources
    pub source_stride: u8,

    // --- Node ---
    /// Fixed request/response buffer size on the node (bytes)
    pub buffer_capacity: u16,

    // --- I2C relay ---
    /// Include the built-in relay command in the table
    pub enable_i2c_relay: bool,
    /// Length polls before the relay gives up
    pub max_i2c_attempts: u8,
    /// Hardware transfer-size ceiling for a single I2C read (bytes)
    pub i2c_transfer_limit: u8,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            // Command table
            starting_value: 0x80,
            source_stride: 0x20,

            // Node
            buffer_capacity: 80, // serial packet size on small AVR parts

            // I2C relay
            enable_i2c_relay: true,
            max_i2c_attempts: 21,
            i2c_transfer_limit: 32, // Wire library buffer
        }
    }
}

impl ProtocolConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Reject settings no protocol could be built from.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.starting_value <= FORWARD_I2C_REQUEST {
            return Err(BuildError::InvalidConfig(
                "starting_value must be above the reserved built-in codes",
            ));
        }
        if self.source_stride == 0 {
            return Err(BuildError::InvalidConfig("source_stride must be non-zero"));
        }
        if self.max_i2c_attempts == 0 {
            return Err(BuildError::InvalidConfig("max_i2c_attempts must be non-zero"));
        }
        if self.i2c_transfer_limit == 0 || self.i2c_transfer_limit == 0xFF {
            return Err(BuildError::InvalidConfig(
                "i2c_transfer_limit must be in 1..=254 (0xFF means not ready)",
            ));
        }
        if usize::from(self.buffer_capacity) < usize::from(self.i2c_transfer_limit) {
            return Err(BuildError::InvalidConfig(
                "buffer_capacity must hold a full I2C transfer",
            ));
        }
        if self.enable_i2c_relay {
            // Code byte, relay struct, then a payload at the transfer limit.
            let relay = StructLayout::build(&Builtin::ForwardI2cRequest.signature(), self)?;
            if relay.header_len() + usize::from(self.i2c_transfer_limit)
                > usize::from(self.buffer_capacity)
            {
                return Err(BuildError::InvalidConfig(
                    "buffer_capacity must hold a relay request at the I2C transfer limit",
                ));
            }
        }
        Ok(())
    }
}

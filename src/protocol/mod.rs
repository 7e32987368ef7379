//! The shared protocol artifact.
//!
//! ```text
//! InterfaceDescription(s) ──▶ CommandTable ──▶ StructLayout per code
//!                                  │
//!                                  ▼
//!                        Protocol (postcard bytes)
//!                         ╱                    ╲
//!              CommandProcessor (node)     Proxy (host)
//! ```
//!
//! Built once, then read-only.  Host and node must load the same bytes.

pub mod builtin;
pub mod layout;
pub mod table;
pub mod wire;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::error::BuildError;
use crate::schema::{InterfaceDescription, MethodSignature};

pub use builtin::{Builtin, FORWARD_I2C_REQUEST};
pub use layout::{Encoding, FieldLayout, StructLayout};
pub use table::{CommandEntry, CommandSource, CommandTable};

/// Command table, layouts and config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    config: ProtocolConfig,
    table: CommandTable,
    /// Parallel to `table.entries()`.
    layouts: Vec<StructLayout>,
}

/// One command with its layout.
#[derive(Debug, Clone, Copy)]
pub struct Command<'p> {
    pub entry: &'p CommandEntry,
    pub layout: &'p StructLayout,
}

impl Command<'_> {
    pub fn code(&self) -> u8 {
        self.entry.code
    }

    pub fn name(&self) -> &str {
        &self.entry.method.name
    }

    pub fn method(&self) -> &MethodSignature {
        &self.entry.method
    }

    pub fn builtin(&self) -> Option<Builtin> {
        match self.entry.source {
            CommandSource::Builtin(b) => Some(b),
            CommandSource::Interface(_) => None,
        }
    }
}

impl Protocol {
    pub fn build(
        sources: &[InterfaceDescription],
        config: ProtocolConfig,
    ) -> Result<Self, BuildError> {
        let table = CommandTable::build(sources, &config)?;
        let layouts = table
            .entries()
            .iter()
            .map(|e| StructLayout::build(&e.method, &config))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "PROTOCOL: {} commands, buffer {} B",
            table.len(),
            config.buffer_capacity
        );
        Ok(Self {
            config,
            table,
            layouts,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    fn at(&self, index: usize) -> Option<Command<'_>> {
        Some(Command {
            entry: self.table.entries().get(index)?,
            layout: self.layouts.get(index)?,
        })
    }

    pub fn command(&self, code: u8) -> Option<Command<'_>> {
        self.at(self.table.index_of(code)?)
    }

    pub fn command_by_name(&self, name: &str) -> Option<Command<'_>> {
        self.at(self.table.index_of_name(name)?)
    }

    /// All commands in code order.
    pub fn commands(&self) -> impl Iterator<Item = Command<'_>> {
        (0..self.table.len()).filter_map(|i| self.at(i))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

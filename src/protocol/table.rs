//! Command-code assignment.
//!
//! Each method gets `starting_value + declaration_index`, shifted by
//! `source_stride * source_index` for its source.  When a name occurs in
//! several sources, the last source in merge order wins and the earlier
//! occurrences are dropped before codes are checked for collisions.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::error::BuildError;
use crate::schema::{InterfaceDescription, MethodSignature};

use super::builtin::Builtin;

/// Where a table entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSource {
    Builtin(Builtin),
    /// Merge position of the interface source.
    Interface(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub code: u8,
    pub source: CommandSource,
    pub method: MethodSignature,
}

/// Immutable `code -> method` mapping, sorted by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Build the table from one or more interface sources.
    pub fn build(
        sources: &[InterfaceDescription],
        config: &ProtocolConfig,
    ) -> Result<Self, BuildError> {
        config.validate()?;

        // Merge order: explicit source_index, then position.
        let mut ordered: Vec<(usize, &InterfaceDescription)> = sources
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.source_index.unwrap_or(pos), s))
            .collect();
        ordered.sort_by_key(|(idx, _)| *idx);

        // Provisional codes; later sources shadow earlier ones by name.
        let mut survivors: HashMap<&str, (usize, usize, &MethodSignature)> = HashMap::new();
        for (source_index, source) in &ordered {
            let mut seen = HashSet::new();
            for (decl, method) in source.methods.iter().enumerate() {
                if !seen.insert(method.name.as_str()) {
                    return Err(BuildError::DuplicateMethod {
                        source_index: *source_index,
                        name: method.name.clone(),
                    });
                }
                if Builtin::from_name(&method.name).is_some() {
                    return Err(BuildError::ReservedName(method.name.clone()));
                }
                let code = usize::from(config.starting_value)
                    + decl
                    + usize::from(config.source_stride) * source_index;
                if let Some((prev_source, prev_code, _)) =
                    survivors.insert(method.name.as_str(), (*source_index, code, method))
                {
                    debug!(
                        "TABLE: `{}` from source {} shadows source {} (code 0x{:02x} dropped)",
                        method.name, source_index, prev_source, prev_code
                    );
                }
            }
        }

        let mut by_code: BTreeMap<u8, CommandEntry> = BTreeMap::new();
        for builtin in [Builtin::ForwardI2cRequest] {
            if config.enable_i2c_relay {
                by_code.insert(
                    builtin.code(),
                    CommandEntry {
                        code: builtin.code(),
                        source: CommandSource::Builtin(builtin),
                        method: builtin.signature(),
                    },
                );
            }
        }

        // Deterministic collision reporting: walk survivors in merge order.
        let mut ordered_survivors: Vec<_> = survivors.into_values().collect();
        ordered_survivors.sort_by_key(|(source, code, _)| (*source, *code));

        for (source_index, code, method) in ordered_survivors {
            let code = u8::try_from(code).map_err(|_| BuildError::CodeOverflow {
                method: method.name.clone(),
                code,
            })?;
            if let Some(existing) = by_code.get(&code) {
                return Err(BuildError::DuplicateCommandCode {
                    code,
                    first: existing.method.name.clone(),
                    second: method.name.clone(),
                });
            }
            by_code.insert(
                code,
                CommandEntry {
                    code,
                    source: CommandSource::Interface(source_index),
                    method: method.clone(),
                },
            );
        }

        // A stride narrower than a source is a configuration bug even when
        // this particular method set happens not to collide.
        if ordered.len() > 1 {
            for (source_index, source) in &ordered {
                if source.methods.len() > usize::from(config.source_stride) {
                    return Err(BuildError::StrideTooSmall {
                        source_index: *source_index,
                        methods: source.methods.len(),
                        stride: config.source_stride,
                    });
                }
            }
        }

        let entries: Vec<CommandEntry> = by_code.into_values().collect();
        info!(
            "TABLE: {} commands from {} source(s)",
            entries.len(),
            sources.len()
        );
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `code` in [`entries`](Self::entries).
    pub fn index_of(&self, code: u8) -> Option<usize> {
        self.entries.binary_search_by_key(&code, |e| e.code).ok()
    }

    pub fn get(&self, code: u8) -> Option<&CommandEntry> {
        self.index_of(code).map(|i| &self.entries[i])
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.method.name == name)
    }

    pub fn code_of(&self, name: &str) -> Option<u8> {
        self.index_of_name(name).map(|i| self.entries[i].code)
    }
}

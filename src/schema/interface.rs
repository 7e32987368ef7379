//! Method signatures as produced by the external signature extractor.

use serde::{Deserialize, Serialize};

use super::types::TypeSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    #[serde(rename = "return", default)]
    pub ret: Option<TypeSpec>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ret: None,
            arguments: Vec::new(),
        }
    }

    /// Builder-style argument append.
    pub fn arg(mut self, name: impl Into<String>, ty: TypeSpec) -> Self {
        self.arguments.push(Argument::new(name, ty));
        self
    }

    /// Builder-style return type.
    pub fn returns(mut self, ty: TypeSpec) -> Self {
        self.ret = Some(ty);
        self
    }
}

/// Ordered method list from one interface source (a class, a header, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescription {
    /// Position of this source in merge order; assigned by the merge step
    /// when absent.
    #[serde(default)]
    pub source_index: Option<usize>,
    pub methods: Vec<MethodSignature>,
}

impl InterfaceDescription {
    pub fn new(methods: Vec<MethodSignature>) -> Self {
        Self {
            source_index: None,
            methods,
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }
}

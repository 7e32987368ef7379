//! Dense request/response struct layouts.
//!
//! Wire format of a request:
//! ```text
//! ┌──────────┬───────────────────────────┬──────────────┬──────────────┬─────
//! │ Code (1B)│ Request struct            │ Array data 0 │ Array data 1 │ ...
//! │          │ (struct_size B, no pad)   │              │              │
//! └──────────┴───────────────────────────┴──────────────┴──────────────┴─────
//! ```
//!
//! Scalars sit inline at their byte offset.  An array argument occupies a
//! 4-byte descriptor `[length: u16 LE][data_offset: u16 LE]`, where
//! `length` counts elements and `data_offset` counts bytes from the start
//! of the trailing array data.

use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::error::BuildError;
use crate::schema::{MethodSignature, TypeSpec};

/// Upper bound on arguments per method; sizes the node's decode buffer.
pub const MAX_ARGS: usize = 16;

/// Size of an array descriptor (`length` + `data_offset`).
pub const DESCRIPTOR_SIZE: u16 = 4;

/// Bytes taken by the command code in front of the request struct.
pub const CODE_SIZE: usize = 1;

/// How a field is stored inside its struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Scalar stored in place.
    Inline { width: u8 },
    /// Array descriptor; both offsets are absolute within the struct.
    Descriptor {
        length_offset: u16,
        data_offset_offset: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub byte_offset: u16,
    pub ty: TypeSpec,
    pub encoding: Encoding,
}

impl FieldLayout {
    fn at(name: &str, byte_offset: u16, ty: TypeSpec) -> Self {
        let encoding = match ty {
            TypeSpec::Scalar(atom) => Encoding::Inline {
                width: atom.width() as u8,
            },
            TypeSpec::Array(_) => Encoding::Descriptor {
                length_offset: byte_offset,
                data_offset_offset: byte_offset + 2,
            },
        };
        Self {
            name: name.to_owned(),
            byte_offset,
            ty,
            encoding,
        }
    }

    /// Bytes occupied inside the struct.
    pub fn width(&self) -> u16 {
        match self.encoding {
            Encoding::Inline { width } => u16::from(width),
            Encoding::Descriptor { .. } => DESCRIPTOR_SIZE,
        }
    }
}

/// Byte layout of one method's request and response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub request_fields: Vec<FieldLayout>,
    pub response_field: Option<FieldLayout>,
    /// Request struct size, descriptors included.
    pub struct_size: u16,
    /// Response struct size; 0 when nothing is returned.
    pub response_size: u16,
}

impl StructLayout {
    /// Lay out `method` densely in declaration order.
    pub fn build(method: &MethodSignature, config: &ProtocolConfig) -> Result<Self, BuildError> {
        if method.arguments.len() > MAX_ARGS {
            return Err(BuildError::TooManyArguments {
                method: method.name.clone(),
                count: method.arguments.len(),
                max: MAX_ARGS,
            });
        }

        for (i, arg) in method.arguments.iter().enumerate() {
            if method.arguments[..i].iter().any(|a| a.name == arg.name) {
                return Err(BuildError::DuplicateArgument {
                    method: method.name.clone(),
                    name: arg.name.clone(),
                });
            }
        }

        // MAX_ARGS descriptors of 8 bytes at most cannot overflow u16.
        let mut offset = 0u16;
        let mut request_fields = Vec::with_capacity(method.arguments.len());
        for arg in &method.arguments {
            let field = FieldLayout::at(&arg.name, offset, arg.ty);
            offset += field.width();
            request_fields.push(field);
        }

        let response_field = method.ret.map(|ty| FieldLayout::at("return", 0, ty));
        let response_size = response_field.as_ref().map_or(0, FieldLayout::width);

        let needed = CODE_SIZE + usize::from(offset);
        if needed > usize::from(config.buffer_capacity) {
            return Err(BuildError::LayoutTooLarge {
                method: method.name.clone(),
                size: needed,
                capacity: config.buffer_capacity,
            });
        }

        Ok(Self {
            request_fields,
            response_field,
            struct_size: offset,
            response_size,
        })
    }

    /// Code byte plus request struct: where the trailing array data begins.
    pub fn header_len(&self) -> usize {
        CODE_SIZE + usize::from(self.struct_size)
    }

    pub fn return_type(&self) -> Option<TypeSpec> {
        self.response_field.as_ref().map(|f| f.ty)
    }

    pub fn array_fields(&self) -> impl Iterator<Item = &FieldLayout> {
        self.request_fields.iter().filter(|f| f.ty.is_array())
    }
}

//! Field-by-field request/response coding driven by [`StructLayout`].
//!
//! The host side owns its buffers (`Vec<u8>`); the node side decodes in
//! place and hands out views into the request buffer.  Every read on the
//! node is bounds-checked against the received length before any method
//! sees the data.

use heapless::Vec as HVec;

use crate::error::{DispatchError, ProxyError};
use crate::schema::{Arg, Array, ArrayView, Scalar, TypeSpec, Value};

use super::layout::{CODE_SIZE, Encoding, FieldLayout, MAX_ARGS, StructLayout};

/// Decoded arguments of one request, borrowing the request buffer.
pub type Args<'a> = HVec<Arg<'a>, MAX_ARGS>;

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn write_u16(out: &mut [u8], at: usize, v: u16) {
    out[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Host side
// ---------------------------------------------------------------------------

/// Check `args` against the layout's field types.
pub fn check_args(layout: &StructLayout, args: &[Value]) -> Result<(), ProxyError> {
    if args.len() != layout.request_fields.len() {
        return Err(ProxyError::ArgumentCount {
            expected: layout.request_fields.len(),
            actual: args.len(),
        });
    }
    for (index, (field, arg)) in layout.request_fields.iter().zip(args).enumerate() {
        if field.ty != arg.type_spec() {
            return Err(ProxyError::ArgumentType {
                index,
                expected: field.ty,
                actual: arg.type_spec(),
            });
        }
    }
    Ok(())
}

/// Serialize a call: code byte, request struct, then each array's bytes in
/// declaration order.
///
/// Each descriptor's `data_offset` is the running byte total of the arrays
/// before it, so the first array always starts at offset 0.
pub fn encode_request(
    code: u8,
    layout: &StructLayout,
    args: &[Value],
) -> Result<Vec<u8>, ProxyError> {
    check_args(layout, args)?;

    let header = layout.header_len();
    let mut out = vec![0u8; header];
    out[0] = code;

    let mut data_offset = 0usize;
    for (index, (field, arg)) in layout.request_fields.iter().zip(args).enumerate() {
        let at = CODE_SIZE + usize::from(field.byte_offset);
        match (field.encoding, arg) {
            (Encoding::Inline { width }, Value::Scalar(s)) => {
                s.write_le(&mut out[at..at + usize::from(width)]);
            }
            (
                Encoding::Descriptor {
                    length_offset,
                    data_offset_offset,
                },
                Value::Array(a),
            ) => {
                let too_large = || ProxyError::RequestTooLarge {
                    size: header + data_offset + a.as_bytes().len(),
                    capacity: u16::MAX,
                };
                let length = u16::try_from(a.len()).map_err(|_| too_large())?;
                let offset = u16::try_from(data_offset).map_err(|_| too_large())?;
                write_u16(&mut out, CODE_SIZE + usize::from(length_offset), length);
                write_u16(&mut out, CODE_SIZE + usize::from(data_offset_offset), offset);
                data_offset += a.as_bytes().len();
            }
            _ => {
                return Err(ProxyError::ArgumentType {
                    index,
                    expected: field.ty,
                    actual: arg.type_spec(),
                });
            }
        }
    }

    for arg in args {
        if let Value::Array(a) = arg {
            out.extend_from_slice(a.as_bytes());
        }
    }
    Ok(out)
}

/// Interpret a node's response bytes.
///
/// Scalar returns read the first `response_size` bytes; array returns take
/// the whole payload, which must be a whole number of elements.
pub fn decode_response(layout: &StructLayout, bytes: &[u8]) -> Result<Option<Value>, ProxyError> {
    match layout.return_type() {
        None => Ok(None),
        Some(TypeSpec::Scalar(atom)) => Scalar::read_le(atom, bytes)
            .map(|s| Some(Value::Scalar(s)))
            .ok_or(ProxyError::MalformedResponse("scalar response too short")),
        Some(TypeSpec::Array(atom)) => Array::from_bytes(atom, bytes.to_vec())
            .map(|a| Some(Value::Array(a)))
            .ok_or(ProxyError::MalformedResponse(
                "array response is not a whole number of elements",
            )),
    }
}

// ---------------------------------------------------------------------------
// Node side
// ---------------------------------------------------------------------------

fn decode_field<'a>(
    field: &FieldLayout,
    request: &'a [u8],
    payload_start: usize,
) -> Result<Arg<'a>, DispatchError> {
    let at = CODE_SIZE + usize::from(field.byte_offset);
    match (field.encoding, field.ty) {
        (Encoding::Inline { .. }, TypeSpec::Scalar(atom)) => {
            let bytes = request
                .get(at..)
                .ok_or(DispatchError::MalformedRequest("scalar outside request"))?;
            Scalar::read_le(atom, bytes)
                .map(Arg::Scalar)
                .ok_or(DispatchError::MalformedRequest("scalar outside request"))
        }
        (
            Encoding::Descriptor {
                length_offset,
                data_offset_offset,
            },
            TypeSpec::Array(atom),
        ) => {
            let length = read_u16(request, CODE_SIZE + usize::from(length_offset))
                .ok_or(DispatchError::MalformedRequest("descriptor outside request"))?;
            let offset = read_u16(request, CODE_SIZE + usize::from(data_offset_offset))
                .ok_or(DispatchError::MalformedRequest("descriptor outside request"))?;

            // The only pointer fixup: relative data_offset -> buffer index.
            let start = payload_start + usize::from(offset);
            let end = start + usize::from(length) * atom.width();
            let bytes = request
                .get(start..end)
                .ok_or(DispatchError::MalformedRequest("array exceeds request"))?;
            Ok(Arg::Array(ArrayView::new(atom, bytes)))
        }
        _ => Err(DispatchError::MalformedRequest("field encoding mismatch")),
    }
}

/// Decode `request` (code byte included, truncated to the received length)
/// into argument values.  Fails without partial results if any field or
/// array would read past the end.
pub fn decode_request<'a>(
    layout: &StructLayout,
    request: &'a [u8],
) -> Result<Args<'a>, DispatchError> {
    let payload_start = layout.header_len();
    if request.len() < payload_start {
        return Err(DispatchError::MalformedRequest("request shorter than struct"));
    }

    let mut args = Args::new();
    for field in &layout.request_fields {
        let arg = decode_field(field, request, payload_start)?;
        args.push(arg)
            .map_err(|_| DispatchError::MalformedRequest("too many arguments"))?;
    }
    Ok(args)
}

/// Encode a result the way the node sends it: the response struct for a
/// scalar, the raw element bytes for an array, nothing for no return.
pub fn encode_response(
    layout: &StructLayout,
    result: Option<&Value>,
    out: &mut [u8],
) -> Result<usize, DispatchError> {
    let capacity = out.len();
    let bytes_needed = |n: usize| {
        if n > capacity {
            Err(DispatchError::ResponseOverflow {
                needed: n,
                capacity,
            })
        } else {
            Ok(n)
        }
    };
    match (layout.return_type(), result) {
        (None, None) => Ok(0),
        (Some(TypeSpec::Scalar(atom)), Some(Value::Scalar(s))) if s.atom() == atom => {
            let n = bytes_needed(atom.width())?;
            s.write_le(&mut out[..n]);
            Ok(n)
        }
        (Some(TypeSpec::Array(atom)), Some(Value::Array(a))) if a.atom() == atom => {
            let n = bytes_needed(a.as_bytes().len())?;
            out[..n].copy_from_slice(a.as_bytes());
            Ok(n)
        }
        _ => Err(crate::error::HandlerError::ReturnMismatch.into()),
    }
}

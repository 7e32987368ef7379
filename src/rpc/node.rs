//! The bound-method port: how the dispatcher reaches user code.
//!
//! ```text
//!   CommandProcessor ──▶ Node::call(Call, ReturnSlot) ──▶ user method
//! ```
//!
//! A [`Call`] carries the decoded arguments as views into the request
//! buffer.  Results go into a [`ReturnSlot`] backed by the processor's
//! scratch buffer, which type-checks them against the signature.

use crate::error::HandlerError;
use crate::schema::{Arg, ArrayView, Atom, AtomType, Scalar, TypeSpec};

/// One decoded invocation.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub code: u8,
    pub name: &'a str,
    args: &'a [Arg<'a>],
}

impl<'a> Call<'a> {
    pub fn new(code: u8, name: &'a str, args: &'a [Arg<'a>]) -> Self {
        Self { code, name, args }
    }

    pub fn args(&self) -> &'a [Arg<'a>] {
        self.args
    }

    pub fn scalar<T: Atom>(&self, index: usize) -> Result<T, HandlerError> {
        match self.args.get(index) {
            Some(Arg::Scalar(s)) => s.get::<T>().ok_or(HandlerError::ArgumentMismatch),
            _ => Err(HandlerError::ArgumentMismatch),
        }
    }

    pub fn array(&self, index: usize) -> Result<ArrayView<'a>, HandlerError> {
        match self.args.get(index) {
            Some(Arg::Array(v)) => Ok(*v),
            _ => Err(HandlerError::ArgumentMismatch),
        }
    }
}

/// Destination for a method's return value.
pub struct ReturnSlot<'s> {
    expected: Option<TypeSpec>,
    scratch: &'s mut [u8],
    written: Option<usize>,
}

impl<'s> ReturnSlot<'s> {
    pub fn new(expected: Option<TypeSpec>, scratch: &'s mut [u8]) -> Self {
        Self {
            expected,
            scratch,
            written: None,
        }
    }

    /// Declared return type.
    pub fn expected(&self) -> Option<TypeSpec> {
        self.expected
    }

    /// Room available for an array result, in bytes.
    pub fn capacity(&self) -> usize {
        self.scratch.len()
    }

    pub fn set<T: Atom>(&mut self, value: T) -> Result<(), HandlerError> {
        self.set_scalar(value.into_scalar())
    }

    pub fn set_scalar(&mut self, value: Scalar) -> Result<(), HandlerError> {
        if self.expected != Some(TypeSpec::Scalar(value.atom())) {
            return Err(HandlerError::ReturnMismatch);
        }
        let width = value.atom().width();
        let dst = self
            .scratch
            .get_mut(..width)
            .ok_or(HandlerError::ResultTooLarge)?;
        value.write_le(dst);
        self.written = Some(width);
        Ok(())
    }

    pub fn set_array<T: Atom>(&mut self, items: &[T]) -> Result<(), HandlerError> {
        self.check_array(T::ATOM)?;
        let width = T::ATOM.width();
        let dst = self
            .scratch
            .get_mut(..items.len() * width)
            .ok_or(HandlerError::ResultTooLarge)?;
        for (chunk, item) in dst.chunks_exact_mut(width).zip(items) {
            item.into_scalar().write_le(chunk);
        }
        self.written = Some(items.len() * width);
        Ok(())
    }

    /// Array result from already-encoded element bytes.
    pub fn set_array_bytes(&mut self, atom: AtomType, bytes: &[u8]) -> Result<(), HandlerError> {
        self.check_array(atom)?;
        if bytes.len() % atom.width() != 0 {
            return Err(HandlerError::ReturnMismatch);
        }
        let dst = self
            .scratch
            .get_mut(..bytes.len())
            .ok_or(HandlerError::ResultTooLarge)?;
        dst.copy_from_slice(bytes);
        self.written = Some(bytes.len());
        Ok(())
    }

    fn check_array(&self, atom: AtomType) -> Result<(), HandlerError> {
        if self.expected == Some(TypeSpec::Array(atom)) {
            Ok(())
        } else {
            Err(HandlerError::ReturnMismatch)
        }
    }

    /// Bytes produced.  A declared return that was never set is an error.
    pub fn finish(&self) -> Result<usize, HandlerError> {
        match (self.expected, self.written) {
            (None, _) => Ok(0),
            (Some(_), Some(n)) => Ok(n),
            (Some(_), None) => Err(HandlerError::ReturnMismatch),
        }
    }
}

/// User methods bound to the command table.
pub trait Node {
    fn call(&mut self, call: &Call<'_>, ret: &mut ReturnSlot<'_>) -> Result<(), HandlerError>;
}

impl<F> Node for F
where
    F: FnMut(&Call<'_>, &mut ReturnSlot<'_>) -> Result<(), HandlerError>,
{
    fn call(&mut self, call: &Call<'_>, ret: &mut ReturnSlot<'_>) -> Result<(), HandlerError> {
        self(call, ret)
    }
}

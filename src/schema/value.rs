//! Call-time values: owned arrays for the host, borrowed views for the node.

use super::types::{Atom, AtomType, Scalar, TypeSpec};

/// Densely packed array of one atom type, stored as its wire bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    atom: AtomType,
    bytes: Vec<u8>,
}

impl Array {
    /// Build from typed elements.
    pub fn of<T: Atom>(items: &[T]) -> Self {
        let width = T::ATOM.width();
        let mut bytes = vec![0u8; items.len() * width];
        for (chunk, item) in bytes.chunks_exact_mut(width).zip(items) {
            item.into_scalar().write_le(chunk);
        }
        Self { atom: T::ATOM, bytes }
    }

    /// Wrap already-encoded bytes.  `None` if the byte count is not a whole
    /// number of elements.
    pub fn from_bytes(atom: AtomType, bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() % atom.width() == 0).then_some(Self { atom, bytes })
    }

    pub fn atom(&self) -> AtomType {
        self.atom
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.atom.width()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn view(&self) -> ArrayView<'_> {
        ArrayView {
            atom: self.atom,
            bytes: &self.bytes,
        }
    }

    /// Typed copy of the elements; `None` if `T` is not this array's atom type.
    pub fn to_vec<T: Atom>(&self) -> Option<Vec<T>> {
        self.view().to_vec()
    }
}

/// Read-only view of an array payload inside a request buffer.
///
/// Views are only ever built after the descriptor has been bounds-checked,
/// so `bytes.len()` is always a whole number of elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayView<'a> {
    atom: AtomType,
    bytes: &'a [u8],
}

impl<'a> ArrayView<'a> {
    pub(crate) fn new(atom: AtomType, bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() % atom.width(), 0);
        Self { atom, bytes }
    }

    pub fn atom(&self) -> AtomType {
        self.atom
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / self.atom.width()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        let w = self.atom.width();
        Scalar::read_le(self.atom, self.bytes.get(index * w..)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + 'a {
        let atom = self.atom;
        self.bytes
            .chunks_exact(atom.width())
            .filter_map(move |c| Scalar::read_le(atom, c))
    }

    /// Typed iterator; empty if `T` is not this view's atom type.
    pub fn iter_as<T: Atom>(&self) -> impl Iterator<Item = T> + 'a {
        let matches = T::ATOM == self.atom;
        self.iter()
            .filter(move |_| matches)
            .filter_map(|s| T::from_scalar(s))
    }

    pub fn to_vec<T: Atom>(&self) -> Option<Vec<T>> {
        (T::ATOM == self.atom).then(|| self.iter_as::<T>().collect())
    }

    pub fn to_owned(&self) -> Array {
        Array {
            atom: self.atom,
            bytes: self.bytes.to_vec(),
        }
    }
}

/// Host-side argument or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Array(Array),
}

impl Value {
    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Self::Scalar(s) => TypeSpec::Scalar(s.atom()),
            Self::Array(a) => TypeSpec::Array(a.atom()),
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            Self::Scalar(_) => None,
        }
    }
}

impl<T: Atom> From<T> for Value {
    fn from(v: T) -> Self {
        Self::Scalar(v.into_scalar())
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Self::Array(a)
    }
}

/// Decoded argument on the node side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    Scalar(Scalar),
    Array(ArrayView<'a>),
}

impl Arg<'_> {
    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Self::Scalar(s) => TypeSpec::Scalar(s.atom()),
            Self::Array(v) => TypeSpec::Array(v.atom()),
        }
    }

    /// Owned copy, for comparing against what the host sent.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(s) => Value::Scalar(*s),
            Self::Array(v) => Value::Array(v.to_owned()),
        }
    }
}

//! Interface model: atom types, method signatures and call-time values.

pub mod interface;
pub mod types;
pub mod value;

pub use interface::{Argument, InterfaceDescription, MethodSignature};
pub use types::{Atom, AtomType, Scalar, TypeSpec};
pub use value::{Arg, Array, ArrayView, Value};

//! The slice of class file metadata that bytecode analysis needs
//!
//! This crate does not parse whole class files. Instructions refer into a constant pool and
//! methods carry exception handler tables, so those two structures (and the descriptor strings
//! hanging off them) are modelled here, and nothing else.

pub mod descriptors;

mod constant;
mod method;

pub use constant::*;
pub use method::*;

//! Decoding, analysis, and assembly of JVM method bodies
//!
//! The crate is organized around three layers:
//!
//!   - [`bytecode`] decodes a `Code` attribute's byte array into typed instruction events,
//!     with short forms normalized away, `wide` prefixes merged into their instruction, and
//!     branch operands resolved to absolute offsets. [`bytecode::BytecodeWriter`] is the
//!     inverse: it assembles events back into the shortest valid encoding, with labels for
//!     forward references.
//!
//!   - [`cfg`] partitions the decoded instructions into basic blocks, wires up the control
//!     flow edges, simulates operand stack shapes across them, and (optionally) marks dead
//!     blocks.
//!
//!   - [`classfile`] holds the small slice of the class file model the other two layers
//!     consume: constant pool entries, descriptors, and method bodies with their exception
//!     handler tables.

pub mod bytecode;
pub mod cfg;
pub mod classfile;
pub mod errors;
pub mod util;

pub use errors::Error;
pub use util::Offset;

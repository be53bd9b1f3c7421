//! Decoding and encoding of JVM method bytecode
//!
//! The representation is built for analysis rather than for mirroring the encoding:
//!
//!   - The `wide` prefix never shows up. It gets merged into the instructions it modifies, so a
//!     local index is always just a `u16`.
//!
//!   - Short forms disappear. `iconst_3`, `bipush`, and `sipush` all decode to [`IConst`], and
//!     `aload_0` decodes to `ALoad(0)`. The encoder picks the shortest form again on the way out.
//!
//!   - Families of opcodes that differ only in a mode collapse into one variant with a field,
//!     eg. all six `if_icmp*` forms become [`IfICmp`] with an [`OrdComparison`].
//!
//!   - Branch operands are absolute code offsets, not the relative displacements of the encoding.
//!
//! [`IConst`]: InstructionEvent::IConst
//! [`IfICmp`]: InstructionEvent::IfICmp

mod insn;
mod parser;
mod writer;

pub use insn::*;
pub use parser::*;
pub use writer::*;

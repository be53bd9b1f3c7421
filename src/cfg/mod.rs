//! Basic block discovery and control-flow graphs
//!
//! Two passes over a method body are available:
//!
//!   - [`BasicBlockFinder`] partitions the code into basic blocks, wires up predecessor and
//!     successor edges, and simulates the operand stack through every instruction. Disagreeing
//!     stack shapes at a join are only logged.
//!
//!   - [`DeadBlockFinder`] does everything the basic pass does, but treats a stack shape
//!     disagreement on a live path as an error and additionally computes which blocks are
//!     reachable, so dead code can be identified (and skipped by later consumers).
//!
//! Both produce an immutable [`ControlFlowGraph`]: blocks addressable by offset, plus a
//! per-address [`OpcodeFlags`] bitmap answering point queries like "is this address an
//! instruction start" without touching the block list.

mod basic_block;
mod block_finder;
mod dead_blocks;
mod flags;
mod graph;
mod type_stack;

pub use basic_block::*;
pub use block_finder::*;
pub use dead_blocks::*;
pub use flags::*;
pub use graph::*;
pub use type_stack::*;

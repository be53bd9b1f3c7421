use super::TypeStack;
use crate::util::Offset;
use std::collections::BTreeSet;
use std::fmt;

/// Index of a block inside its [`ControlFlowGraph`], in ascending start-offset order
///
/// [`ControlFlowGraph`]: super::ControlFlowGraph
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockId(pub usize);

impl fmt::Debug for BlockId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("b{}", self.0))
    }
}

/// A maximal straight-line run of instructions
///
/// Control enters only at [`start`] and leaves only through the last instruction. The edge sets
/// cover both explicit branches and fallthrough.
///
/// [`start`]: BasicBlock::start
#[derive(Clone, Debug)]
pub struct BasicBlock {
    /// First instruction of the block
    pub start: Offset,

    /// End of the block (exclusive): the next block's start, or the end of the code
    pub end: Offset,

    /// Blocks that can transfer control here
    pub predecessors: BTreeSet<BlockId>,

    /// Blocks this one can transfer control to
    pub successors: BTreeSet<BlockId>,

    /// Operand stack shape on entry
    ///
    /// For an exception handler entry this is the single thrown reference. For a block no
    /// simulated path reached, it is empty.
    pub entry_stack: TypeStack,

    /// This block is the entry of an exception handler
    pub exception_handler_entry: bool,

    /// This block is the target of a `jsr`
    pub subroutine_entry: bool,

    /// This block is where a subroutine's `ret` comes back to (the instruction after a `jsr`)
    pub subroutine_return_target: bool,

    /// Reachable from the method entry or a handler entry
    ///
    /// Always `true` in graphs built by the basic pass; the refined pass computes it.
    pub live: bool,
}

impl BasicBlock {
    /// Does the given address fall inside this block?
    pub fn contains(&self, offset: Offset) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Block size in bytes
    pub fn byte_len(&self) -> usize {
        self.end.0 - self.start.0
    }
}

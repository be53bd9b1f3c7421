use crate::cfg::{BasicBlock, BasicBlockFinder, BlockId, DeadBlockFinder, OpcodeFlags};
use crate::classfile::{ConstantPool, MethodBody};
use crate::errors::Error;
use crate::util::Offset;
use std::ops::Index;

/// Basic blocks of one method body, plus the per-address flag map
///
/// Blocks are stored in ascending address order and tile the code array exactly, so
/// [`BlockId`]s double as indices. The flag map has one entry per code byte and one more for
/// the end position, which is where a try region ending at the last instruction marks its
/// close.
///
/// Point queries take an `Offset` anywhere inside the method and panic when it is out of
/// range; passing an address that is not part of the method is a caller bug, not a property
/// of the bytecode.
#[derive(Debug)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    flags: Vec<OpcodeFlags>,
    code_len: usize,
}

impl ControlFlowGraph {
    /// Partition `body` into basic blocks, tolerating stack shape disagreements
    pub fn build(body: &MethodBody, pool: &ConstantPool) -> Result<ControlFlowGraph, Error> {
        BasicBlockFinder::find(body, pool)
    }

    /// Partition `body` strictly and mark unreachable blocks as not live
    pub fn build_live(body: &MethodBody, pool: &ConstantPool) -> Result<ControlFlowGraph, Error> {
        DeadBlockFinder::find(body, pool)
    }

    pub(crate) fn from_parts(
        blocks: Vec<BasicBlock>,
        flags: Vec<OpcodeFlags>,
        code_len: usize,
    ) -> ControlFlowGraph {
        ControlFlowGraph {
            blocks,
            flags,
            code_len,
        }
    }

    /// Length of the code array this graph was built from
    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// All blocks, in ascending address order
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [BasicBlock] {
        &mut self.blocks
    }

    /// The block containing `offset`
    pub fn block_at(&self, offset: Offset) -> &BasicBlock {
        &self.blocks[self.block_id_at(offset).0]
    }

    /// The id of the block containing `offset`
    pub fn block_id_at(&self, offset: Offset) -> BlockId {
        assert!(
            offset.0 < self.code_len,
            "{:?} is outside the method body",
            offset,
        );
        match self.blocks.binary_search_by_key(&offset, |block| block.start) {
            Ok(index) => BlockId(index),
            Err(0) => panic!("no block covers {:?}", offset),
            Err(index) => BlockId(index - 1),
        }
    }

    /// Flags recorded at `offset`, which may be the end position
    pub fn flags_at(&self, offset: Offset) -> OpcodeFlags {
        assert!(
            offset.0 < self.flags.len(),
            "{:?} is outside the method body",
            offset,
        );
        self.flags[offset.0]
    }

    /// Are all of `flags` set at `offset`?
    pub fn has_flag(&self, offset: Offset, flags: OpcodeFlags) -> bool {
        self.flags_at(offset).contains(flags)
    }

    /// Is at least one of `flags` set at `offset`?
    pub fn has_any_flag(&self, offset: Offset, flags: OpcodeFlags) -> bool {
        self.flags_at(offset).intersects(flags)
    }
}

impl Index<BlockId> for ControlFlowGraph {
    type Output = BasicBlock;

    fn index(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> ControlFlowGraph {
        // iload_0; ifeq 10; iinc 0, 1; goto 10; return
        let body = MethodBody::new(vec![
            0x1a, 0x99, 0x00, 0x09, 0x84, 0x00, 0x01, 0xa7, 0x00, 0x03, 0xb1,
        ]);
        ControlFlowGraph::build(&body, &ConstantPool::new()).unwrap()
    }

    #[test]
    fn point_queries_find_the_covering_block() {
        let graph = sample();
        assert_eq!(graph.block_id_at(Offset(0)), BlockId(0));
        assert_eq!(graph.block_id_at(Offset(3)), BlockId(0));
        assert_eq!(graph.block_id_at(Offset(4)), BlockId(1));
        assert_eq!(graph.block_id_at(Offset(9)), BlockId(1));
        assert_eq!(graph.block_id_at(Offset(10)), BlockId(2));
        assert_eq!(graph.block_at(Offset(5)).start, Offset(4));
    }

    #[test]
    #[should_panic(expected = "outside the method body")]
    fn point_queries_past_the_end_panic() {
        sample().block_id_at(Offset(11));
    }

    #[test]
    fn the_end_position_is_still_flaggable() {
        let graph = sample();
        assert_eq!(graph.code_len(), 11);
        assert_eq!(graph.flags_at(Offset(11)), OpcodeFlags::default());
    }

    #[test]
    fn graphs_are_debug_printable() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("ControlFlowGraph"));
        assert!(rendered.contains("@4"));
    }

    #[test]
    fn blocks_index_by_id() {
        let graph = sample();
        assert_eq!(graph[BlockId(1)].start, Offset(4));
        assert_eq!(graph[graph.block_id_at(Offset(10))].end, Offset(11));
    }
}

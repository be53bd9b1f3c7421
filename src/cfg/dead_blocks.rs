use crate::cfg::block_finder::Finder;
use crate::cfg::{BlockId, ControlFlowGraph};
use crate::classfile::{ConstantPool, MethodBody};
use crate::errors::Error;

/// Refinement of [`BasicBlockFinder`] that also judges reachability
///
/// Differs from the basic pass in two ways: operand stack disagreements at a join are hard
/// [`StackShapeConflict`] errors instead of warnings, and after the graph is built every block
/// not reachable from the method entry or an exception handler entry has its `live` flag
/// cleared. Dead blocks stay in the graph; callers that want to skip them filter on the flag.
///
/// [`BasicBlockFinder`]: crate::cfg::BasicBlockFinder
/// [`StackShapeConflict`]: crate::errors::VerifyErrorKind::StackShapeConflict
pub struct DeadBlockFinder;

impl DeadBlockFinder {
    pub fn find(body: &MethodBody, pool: &ConstantPool) -> Result<ControlFlowGraph, Error> {
        let mut graph = Finder::new(body, pool, true).run()?;
        mark_live_blocks(&mut graph);
        Ok(graph)
    }
}

/// Flood the successor edges from the entry block and every handler entry
fn mark_live_blocks(graph: &mut ControlFlowGraph) {
    let blocks = graph.blocks_mut();
    if blocks.is_empty() {
        return;
    }

    let mut live = vec![false; blocks.len()];
    let mut worklist = vec![BlockId(0)];
    for (index, block) in blocks.iter().enumerate() {
        if block.exception_handler_entry {
            worklist.push(BlockId(index));
        }
    }

    while let Some(id) = worklist.pop() {
        if live[id.0] {
            continue;
        }
        live[id.0] = true;
        worklist.extend(blocks[id.0].successors.iter().copied());
    }

    for (block, live) in blocks.iter_mut().zip(live) {
        block.live = live;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classfile::ExceptionHandler;
    use crate::classfile::descriptors::JvmType;
    use crate::errors::VerifyErrorKind;
    use crate::util::Offset;

    fn live_spans(graph: &ControlFlowGraph) -> Vec<(usize, usize)> {
        graph
            .blocks()
            .iter()
            .filter(|block| block.live)
            .map(|block| (block.start.0, block.end.0))
            .collect()
    }

    #[test]
    fn unreachable_code_after_a_return_is_dead() {
        // return; iconst_0; ireturn
        let body = MethodBody::new(vec![0xb1, 0x03, 0xac]);
        let graph = DeadBlockFinder::find(&body, &ConstantPool::new()).unwrap();

        assert_eq!(graph.blocks().len(), 2);
        assert_eq!(live_spans(&graph), vec![(0, 1)]);
        // the dead block is still present and queryable
        assert_eq!(graph.block_at(Offset(2)).start, Offset(1));
    }

    #[test]
    fn a_dead_island_of_several_blocks_stays_dead() {
        // return | iload_0; ifeq 9; nop; goto 1; return
        //
        // The island at 1..10 branches within itself; none of that revives it.
        let body = MethodBody::new(vec![
            0xb1, 0x1a, 0x99, 0x00, 0x07, 0x00, 0xa7, 0xff, 0xfb, 0xb1,
        ]);
        let graph = DeadBlockFinder::find(&body, &ConstantPool::new()).unwrap();
        assert_eq!(live_spans(&graph), vec![(0, 1)]);
    }

    #[test]
    fn handler_entries_are_roots_even_without_edges() {
        // nop; return | astore_1; return
        let body = MethodBody::with_handlers(
            vec![0x00, 0xb1, 0x4c, 0xb1],
            vec![ExceptionHandler {
                start_pc: Offset(0),
                end_pc: Offset(2),
                handler_pc: Offset(2),
            }],
        );
        let graph = DeadBlockFinder::find(&body, &ConstantPool::new()).unwrap();
        assert_eq!(live_spans(&graph), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn conflicting_stacks_on_a_live_join_are_an_error() {
        // iload_0; ifeq 8; fconst_0; goto 9; iconst_0; freturn
        let body = MethodBody::new(vec![
            0x1a, 0x99, 0x00, 0x07, 0x0b, 0xa7, 0x00, 0x04, 0x03, 0xae,
        ]);
        let err = DeadBlockFinder::find(&body, &ConstantPool::new()).unwrap_err();
        match err {
            Error::Verify {
                at,
                kind: VerifyErrorKind::StackShapeConflict { existing, incoming },
            } => {
                assert_eq!(at, Offset(9));
                assert_eq!(existing, vec![JvmType::Float]);
                assert_eq!(incoming, vec![JvmType::Int]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn dead_code_is_not_stack_checked() {
        // return | iadd; ireturn
        //
        // iadd on an empty stack would be a verify error, but nothing reaches it.
        let body = MethodBody::new(vec![0xb1, 0x60, 0xac]);
        let graph = DeadBlockFinder::find(&body, &ConstantPool::new()).unwrap();
        assert_eq!(live_spans(&graph), vec![(0, 1)]);
        assert!(graph.blocks()[1].entry_stack.is_empty());
    }

    #[test]
    fn loops_through_a_subroutine_stay_live() {
        // jsr 4; return | astore_1; ret 1
        let body = MethodBody::new(vec![0xa8, 0x00, 0x04, 0xb1, 0x4c, 0xa9, 0x01]);
        let graph = DeadBlockFinder::find(&body, &ConstantPool::new()).unwrap();
        // the return site is live through the jsr fallthrough edge
        assert_eq!(live_spans(&graph), vec![(0, 3), (3, 4), (4, 7)]);
    }
}

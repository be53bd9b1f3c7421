use crate::bytecode::{BytecodeParser, InstructionEvent};
use crate::cfg::{BasicBlock, BlockId, ControlFlowGraph, OpcodeFlags, TypeStack};
use crate::classfile::descriptors::JvmType;
use crate::classfile::{ConstantPool, MethodBody};
use crate::errors::{ClassFormatErrorKind, Error, VerifyErrorKind};
use crate::util::Offset;
use std::collections::BTreeMap;

/// Partitions a method body into basic blocks
///
/// The finder walks the code twice. The first walk decodes every instruction, marks its start
/// address, and records every address a branch, switch, or handler table entry can transfer
/// control to. The second walk simulates the operand stack along fallthrough order, carries
/// stack shapes across block boundaries, and records the predecessor/successor edges. Stack
/// shape disagreements at a join are logged but tolerated; [`DeadBlockFinder`] is the strict
/// variant.
///
/// Exception handler entries get flagged and seeded with a one-reference stack, but no edges
/// are drawn from the instructions of a try region to its handler.
///
/// [`DeadBlockFinder`]: crate::cfg::DeadBlockFinder
pub struct BasicBlockFinder;

impl BasicBlockFinder {
    pub fn find(body: &MethodBody, pool: &ConstantPool) -> Result<ControlFlowGraph, Error> {
        Finder::new(body, pool, false).run()
    }
}

/// Shared machinery behind [`BasicBlockFinder`] and [`DeadBlockFinder`]
///
/// [`DeadBlockFinder`]: crate::cfg::DeadBlockFinder
pub(crate) struct Finder<'a> {
    body: &'a MethodBody,
    pool: &'a ConstantPool,

    /// Whether a stack shape disagreement at a join is an error or just a warning
    strict_merge: bool,

    /// Per-address flags, one entry per code byte plus one for the end position
    flags: Vec<OpcodeFlags>,

    /// Block start addresses discovered so far
    starts: BTreeMap<usize, PendingBlock>,

    /// Control flow edges as `(from block start, to block start)` pairs
    edges: Vec<(usize, usize)>,
}

/// A basic block whose extent and edges are not settled yet
#[derive(Default)]
struct PendingBlock {
    /// Entry stack, once some path in has established one
    entry_stack: Option<TypeStack>,
    exception_handler_entry: bool,
    subroutine_entry: bool,
    subroutine_return_target: bool,
}

impl<'a> Finder<'a> {
    pub(crate) fn new(body: &'a MethodBody, pool: &'a ConstantPool, strict_merge: bool) -> Self {
        Finder {
            body,
            pool,
            strict_merge,
            flags: vec![OpcodeFlags::default(); body.code.len() + 1],
            starts: BTreeMap::new(),
            edges: vec![],
        }
    }

    pub(crate) fn run(mut self) -> Result<ControlFlowGraph, Error> {
        if self.body.code.is_empty() {
            return Ok(ControlFlowGraph::from_parts(vec![], self.flags, 0));
        }
        self.seed_entrypoints()?;
        self.discover_blocks()?;
        self.simulate_stacks()?;
        self.finalize()
    }

    /// Start the method entry block and the handler entry blocks
    fn seed_entrypoints(&mut self) -> Result<(), Error> {
        let len = self.body.code.len();

        self.start_block(0).entry_stack = Some(TypeStack::new());

        for handler in &self.body.handlers {
            let (start, end, target) = (handler.start_pc.0, handler.end_pc.0, handler.handler_pc.0);
            if start >= len || end > len || start > end || target >= len {
                return Err(Error::ClassFormat {
                    at: handler.handler_pc,
                    kind: ClassFormatErrorKind::HandlerOutOfBounds,
                });
            }
            self.flags[start].insert(OpcodeFlags::START_OF_TRY_BLOCK);
            self.flags[end].insert(OpcodeFlags::START_OF_TRY_BLOCK_END);
            self.flags[target].insert(OpcodeFlags::START_OF_EXCEPTION_HANDLER);

            let block = self.start_block(target);
            block.exception_handler_entry = true;
            // the thrown exception is the only thing on the stack at handler entry
            block.entry_stack = Some(TypeStack::of(&[JvmType::Reference]));
        }
        Ok(())
    }

    /// First walk: mark instruction starts and open a block at every branch target
    fn discover_blocks(&mut self) -> Result<(), Error> {
        let len = self.body.code.len();
        let mut parser = BytecodeParser::new(self.body, self.pool);

        while let Some((offset, event)) = parser.next_event()? {
            self.flags[offset.0].insert(OpcodeFlags::START_OF_INSTRUCTION);
            let next = parser.position().0;

            let targets = event.jump_targets();
            for &target in targets.targets() {
                self.start_block(target.0);
                if target.0 < offset.0 {
                    // a backward branch is where a long-running loop can be interrupted
                    self.flags[offset.0].insert(OpcodeFlags::YIELDPOINT);
                }
            }

            if let InstructionEvent::Jsr(target) = &event {
                self.start_block(target.0).subroutine_entry = true;
                self.flags[next].insert(OpcodeFlags::RET_TARGET);
                if next < len {
                    self.start_block(next).subroutine_return_target = true;
                }
            }

            if event.ends_block() && next < len {
                self.start_block(next);
            }
        }

        // every block start must land on an instruction boundary
        for &at in self.starts.keys() {
            if !self.flags[at].contains(OpcodeFlags::START_OF_INSTRUCTION) {
                return Err(Error::ClassFormat {
                    at: Offset(at),
                    kind: ClassFormatErrorKind::BranchTargetMidInstruction,
                });
            }
        }
        Ok(())
    }

    /// Second walk: carry operand stacks across blocks and record the edges
    fn simulate_stacks(&mut self) -> Result<(), Error> {
        let mut parser = BytecodeParser::new(self.body, self.pool);

        // start address of the block being walked; no block starts at usize::MAX
        let mut current_block = usize::MAX;
        // stack after the previous instruction, or None inside unreached code
        let mut stack: Option<TypeStack> = None;
        let mut fell_through = false;

        while let Some((offset, event)) = parser.next_event()? {
            if offset.0 != current_block && self.starts.contains_key(&offset.0) {
                if fell_through {
                    self.edges.push((current_block, offset.0));
                }
                let incoming = if fell_through { stack.take() } else { None };
                stack = self.enter_block(offset.0, incoming)?;
                current_block = offset.0;
            }

            if let Some(stack) = stack.as_mut() {
                stack.apply(offset, &event)?;
            }

            let is_jsr = matches!(event, InstructionEvent::Jsr(_));
            let targets = event.jump_targets();
            for &target in targets.targets() {
                self.edges.push((current_block, target.0));
                if let Some(stack) = stack.as_ref() {
                    let mut seed = stack.clone();
                    if is_jsr {
                        seed.push(JvmType::ReturnAddress);
                    }
                    self.merge_into(target.0, seed)?;
                }
            }

            fell_through = event.falls_through();
            if !fell_through {
                stack = None;
            }
        }
        Ok(())
    }

    fn start_block(&mut self, at: usize) -> &mut PendingBlock {
        self.flags[at].insert(OpcodeFlags::START_OF_BASIC_BLOCK);
        self.starts.entry(at).or_insert_with(PendingBlock::default)
    }

    /// Reconcile the stack carried into a block with whatever the block already expects
    ///
    /// Returns the stack to simulate the block with, or `None` when nothing has established
    /// a stack for it yet (the block is unreached in fallthrough order, so simulation is
    /// skipped until some branch seeds it).
    fn enter_block(
        &mut self,
        at: usize,
        incoming: Option<TypeStack>,
    ) -> Result<Option<TypeStack>, Error> {
        match (self.established_stack(at), incoming) {
            (Some(seed), Some(incoming)) => {
                if seed != incoming {
                    self.stack_mismatch(at, &seed, incoming)?;
                }
                Ok(Some(seed))
            }
            (Some(seed), None) => Ok(Some(seed)),
            (None, Some(incoming)) => {
                self.set_entry_stack(at, incoming.clone());
                Ok(Some(incoming))
            }
            (None, None) => Ok(None),
        }
    }

    /// Seed a branch target's entry stack, or check it against the established one
    fn merge_into(&mut self, at: usize, incoming: TypeStack) -> Result<(), Error> {
        match self.established_stack(at) {
            Some(seed) if seed != incoming => self.stack_mismatch(at, &seed, incoming),
            Some(_) => Ok(()),
            None => {
                self.set_entry_stack(at, incoming);
                Ok(())
            }
        }
    }

    fn established_stack(&self, at: usize) -> Option<TypeStack> {
        match self.starts.get(&at) {
            Some(pending) => pending.entry_stack.clone(),
            None => panic!("no pending block at {:?}", Offset(at)),
        }
    }

    fn set_entry_stack(&mut self, at: usize, stack: TypeStack) {
        if let Some(pending) = self.starts.get_mut(&at) {
            pending.entry_stack = Some(stack);
        }
    }

    /// The established entry stack always wins; strict mode turns the disagreement into an error
    fn stack_mismatch(&self, at: usize, seed: &TypeStack, incoming: TypeStack) -> Result<(), Error> {
        if self.strict_merge {
            Err(Error::Verify {
                at: Offset(at),
                kind: VerifyErrorKind::StackShapeConflict {
                    existing: seed.entries().to_vec(),
                    incoming: incoming.entries().to_vec(),
                },
            })
        } else {
            log::warn!(
                "operand stacks disagree at {:?}: keeping {:?}, dropping {:?}",
                Offset(at),
                seed,
                incoming,
            );
            Ok(())
        }
    }

    fn finalize(self) -> Result<ControlFlowGraph, Error> {
        let len = self.body.code.len();
        let boundaries: Vec<usize> = self.starts.keys().copied().collect();

        let mut blocks: Vec<BasicBlock> = self
            .starts
            .into_iter()
            .enumerate()
            .map(|(index, (start, pending))| BasicBlock {
                start: Offset(start),
                end: Offset(boundaries.get(index + 1).copied().unwrap_or(len)),
                predecessors: Default::default(),
                successors: Default::default(),
                entry_stack: pending.entry_stack.unwrap_or_default(),
                exception_handler_entry: pending.exception_handler_entry,
                subroutine_entry: pending.subroutine_entry,
                subroutine_return_target: pending.subroutine_return_target,
                live: true,
            })
            .collect();

        for (from, to) in self.edges {
            let from = BlockId(boundaries.binary_search(&from).unwrap_or_else(|_| {
                panic!("edge source {:?} is not a block start", Offset(from))
            }));
            let to = BlockId(boundaries.binary_search(&to).unwrap_or_else(|_| {
                panic!("edge target {:?} is not a block start", Offset(to))
            }));
            blocks[from.0].successors.insert(to);
            blocks[to.0].predecessors.insert(from);
        }

        Ok(ControlFlowGraph::from_parts(blocks, self.flags, len))
    }
}

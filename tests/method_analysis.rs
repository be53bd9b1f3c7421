//! End to end: assemble a method with the writer, decode it with the parser, and analyze it
//! with both block finders.

use classflow::bytecode::{BytecodeParser, BytecodeWriter, InstructionEvent, OrdComparison};
use classflow::cfg::{ControlFlowGraph, OpcodeFlags};
use classflow::classfile::descriptors::JvmType;
use classflow::classfile::{ConstantPool, ExceptionHandler, MethodBody};
use classflow::Offset;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `int total = 0; while (n > 0) { total += n; n--; } return total;`
fn summing_loop() -> MethodBody {
    let mut writer = BytecodeWriter::new();
    let loop_top = writer.new_label();
    let done = writer.new_label();

    writer.iconst(0);
    writer.istore(1);
    writer.resolve(loop_top);
    writer.iload(0);
    writer.if_zero(OrdComparison::LE, done);
    writer.iload(1);
    writer.iload(0);
    writer.iadd();
    writer.istore(1);
    writer.iinc(0, -1);
    writer.goto(loop_top);
    writer.resolve(done);
    writer.iload(1);
    writer.ireturn();

    MethodBody::new(writer.into_bytes())
}

#[test]
fn assembled_loop_decodes_back_to_its_events() {
    init_logging();
    let body = summing_loop();
    let pool = ConstantPool::new();

    let mut parser = BytecodeParser::new(&body, &pool);
    let mut events = vec![];
    while let Some((_, event)) = parser.next_event().unwrap() {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            InstructionEvent::IConst(0),
            InstructionEvent::IStore(1),
            InstructionEvent::ILoad(0),
            InstructionEvent::If(OrdComparison::LE, Offset(16)),
            InstructionEvent::ILoad(1),
            InstructionEvent::ILoad(0),
            InstructionEvent::IAdd,
            InstructionEvent::IStore(1),
            InstructionEvent::IInc(0, -1),
            InstructionEvent::Goto(Offset(2)),
            InstructionEvent::ILoad(1),
            InstructionEvent::IReturn,
        ]
    );
}

#[test]
fn the_loop_produces_the_expected_graph() {
    init_logging();
    let body = summing_loop();
    let pool = ConstantPool::new();
    let graph = ControlFlowGraph::build_live(&body, &pool).unwrap();

    // preamble, loop head, loop body, exit
    let spans: Vec<(usize, usize)> = graph
        .blocks()
        .iter()
        .map(|block| (block.start.0, block.end.0))
        .collect();
    assert_eq!(spans, vec![(0, 2), (2, 6), (6, 16), (16, 18)]);

    assert!(graph.blocks().iter().all(|block| block.live));
    assert!(graph
        .blocks()
        .iter()
        .all(|block| block.entry_stack.is_empty()));

    // the loop head is entered from the preamble and from the bottom of the body
    let head = graph.block_at(Offset(2));
    assert_eq!(head.predecessors.len(), 2);
    assert_eq!(head.successors.len(), 2);

    // the backward goto at the bottom of the body is a yieldpoint
    assert!(graph.has_flag(Offset(13), OpcodeFlags::YIELDPOINT));
}

#[test]
fn rebuilding_the_graph_changes_nothing() {
    init_logging();
    let body = summing_loop();
    let pool = ConstantPool::new();

    let first = ControlFlowGraph::build(&body, &pool).unwrap();
    let second = ControlFlowGraph::build(&body, &pool).unwrap();

    assert_eq!(first.blocks().len(), second.blocks().len());
    for (a, b) in first.blocks().iter().zip(second.blocks()) {
        assert_eq!((a.start, a.end), (b.start, b.end));
        assert_eq!(a.predecessors, b.predecessors);
        assert_eq!(a.successors, b.successors);
        assert_eq!(a.entry_stack, b.entry_stack);
    }
    for at in 0..=first.code_len() {
        assert_eq!(first.flags_at(Offset(at)), second.flags_at(Offset(at)));
    }
}

#[test]
fn a_guarded_region_keeps_its_handler_live() {
    init_logging();
    // try { n = arr.length; } catch (Throwable t) { n = 0; } return n;
    let mut writer = BytecodeWriter::new();
    let out = writer.new_label();

    let try_start = writer.position();
    writer.aload(0);
    writer.arraylength();
    writer.istore(1);
    let try_end = writer.position();
    writer.goto(out);

    let handler_start = writer.position();
    writer.astore(2);
    writer.iconst(0);
    writer.istore(1);

    writer.resolve(out);
    writer.iload(1);
    writer.ireturn();

    let body = MethodBody::with_handlers(
        writer.into_bytes(),
        vec![ExceptionHandler {
            start_pc: try_start,
            end_pc: try_end,
            handler_pc: handler_start,
        }],
    );
    let pool = ConstantPool::new();
    let graph = ControlFlowGraph::build_live(&body, &pool).unwrap();

    let handler = graph.block_at(handler_start);
    assert!(handler.exception_handler_entry);
    assert!(handler.live, "handler entries root the reachability sweep");
    assert_eq!(handler.entry_stack.entries(), &[JvmType::Reference]);
    assert!(handler.predecessors.is_empty());

    assert!(graph.has_flag(try_start, OpcodeFlags::START_OF_TRY_BLOCK));
    assert!(graph.has_flag(try_end, OpcodeFlags::START_OF_TRY_BLOCK_END));
    assert!(graph.has_flag(handler_start, OpcodeFlags::START_OF_EXCEPTION_HANDLER));

    // the join after the try and the handler sees the same (empty) stack from both
    let exit = graph.block_at(Offset(graph.code_len() - 1));
    assert_eq!(exit.predecessors.len(), 2);
}

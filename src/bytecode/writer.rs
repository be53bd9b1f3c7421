use super::insn::{CompareMode, EqComparison, InvokeKind, OrdComparison, ShiftType};
use crate::classfile::descriptors::BaseType;
use crate::classfile::ConstantIndex;
use crate::util::Offset;
use byteorder::{BigEndian, ByteOrder};
use std::convert::TryFrom;
use std::fmt;

/// Opaque handle to a position in the code being written
///
/// A label starts out unresolved; branches against it emit placeholder displacements which get
/// patched in once [`BytecodeWriter::resolve`] pins the label to an address. A label belongs to
/// the writer that created it.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct Label(usize);

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

struct LabelState {
    address: Option<usize>,
    pending: Vec<PendingSite>,
}

/// A displacement emitted before its label was resolved
struct PendingSite {
    /// Where the placeholder bytes sit in the code buffer
    site: usize,

    /// Address of the branch opcode (displacements are relative to it)
    insn_start: usize,

    /// 4-byte displacement (switches, `goto_w`, `jsr_w`) instead of 2-byte
    wide: bool,
}

/// Assembler for a method's code array
///
/// Always picks the shortest encoding: `iconst(2)` emits `iconst_2`, `iload(300)` emits
/// `wide iload`. Branches take [`Label`]s, so forward jumps read naturally:
///
/// ```
/// use classflow::bytecode::{BytecodeWriter, OrdComparison};
///
/// let mut writer = BytecodeWriter::new();
/// let exit = writer.new_label();
/// writer.iload(0);
/// writer.if_zero(OrdComparison::EQ, exit);
/// writer.iinc(0, -1);
/// writer.resolve(exit);
/// writer.return_();
/// let code = writer.into_bytes();
/// # assert_eq!(code.len(), 8);
/// ```
///
/// Misuse panics rather than returning errors: resolving a label twice, finishing with an
/// unresolved label, or asking for an encoding that does not exist (eg. `iconst(100000)`) are
/// caller bugs, not input data problems.
pub struct BytecodeWriter {
    code: Vec<u8>,
    labels: Vec<LabelState>,
}

impl BytecodeWriter {
    pub fn new() -> BytecodeWriter {
        BytecodeWriter {
            code: vec![],
            labels: vec![],
        }
    }

    /// Create a fresh, unresolved label
    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState {
            address: None,
            pending: vec![],
        });
        Label(self.labels.len() - 1)
    }

    /// Address the next emitted instruction will land at
    pub fn position(&self) -> Offset {
        Offset(self.code.len())
    }

    /// Pin a label to the current position and back-patch every displacement emitted against it
    ///
    /// Panics if the label is already resolved.
    pub fn resolve(&mut self, label: Label) {
        let address = self.code.len();
        let state = &mut self.labels[label.0];
        assert!(state.address.is_none(), "{:?} resolved twice", label);
        state.address = Some(address);

        let pending = std::mem::take(&mut state.pending);
        for site in pending {
            let displacement = address as isize - site.insn_start as isize;
            if site.wide {
                BigEndian::write_i32(&mut self.code[site.site..], displacement as i32);
            } else {
                let short = Self::displacement16(displacement);
                BigEndian::write_i16(&mut self.code[site.site..], short);
            }
        }
    }

    /// Finish writing and take the code array
    ///
    /// Panics if any label was created but never resolved.
    pub fn into_bytes(self) -> Vec<u8> {
        for (index, state) in self.labels.iter().enumerate() {
            assert!(
                state.address.is_some(),
                "{:?} was never resolved",
                Label(index),
            );
        }
        self.code
    }

    /* Constants */

    pub fn nop(&mut self) {
        self.op(0x00);
    }

    pub fn aconst_null(&mut self) {
        self.op(0x01);
    }

    /// Push an `int`, via `iconst_<n>`, `bipush`, or `sipush`
    ///
    /// Panics for values outside the 16-bit range; those need a constant pool entry and [`ldc`].
    ///
    /// [`ldc`]: BytecodeWriter::ldc
    pub fn iconst(&mut self, value: i32) {
        match value {
            -1..=5 => self.op((0x03 + value) as u8),
            _ => match i8::try_from(value) {
                Ok(byte) => {
                    self.op(0x10);
                    self.code.push(byte as u8);
                }
                Err(_) => match i16::try_from(value) {
                    Ok(short) => {
                        self.op(0x11);
                        self.put_i16(short);
                    }
                    Err(_) => panic!("int constant {} needs an ldc", value),
                },
            },
        }
    }

    /// Push a `long`; only 0 and 1 have dedicated instructions
    pub fn lconst(&mut self, value: i64) {
        match value {
            0 | 1 => self.op(0x09 + value as u8),
            _ => panic!("long constant {} needs an ldc2", value),
        }
    }

    /// Push a `float`; only 0.0, 1.0, and 2.0 have dedicated instructions
    pub fn fconst(&mut self, value: f32) {
        if value == 0.0 && value.is_sign_positive() {
            self.op(0x0b);
        } else if value == 1.0 {
            self.op(0x0c);
        } else if value == 2.0 {
            self.op(0x0d);
        } else {
            panic!("float constant {} needs an ldc", value);
        }
    }

    /// Push a `double`; only 0.0 and 1.0 have dedicated instructions
    pub fn dconst(&mut self, value: f64) {
        if value == 0.0 && value.is_sign_positive() {
            self.op(0x0e);
        } else if value == 1.0 {
            self.op(0x0f);
        } else {
            panic!("double constant {} needs an ldc2", value);
        }
    }

    /// Push a single-slot constant, via `ldc` or `ldc_w`
    pub fn ldc(&mut self, index: ConstantIndex) {
        match u8::try_from(index.0) {
            Ok(byte) => {
                self.op(0x12);
                self.code.push(byte);
            }
            Err(_) => {
                self.op(0x13);
                self.put_u16(index.0);
            }
        }
    }

    /// Push a two-slot constant, via `ldc2_w`
    pub fn ldc2(&mut self, index: ConstantIndex) {
        self.op(0x14);
        self.put_u16(index.0);
    }

    /* Loads and stores */

    pub fn iload(&mut self, index: u16) {
        self.load_or_store(index, 0x1a, 0x15);
    }

    pub fn lload(&mut self, index: u16) {
        self.load_or_store(index, 0x1e, 0x16);
    }

    pub fn fload(&mut self, index: u16) {
        self.load_or_store(index, 0x22, 0x17);
    }

    pub fn dload(&mut self, index: u16) {
        self.load_or_store(index, 0x26, 0x18);
    }

    pub fn aload(&mut self, index: u16) {
        self.load_or_store(index, 0x2a, 0x19);
    }

    pub fn istore(&mut self, index: u16) {
        self.load_or_store(index, 0x3b, 0x36);
    }

    pub fn lstore(&mut self, index: u16) {
        self.load_or_store(index, 0x3f, 0x37);
    }

    pub fn fstore(&mut self, index: u16) {
        self.load_or_store(index, 0x43, 0x38);
    }

    pub fn dstore(&mut self, index: u16) {
        self.load_or_store(index, 0x47, 0x39);
    }

    pub fn astore(&mut self, index: u16) {
        self.load_or_store(index, 0x4b, 0x3a);
    }

    pub fn iaload(&mut self) {
        self.op(0x2e);
    }

    pub fn laload(&mut self) {
        self.op(0x2f);
    }

    pub fn faload(&mut self) {
        self.op(0x30);
    }

    pub fn daload(&mut self) {
        self.op(0x31);
    }

    pub fn aaload(&mut self) {
        self.op(0x32);
    }

    pub fn baload(&mut self) {
        self.op(0x33);
    }

    pub fn caload(&mut self) {
        self.op(0x34);
    }

    pub fn saload(&mut self) {
        self.op(0x35);
    }

    pub fn iastore(&mut self) {
        self.op(0x4f);
    }

    pub fn lastore(&mut self) {
        self.op(0x50);
    }

    pub fn fastore(&mut self) {
        self.op(0x51);
    }

    pub fn dastore(&mut self) {
        self.op(0x52);
    }

    pub fn aastore(&mut self) {
        self.op(0x53);
    }

    pub fn bastore(&mut self) {
        self.op(0x54);
    }

    pub fn castore(&mut self) {
        self.op(0x55);
    }

    pub fn sastore(&mut self) {
        self.op(0x56);
    }

    /* Operand stack management */

    pub fn pop(&mut self) {
        self.op(0x57);
    }

    pub fn pop2(&mut self) {
        self.op(0x58);
    }

    pub fn dup(&mut self) {
        self.op(0x59);
    }

    pub fn dup_x1(&mut self) {
        self.op(0x5a);
    }

    pub fn dup_x2(&mut self) {
        self.op(0x5b);
    }

    pub fn dup2(&mut self) {
        self.op(0x5c);
    }

    pub fn dup2_x1(&mut self) {
        self.op(0x5d);
    }

    pub fn dup2_x2(&mut self) {
        self.op(0x5e);
    }

    pub fn swap(&mut self) {
        self.op(0x5f);
    }

    /* Arithmetic and logic */

    pub fn iadd(&mut self) {
        self.op(0x60);
    }

    pub fn ladd(&mut self) {
        self.op(0x61);
    }

    pub fn fadd(&mut self) {
        self.op(0x62);
    }

    pub fn dadd(&mut self) {
        self.op(0x63);
    }

    pub fn isub(&mut self) {
        self.op(0x64);
    }

    pub fn lsub(&mut self) {
        self.op(0x65);
    }

    pub fn fsub(&mut self) {
        self.op(0x66);
    }

    pub fn dsub(&mut self) {
        self.op(0x67);
    }

    pub fn imul(&mut self) {
        self.op(0x68);
    }

    pub fn lmul(&mut self) {
        self.op(0x69);
    }

    pub fn fmul(&mut self) {
        self.op(0x6a);
    }

    pub fn dmul(&mut self) {
        self.op(0x6b);
    }

    pub fn idiv(&mut self) {
        self.op(0x6c);
    }

    pub fn ldiv(&mut self) {
        self.op(0x6d);
    }

    pub fn fdiv(&mut self) {
        self.op(0x6e);
    }

    pub fn ddiv(&mut self) {
        self.op(0x6f);
    }

    pub fn irem(&mut self) {
        self.op(0x70);
    }

    pub fn lrem(&mut self) {
        self.op(0x71);
    }

    pub fn frem(&mut self) {
        self.op(0x72);
    }

    pub fn drem(&mut self) {
        self.op(0x73);
    }

    pub fn ineg(&mut self) {
        self.op(0x74);
    }

    pub fn lneg(&mut self) {
        self.op(0x75);
    }

    pub fn fneg(&mut self) {
        self.op(0x76);
    }

    pub fn dneg(&mut self) {
        self.op(0x77);
    }

    pub fn ish(&mut self, shift: ShiftType) {
        self.op(match shift {
            ShiftType::Left => 0x78,
            ShiftType::ArithmeticRight => 0x7a,
            ShiftType::LogicalRight => 0x7c,
        });
    }

    pub fn lsh(&mut self, shift: ShiftType) {
        self.op(match shift {
            ShiftType::Left => 0x79,
            ShiftType::ArithmeticRight => 0x7b,
            ShiftType::LogicalRight => 0x7d,
        });
    }

    pub fn iand(&mut self) {
        self.op(0x7e);
    }

    pub fn land(&mut self) {
        self.op(0x7f);
    }

    pub fn ior(&mut self) {
        self.op(0x80);
    }

    pub fn lor(&mut self) {
        self.op(0x81);
    }

    pub fn ixor(&mut self) {
        self.op(0x82);
    }

    pub fn lxor(&mut self) {
        self.op(0x83);
    }

    /// Increment a local, via `iinc` or `wide iinc`
    pub fn iinc(&mut self, index: u16, delta: i16) {
        match (u8::try_from(index), i8::try_from(delta)) {
            (Ok(index), Ok(delta)) => {
                self.op(0x84);
                self.code.push(index);
                self.code.push(delta as u8);
            }
            _ => {
                self.op(0xc4);
                self.op(0x84);
                self.put_u16(index);
                self.put_i16(delta);
            }
        }
    }

    /* Conversions and comparisons */

    pub fn i2l(&mut self) {
        self.op(0x85);
    }

    pub fn i2f(&mut self) {
        self.op(0x86);
    }

    pub fn i2d(&mut self) {
        self.op(0x87);
    }

    pub fn l2i(&mut self) {
        self.op(0x88);
    }

    pub fn l2f(&mut self) {
        self.op(0x89);
    }

    pub fn l2d(&mut self) {
        self.op(0x8a);
    }

    pub fn f2i(&mut self) {
        self.op(0x8b);
    }

    pub fn f2l(&mut self) {
        self.op(0x8c);
    }

    pub fn f2d(&mut self) {
        self.op(0x8d);
    }

    pub fn d2i(&mut self) {
        self.op(0x8e);
    }

    pub fn d2l(&mut self) {
        self.op(0x8f);
    }

    pub fn d2f(&mut self) {
        self.op(0x90);
    }

    pub fn i2b(&mut self) {
        self.op(0x91);
    }

    pub fn i2c(&mut self) {
        self.op(0x92);
    }

    pub fn i2s(&mut self) {
        self.op(0x93);
    }

    pub fn lcmp(&mut self) {
        self.op(0x94);
    }

    pub fn fcmp(&mut self, mode: CompareMode) {
        self.op(match mode {
            CompareMode::L => 0x95,
            CompareMode::G => 0x96,
        });
    }

    pub fn dcmp(&mut self, mode: CompareMode) {
        self.op(match mode {
            CompareMode::L => 0x97,
            CompareMode::G => 0x98,
        });
    }

    /* Branches */

    /// Compare an `int` against zero, covering `ifeq` through `ifle`
    pub fn if_zero(&mut self, comparison: OrdComparison, target: Label) {
        let opcode = match comparison {
            OrdComparison::EQ => 0x99,
            OrdComparison::NE => 0x9a,
            OrdComparison::LT => 0x9b,
            OrdComparison::GE => 0x9c,
            OrdComparison::GT => 0x9d,
            OrdComparison::LE => 0x9e,
        };
        self.branch16(opcode, target);
    }

    /// Compare two `int`s, covering `if_icmpeq` through `if_icmple`
    pub fn if_icmp(&mut self, comparison: OrdComparison, target: Label) {
        let opcode = match comparison {
            OrdComparison::EQ => 0x9f,
            OrdComparison::NE => 0xa0,
            OrdComparison::LT => 0xa1,
            OrdComparison::GE => 0xa2,
            OrdComparison::GT => 0xa3,
            OrdComparison::LE => 0xa4,
        };
        self.branch16(opcode, target);
    }

    /// Compare two references, covering `if_acmpeq` and `if_acmpne`
    pub fn if_acmp(&mut self, comparison: EqComparison, target: Label) {
        let opcode = match comparison {
            EqComparison::EQ => 0xa5,
            EqComparison::NE => 0xa6,
        };
        self.branch16(opcode, target);
    }

    /// Compare a reference against `null`, covering `ifnull` and `ifnonnull`
    pub fn if_null(&mut self, comparison: EqComparison, target: Label) {
        let opcode = match comparison {
            EqComparison::EQ => 0xc6,
            EqComparison::NE => 0xc7,
        };
        self.branch16(opcode, target);
    }

    pub fn goto(&mut self, target: Label) {
        self.branch16(0xa7, target);
    }

    pub fn goto_w(&mut self, target: Label) {
        self.branch32(0xc8, target);
    }

    pub fn jsr(&mut self, target: Label) {
        self.branch16(0xa8, target);
    }

    pub fn jsr_w(&mut self, target: Label) {
        self.branch32(0xc9, target);
    }

    /// Return from a subroutine, via `ret` or `wide ret`
    pub fn ret(&mut self, index: u16) {
        match u8::try_from(index) {
            Ok(index) => {
                self.op(0xa9);
                self.code.push(index);
            }
            Err(_) => {
                self.op(0xc4);
                self.op(0xa9);
                self.put_u16(index);
            }
        }
    }

    /// Emit a `tableswitch` over the consecutive keys `low ..= low + targets.len() - 1`
    pub fn table_switch(&mut self, low: i32, default: Label, targets: &[Label]) {
        assert!(!targets.is_empty(), "tableswitch needs at least one target");
        let high = low as i64 + targets.len() as i64 - 1;
        assert!(high <= i32::MAX as i64, "tableswitch key range overflows");

        let insn_start = self.code.len();
        self.op(0xaa);
        self.pad_to_alignment();
        self.label_ref32(insn_start, default);
        self.put_i32(low);
        self.put_i32(high as i32);
        for target in targets {
            self.label_ref32(insn_start, *target);
        }
    }

    /// Emit a `lookupswitch`; the keys must be strictly ascending
    pub fn lookup_switch(&mut self, default: Label, pairs: &[(i32, Label)]) {
        assert!(
            pairs.windows(2).all(|window| window[0].0 < window[1].0),
            "lookupswitch keys must be strictly ascending",
        );

        let insn_start = self.code.len();
        self.op(0xab);
        self.pad_to_alignment();
        self.label_ref32(insn_start, default);
        self.put_i32(pairs.len() as i32);
        for (key, target) in pairs {
            self.put_i32(*key);
            self.label_ref32(insn_start, *target);
        }
    }

    /* Returns and throws */

    pub fn ireturn(&mut self) {
        self.op(0xac);
    }

    pub fn lreturn(&mut self) {
        self.op(0xad);
    }

    pub fn freturn(&mut self) {
        self.op(0xae);
    }

    pub fn dreturn(&mut self) {
        self.op(0xaf);
    }

    pub fn areturn(&mut self) {
        self.op(0xb0);
    }

    pub fn return_(&mut self) {
        self.op(0xb1);
    }

    pub fn athrow(&mut self) {
        self.op(0xbf);
    }

    /* Field access, calls, objects */

    pub fn get_static(&mut self, field: ConstantIndex) {
        self.op(0xb2);
        self.put_u16(field.0);
    }

    pub fn put_static(&mut self, field: ConstantIndex) {
        self.op(0xb3);
        self.put_u16(field.0);
    }

    pub fn get_field(&mut self, field: ConstantIndex) {
        self.op(0xb4);
        self.put_u16(field.0);
    }

    pub fn put_field(&mut self, field: ConstantIndex) {
        self.op(0xb5);
        self.put_u16(field.0);
    }

    pub fn invoke(&mut self, kind: InvokeKind, method: ConstantIndex) {
        match kind {
            InvokeKind::Virtual => {
                self.op(0xb6);
                self.put_u16(method.0);
            }
            InvokeKind::Special => {
                self.op(0xb7);
                self.put_u16(method.0);
            }
            InvokeKind::Static => {
                self.op(0xb8);
                self.put_u16(method.0);
            }
            InvokeKind::Interface(count) => {
                self.op(0xb9);
                self.put_u16(method.0);
                self.code.push(count);
                self.code.push(0);
            }
        }
    }

    pub fn new_object(&mut self, class: ConstantIndex) {
        self.op(0xbb);
        self.put_u16(class.0);
    }

    pub fn newarray(&mut self, element: BaseType) {
        self.op(0xbc);
        self.code.push(element.atype());
    }

    pub fn anewarray(&mut self, class: ConstantIndex) {
        self.op(0xbd);
        self.put_u16(class.0);
    }

    pub fn multianewarray(&mut self, class: ConstantIndex, dimensions: u8) {
        assert!(dimensions >= 1, "multianewarray needs at least one dimension");
        self.op(0xc5);
        self.put_u16(class.0);
        self.code.push(dimensions);
    }

    pub fn arraylength(&mut self) {
        self.op(0xbe);
    }

    pub fn checkcast(&mut self, class: ConstantIndex) {
        self.op(0xc0);
        self.put_u16(class.0);
    }

    pub fn instanceof(&mut self, class: ConstantIndex) {
        self.op(0xc1);
        self.put_u16(class.0);
    }

    pub fn monitorenter(&mut self) {
        self.op(0xc2);
    }

    pub fn monitorexit(&mut self) {
        self.op(0xc3);
    }

    /* Encoding helpers */

    fn op(&mut self, opcode: u8) {
        self.code.push(opcode);
    }

    fn put_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn put_i16(&mut self, value: i16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn put_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn displacement16(displacement: isize) -> i16 {
        match i16::try_from(displacement) {
            Ok(short) => short,
            Err(_) => panic!(
                "branch displacement {} does not fit in 16 bits (use the wide form)",
                displacement,
            ),
        }
    }

    /// The load/store instructions follow the same pattern:
    ///
    ///   - short form (0-3) have dedicated bytes
    ///   - normal form (0-255) uses the base opcode plus a byte operand
    ///   - wide form (256-65535) uses a `wide` prefix plus two byte operands
    fn load_or_store(&mut self, index: u16, short_form_start: u8, normal_form: u8) {
        match u8::try_from(index) {
            Ok(n @ 0..=3) => self.op(short_form_start + n),
            Ok(n) => {
                self.op(normal_form);
                self.code.push(n);
            }
            Err(_) => {
                self.op(0xc4);
                self.op(normal_form);
                self.put_u16(index);
            }
        }
    }

    fn branch16(&mut self, opcode: u8, target: Label) {
        let insn_start = self.code.len();
        self.op(opcode);
        self.label_ref16(insn_start, target);
    }

    fn branch32(&mut self, opcode: u8, target: Label) {
        let insn_start = self.code.len();
        self.op(opcode);
        self.label_ref32(insn_start, target);
    }

    fn label_ref16(&mut self, insn_start: usize, target: Label) {
        match self.labels[target.0].address {
            Some(address) => {
                let short = Self::displacement16(address as isize - insn_start as isize);
                self.put_i16(short);
            }
            None => {
                let site = self.code.len();
                self.put_i16(0);
                self.labels[target.0].pending.push(PendingSite {
                    site,
                    insn_start,
                    wide: false,
                });
            }
        }
    }

    fn label_ref32(&mut self, insn_start: usize, target: Label) {
        match self.labels[target.0].address {
            Some(address) => {
                self.put_i32((address as isize - insn_start as isize) as i32);
            }
            None => {
                let site = self.code.len();
                self.put_i32(0);
                self.labels[target.0].pending.push(PendingSite {
                    site,
                    insn_start,
                    wide: true,
                });
            }
        }
    }

    /// Zero-pad to the next multiple of four bytes from the start of the code array
    fn pad_to_alignment(&mut self) {
        while self.code.len() % 4 != 0 {
            self.code.push(0);
        }
    }
}

impl Default for BytecodeWriter {
    fn default() -> Self {
        BytecodeWriter::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bytecode::{BytecodeParser, InstructionEvent};
    use crate::classfile::{ConstantPool, MethodBody};

    fn decode(code: Vec<u8>) -> Vec<(Offset, String)> {
        let pool = ConstantPool::new();
        let body = MethodBody::new(code);
        let mut parser = BytecodeParser::new(&body, &pool);
        let mut events = vec![];
        while let Some((offset, event)) = parser.next_event().unwrap() {
            events.push((offset, format!("{:?}", event)));
        }
        events
    }

    #[test]
    fn shortest_forms_are_chosen() {
        let mut writer = BytecodeWriter::new();
        writer.iconst(3); // iconst_3
        writer.iconst(-100); // bipush
        writer.iconst(-1000); // sipush
        writer.aload(0); // aload_0
        writer.iload(5); // iload 5
        writer.istore(300); // wide istore 300
        writer.iinc(2, 1); // iinc
        writer.iinc(2, 1000); // wide iinc

        assert_eq!(
            writer.into_bytes(),
            vec![
                0x06, //
                0x10, 0x9c, //
                0x11, 0xfc, 0x18, //
                0x2a, //
                0x15, 5, //
                0xc4, 0x36, 0x01, 0x2c, //
                0x84, 2, 1, //
                0xc4, 0x84, 0x00, 0x02, 0x03, 0xe8,
            ]
        );
    }

    #[test]
    fn one_label_patches_every_forward_reference() {
        let mut writer = BytecodeWriter::new();
        let exit = writer.new_label();

        writer.iload(0); // 0
        writer.if_zero(OrdComparison::EQ, exit); // 1
        writer.iload(1); // 4
        writer.if_zero(OrdComparison::NE, exit); // 5
        writer.nop(); // 8
        writer.resolve(exit); // 9
        writer.return_(); // 9
        let code = writer.into_bytes();

        // both sites now hold displacements to offset 9
        assert_eq!(&code[2..4], &[0x00, 0x08]);
        assert_eq!(&code[6..8], &[0x00, 0x04]);

        let pool = ConstantPool::new();
        let body = MethodBody::new(code);
        let mut parser = BytecodeParser::new(&body, &pool);
        parser.next_event().unwrap();
        assert_eq!(
            parser.next_event().unwrap(),
            Some((
                Offset(1),
                InstructionEvent::If(OrdComparison::EQ, Offset(9))
            ))
        );
        parser.next_event().unwrap();
        assert_eq!(
            parser.next_event().unwrap(),
            Some((
                Offset(5),
                InstructionEvent::If(OrdComparison::NE, Offset(9))
            ))
        );
    }

    #[test]
    fn backward_branches_encode_immediately() {
        let mut writer = BytecodeWriter::new();
        let top = writer.new_label();
        writer.resolve(top);
        writer.iinc(0, 1);
        writer.goto(top);
        let code = writer.into_bytes();

        // goto at 3, displacement -3
        assert_eq!(&code[3..], &[0xa7, 0xff, 0xfd]);
    }

    #[test]
    fn switches_round_trip_through_the_parser() {
        let mut writer = BytecodeWriter::new();
        let case_a = writer.new_label();
        let case_b = writer.new_label();
        let fallback = writer.new_label();

        writer.nop(); // push the switch off 4-byte alignment
        writer.table_switch(7, fallback, &[case_a, case_b]);
        writer.resolve(case_a);
        writer.iconst(0);
        writer.ireturn();
        writer.resolve(case_b);
        writer.iconst(1);
        writer.ireturn();
        writer.resolve(fallback);
        writer.iconst(-1);
        writer.ireturn();

        let events = decode(writer.into_bytes());
        assert_eq!(events[0].1, "Nop");
        assert_eq!(
            events[1].1,
            "TableSwitch { default: @28, low: 7, targets: [@24, @26] }"
        );
        assert_eq!(events[1].0, Offset(1));
    }

    #[test]
    fn lookup_switch_round_trips() {
        let mut writer = BytecodeWriter::new();
        let odd = writer.new_label();
        let fallback = writer.new_label();

        writer.lookup_switch(fallback, &[(1, odd), (3, odd)]);
        writer.resolve(odd);
        writer.return_();
        writer.resolve(fallback);
        writer.return_();

        let events = decode(writer.into_bytes());
        assert_eq!(
            events[0].1,
            "LookupSwitch { default: @29, pairs: [(1, @28), (3, @28)] }"
        );
    }

    #[test]
    #[should_panic(expected = "resolved twice")]
    fn double_resolve_panics() {
        let mut writer = BytecodeWriter::new();
        let label = writer.new_label();
        writer.resolve(label);
        writer.resolve(label);
    }

    #[test]
    #[should_panic(expected = "never resolved")]
    fn pending_label_at_finish_panics() {
        let mut writer = BytecodeWriter::new();
        let label = writer.new_label();
        writer.goto(label);
        writer.into_bytes();
    }

    #[test]
    #[should_panic(expected = "needs an ldc")]
    fn oversized_iconst_panics() {
        let mut writer = BytecodeWriter::new();
        writer.iconst(1 << 20);
    }

    #[test]
    #[should_panic(expected = "never resolved")]
    fn unreferenced_label_at_finish_panics() {
        let mut writer = BytecodeWriter::new();
        let _scratch = writer.new_label();
        writer.return_();
        writer.into_bytes();
    }
}

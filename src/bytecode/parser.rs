use super::insn::*;
use crate::classfile::descriptors::BaseType;
use crate::classfile::{Constant, ConstantIndex, ConstantPool, MethodBody};
use crate::errors::{ClassFormatErrorKind, Error};
use crate::util::Offset;
use byteorder::{BigEndian, ByteOrder};

/// Streaming decoder for a method's code array
///
/// The parser is a plain cursor: each [`next_event`] call decodes the instruction at the current
/// position and advances past it. The caller stays in charge of the walk and can redirect it
/// between instructions with [`continue_at`], eg. to skip a region or to re-visit a target.
///
/// [`next_event`]: BytecodeParser::next_event
/// [`continue_at`]: BytecodeParser::continue_at
pub struct BytecodeParser<'a> {
    code: &'a [u8],
    pool: &'a ConstantPool,

    /// Address one past the last instruction to decode
    end: usize,

    /// Address of the next instruction
    pos: usize,

    /// Address of the instruction currently being decoded
    insn_start: usize,
}

impl<'a> BytecodeParser<'a> {
    /// Decode the whole code array of a method
    pub fn new(body: &'a MethodBody, pool: &'a ConstantPool) -> BytecodeParser<'a> {
        BytecodeParser {
            code: &body.code,
            pool,
            end: body.code.len(),
            pos: 0,
            insn_start: 0,
        }
    }

    /// Decode only the instructions in `[start, end)`
    ///
    /// Branch targets may still point anywhere in the full code array. Panics if the range does
    /// not lie within the code array.
    pub fn with_range(
        body: &'a MethodBody,
        pool: &'a ConstantPool,
        start: Offset,
        end: Offset,
    ) -> BytecodeParser<'a> {
        assert!(
            start.0 <= end.0 && end.0 <= body.code.len(),
            "invalid parse range {:?}..{:?} for {} bytes of code",
            start,
            end,
            body.code.len(),
        );
        BytecodeParser {
            code: &body.code,
            pool,
            end: end.0,
            pos: start.0,
            insn_start: start.0,
        }
    }

    /// Decode the instruction at the cursor, or `None` once the cursor has reached the end
    pub fn next_event(&mut self) -> Result<Option<(Offset, InstructionEvent<'a>)>, Error> {
        if self.pos >= self.end {
            return Ok(None);
        }
        self.insn_start = self.pos;
        let event = self.decode_one()?;
        log::trace!("decoded {:?} : {:?}", Offset(self.insn_start), event);
        Ok(Some((Offset(self.insn_start), event)))
    }

    /// Address of the next instruction the cursor will decode
    pub fn position(&self) -> Offset {
        Offset(self.pos)
    }

    /// Redirect the cursor
    ///
    /// Takes effect at the next [`next_event`] call. The offset must be an instruction start;
    /// pointing the cursor into the middle of an instruction decodes garbage (and usually a
    /// decode error).
    ///
    /// [`next_event`]: BytecodeParser::next_event
    pub fn continue_at(&mut self, offset: Offset) {
        self.pos = offset.0;
    }

    fn decode_one(&mut self) -> Result<InstructionEvent<'a>, Error> {
        use InstructionEvent::*;

        let opcode = self.u1()?;
        let event = match opcode {
            0x00 => Nop,
            0x01 => AConstNull,
            0x02..=0x08 => IConst(opcode as i32 - 0x03),
            0x09 | 0x0a => LConst((opcode - 0x09) as i64),
            0x0b..=0x0d => FConst((opcode - 0x0b) as f32),
            0x0e | 0x0f => DConst((opcode - 0x0e) as f64),
            0x10 => IConst(self.s1()? as i32),
            0x11 => IConst(self.s2()? as i32),
            0x12 => {
                let index = ConstantIndex(self.u1()? as u16);
                Ldc(self.loadable(index)?)
            }
            0x13 => {
                let index = ConstantIndex(self.u2()?);
                Ldc(self.loadable(index)?)
            }
            0x14 => {
                let index = ConstantIndex(self.u2()?);
                Ldc2(self.loadable2(index)?)
            }
            0x15 => ILoad(self.u1()? as u16),
            0x16 => LLoad(self.u1()? as u16),
            0x17 => FLoad(self.u1()? as u16),
            0x18 => DLoad(self.u1()? as u16),
            0x19 => ALoad(self.u1()? as u16),
            0x1a..=0x1d => ILoad((opcode - 0x1a) as u16),
            0x1e..=0x21 => LLoad((opcode - 0x1e) as u16),
            0x22..=0x25 => FLoad((opcode - 0x22) as u16),
            0x26..=0x29 => DLoad((opcode - 0x26) as u16),
            0x2a..=0x2d => ALoad((opcode - 0x2a) as u16),
            0x2e => IALoad,
            0x2f => LALoad,
            0x30 => FALoad,
            0x31 => DALoad,
            0x32 => AALoad,
            0x33 => BALoad,
            0x34 => CALoad,
            0x35 => SALoad,
            0x36 => IStore(self.u1()? as u16),
            0x37 => LStore(self.u1()? as u16),
            0x38 => FStore(self.u1()? as u16),
            0x39 => DStore(self.u1()? as u16),
            0x3a => AStore(self.u1()? as u16),
            0x3b..=0x3e => IStore((opcode - 0x3b) as u16),
            0x3f..=0x42 => LStore((opcode - 0x3f) as u16),
            0x43..=0x46 => FStore((opcode - 0x43) as u16),
            0x47..=0x4a => DStore((opcode - 0x47) as u16),
            0x4b..=0x4e => AStore((opcode - 0x4b) as u16),
            0x4f => IAStore,
            0x50 => LAStore,
            0x51 => FAStore,
            0x52 => DAStore,
            0x53 => AAStore,
            0x54 => BAStore,
            0x55 => CAStore,
            0x56 => SAStore,
            0x57 => Pop,
            0x58 => Pop2,
            0x59 => Dup,
            0x5a => DupX1,
            0x5b => DupX2,
            0x5c => Dup2,
            0x5d => Dup2X1,
            0x5e => Dup2X2,
            0x5f => Swap,
            0x60 => IAdd,
            0x61 => LAdd,
            0x62 => FAdd,
            0x63 => DAdd,
            0x64 => ISub,
            0x65 => LSub,
            0x66 => FSub,
            0x67 => DSub,
            0x68 => IMul,
            0x69 => LMul,
            0x6a => FMul,
            0x6b => DMul,
            0x6c => IDiv,
            0x6d => LDiv,
            0x6e => FDiv,
            0x6f => DDiv,
            0x70 => IRem,
            0x71 => LRem,
            0x72 => FRem,
            0x73 => DRem,
            0x74 => INeg,
            0x75 => LNeg,
            0x76 => FNeg,
            0x77 => DNeg,
            0x78 => ISh(ShiftType::Left),
            0x79 => LSh(ShiftType::Left),
            0x7a => ISh(ShiftType::ArithmeticRight),
            0x7b => LSh(ShiftType::ArithmeticRight),
            0x7c => ISh(ShiftType::LogicalRight),
            0x7d => LSh(ShiftType::LogicalRight),
            0x7e => IAnd,
            0x7f => LAnd,
            0x80 => IOr,
            0x81 => LOr,
            0x82 => IXor,
            0x83 => LXor,
            0x84 => {
                let index = self.u1()? as u16;
                IInc(index, self.s1()? as i16)
            }
            0x85 => I2L,
            0x86 => I2F,
            0x87 => I2D,
            0x88 => L2I,
            0x89 => L2F,
            0x8a => L2D,
            0x8b => F2I,
            0x8c => F2L,
            0x8d => F2D,
            0x8e => D2I,
            0x8f => D2L,
            0x90 => D2F,
            0x91 => I2B,
            0x92 => I2C,
            0x93 => I2S,
            0x94 => LCmp,
            0x95 => FCmp(CompareMode::L),
            0x96 => FCmp(CompareMode::G),
            0x97 => DCmp(CompareMode::L),
            0x98 => DCmp(CompareMode::G),
            0x99 => If(OrdComparison::EQ, self.target16()?),
            0x9a => If(OrdComparison::NE, self.target16()?),
            0x9b => If(OrdComparison::LT, self.target16()?),
            0x9c => If(OrdComparison::GE, self.target16()?),
            0x9d => If(OrdComparison::GT, self.target16()?),
            0x9e => If(OrdComparison::LE, self.target16()?),
            0x9f => IfICmp(OrdComparison::EQ, self.target16()?),
            0xa0 => IfICmp(OrdComparison::NE, self.target16()?),
            0xa1 => IfICmp(OrdComparison::LT, self.target16()?),
            0xa2 => IfICmp(OrdComparison::GE, self.target16()?),
            0xa3 => IfICmp(OrdComparison::GT, self.target16()?),
            0xa4 => IfICmp(OrdComparison::LE, self.target16()?),
            0xa5 => IfACmp(EqComparison::EQ, self.target16()?),
            0xa6 => IfACmp(EqComparison::NE, self.target16()?),
            0xa7 => Goto(self.target16()?),
            0xa8 => Jsr(self.target16()?),
            0xa9 => Ret(self.u1()? as u16),
            0xaa => {
                self.skip_padding()?;
                let default = self.target32()?;
                let low = self.s4()?;
                let high = self.s4()?;
                if high < low {
                    return Err(self.err(ClassFormatErrorKind::InvertedSwitchRange { low, high }));
                }
                let count = (high as i64 - low as i64 + 1) as usize;
                let mut targets = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    targets.push(self.target32()?);
                }
                TableSwitch {
                    default,
                    low,
                    targets,
                }
            }
            0xab => {
                self.skip_padding()?;
                let default = self.target32()?;
                let npairs = self.s4()?;
                if npairs < 0 {
                    return Err(self.err(ClassFormatErrorKind::NegativePairCount(npairs)));
                }
                let mut pairs = Vec::with_capacity(npairs.min(4096) as usize);
                for _ in 0..npairs {
                    let key = self.s4()?;
                    pairs.push((key, self.target32()?));
                }
                LookupSwitch { default, pairs }
            }
            0xac => IReturn,
            0xad => LReturn,
            0xae => FReturn,
            0xaf => DReturn,
            0xb0 => AReturn,
            0xb1 => Return,
            0xb2 => GetStatic(self.field_ref()?),
            0xb3 => PutStatic(self.field_ref()?),
            0xb4 => GetField(self.field_ref()?),
            0xb5 => PutField(self.field_ref()?),
            0xb6 => Invoke(InvokeKind::Virtual, self.method_ref()?),
            0xb7 => Invoke(InvokeKind::Special, self.method_ref()?),
            0xb8 => Invoke(InvokeKind::Static, self.method_ref()?),
            0xb9 => {
                let index = ConstantIndex(self.u2()?);
                let method = self
                    .pool
                    .get_interface_method_ref(index)
                    .map_err(|kind| self.err(kind))?;
                let count = self.u1()?;
                let _pad = self.u1()?;
                Invoke(InvokeKind::Interface(count), method)
            }
            0xbb => New(self.class_ref()?),
            0xbc => {
                let atype = self.u1()?;
                match BaseType::from_atype(atype) {
                    Some(base) => NewArray(base),
                    None => return Err(self.err(ClassFormatErrorKind::InvalidArrayType(atype))),
                }
            }
            0xbd => ANewArray(self.class_ref()?),
            0xbe => ArrayLength,
            0xbf => AThrow,
            0xc0 => CheckCast(self.class_ref()?),
            0xc1 => InstanceOf(self.class_ref()?),
            0xc2 => MonitorEnter,
            0xc3 => MonitorExit,
            0xc4 => {
                let wide_opcode = self.u1()?;
                match wide_opcode {
                    0x15 => ILoad(self.u2()?),
                    0x16 => LLoad(self.u2()?),
                    0x17 => FLoad(self.u2()?),
                    0x18 => DLoad(self.u2()?),
                    0x19 => ALoad(self.u2()?),
                    0x36 => IStore(self.u2()?),
                    0x37 => LStore(self.u2()?),
                    0x38 => FStore(self.u2()?),
                    0x39 => DStore(self.u2()?),
                    0x3a => AStore(self.u2()?),
                    0x84 => {
                        let index = self.u2()?;
                        IInc(index, self.s2()?)
                    }
                    0xa9 => Ret(self.u2()?),
                    other => {
                        return Err(self.err(ClassFormatErrorKind::InvalidWideOpcode(other)))
                    }
                }
            }
            0xc5 => {
                let class = self.class_ref()?;
                let dimensions = self.u1()?;
                if dimensions == 0 {
                    return Err(self.err(ClassFormatErrorKind::ZeroDimensions));
                }
                MultiANewArray(class, dimensions)
            }
            0xc6 => IfNull(EqComparison::EQ, self.target16()?),
            0xc7 => IfNull(EqComparison::NE, self.target16()?),
            0xc8 => Goto(self.target32()?),
            0xc9 => Jsr(self.target32()?),
            other => return Err(self.err(ClassFormatErrorKind::InvalidOpcode(other))),
        };
        Ok(event)
    }

    fn err(&self, kind: ClassFormatErrorKind) -> Error {
        Error::ClassFormat {
            at: Offset(self.insn_start),
            kind,
        }
    }

    fn u1(&mut self) -> Result<u8, Error> {
        if self.pos >= self.end {
            return Err(self.err(ClassFormatErrorKind::TruncatedInstruction));
        }
        let byte = self.code[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn u2(&mut self) -> Result<u16, Error> {
        if self.pos + 2 > self.end {
            return Err(self.err(ClassFormatErrorKind::TruncatedInstruction));
        }
        let short = BigEndian::read_u16(&self.code[self.pos..]);
        self.pos += 2;
        Ok(short)
    }

    fn s1(&mut self) -> Result<i8, Error> {
        self.u1().map(|b| b as i8)
    }

    fn s2(&mut self) -> Result<i16, Error> {
        self.u2().map(|s| s as i16)
    }

    fn s4(&mut self) -> Result<i32, Error> {
        if self.pos + 4 > self.end {
            return Err(self.err(ClassFormatErrorKind::TruncatedInstruction));
        }
        let word = BigEndian::read_i32(&self.code[self.pos..]);
        self.pos += 4;
        Ok(word)
    }

    /// Turn a displacement relative to the current instruction into an absolute offset
    fn resolve_target(&self, displacement: i32) -> Result<Offset, Error> {
        let absolute = self.insn_start as isize + displacement as isize;
        if absolute < 0 || absolute as usize >= self.code.len() {
            return Err(self.err(ClassFormatErrorKind::BranchTargetOutOfBounds(absolute)));
        }
        Ok(Offset(absolute as usize))
    }

    fn target16(&mut self) -> Result<Offset, Error> {
        let displacement = self.s2()?;
        self.resolve_target(displacement as i32)
    }

    fn target32(&mut self) -> Result<Offset, Error> {
        let displacement = self.s4()?;
        self.resolve_target(displacement)
    }

    /// Skip to the next multiple of four bytes from the start of the code array
    fn skip_padding(&mut self) -> Result<(), Error> {
        while self.pos % 4 != 0 {
            if self.pos >= self.end {
                return Err(self.err(ClassFormatErrorKind::TruncatedInstruction));
            }
            self.pos += 1;
        }
        Ok(())
    }

    fn loadable(&mut self, index: ConstantIndex) -> Result<Loadable<'a>, Error> {
        match self.pool.get(index).map_err(|kind| self.err(kind))? {
            Constant::Integer(value) => Ok(Loadable::Int(*value)),
            Constant::Float(value) => Ok(Loadable::Float(*value)),
            Constant::String(value) => Ok(Loadable::String(value)),
            Constant::Class(class) => Ok(Loadable::Class(class)),
            _ => Err(self.err(ClassFormatErrorKind::UnexpectedConstant {
                index,
                expected: "loadable single-slot constant",
            })),
        }
    }

    fn loadable2(&mut self, index: ConstantIndex) -> Result<Loadable2, Error> {
        match self.pool.get(index).map_err(|kind| self.err(kind))? {
            Constant::Long(value) => Ok(Loadable2::Long(*value)),
            Constant::Double(value) => Ok(Loadable2::Double(*value)),
            _ => Err(self.err(ClassFormatErrorKind::UnexpectedConstant {
                index,
                expected: "Long or Double",
            })),
        }
    }

    fn field_ref(&mut self) -> Result<&'a crate::classfile::FieldRef, Error> {
        let index = ConstantIndex(self.u2()?);
        self.pool.get_field_ref(index).map_err(|kind| self.err(kind))
    }

    fn method_ref(&mut self) -> Result<&'a crate::classfile::MethodRef, Error> {
        let index = ConstantIndex(self.u2()?);
        self.pool
            .get_method_ref(index)
            .map_err(|kind| self.err(kind))
    }

    fn class_ref(&mut self) -> Result<&'a crate::classfile::ClassRef, Error> {
        let index = ConstantIndex(self.u2()?);
        self.pool.get_class(index).map_err(|kind| self.err(kind))
    }
}

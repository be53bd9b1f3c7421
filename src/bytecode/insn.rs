use crate::classfile::descriptors::BaseType;
use crate::classfile::{ClassRef, FieldRef, MethodRef};
use crate::util::Offset;
use std::ops::Not;

/// One decoded JVM instruction
///
/// Constant pool operands arrive already resolved: a `getfield` event carries the [`FieldRef`]
/// it names, not the raw pool index. Branch operands are absolute offsets into the code array.
#[derive(Clone, Debug, PartialEq)]
pub enum InstructionEvent<'a> {
    Nop,
    AConstNull,
    IConst(i32), // covers `iconst_m1` ... `iconst_5`, `bipush`, and `sipush`
    LConst(i64),
    FConst(f32),
    DConst(f64),
    Ldc(Loadable<'a>), // covers both `ldc` and `ldc_w`
    Ldc2(Loadable2),
    ILoad(u16), // covers `iload`, `iload_{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore_{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishl`, `ishr`, and `iushr`
    LSh(ShiftType),
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode),
    If(OrdComparison, Offset), // covers `ifeq`, `ifne`, ... `ifle`
    IfICmp(OrdComparison, Offset),
    IfACmp(EqComparison, Offset),
    IfNull(EqComparison, Offset), // covers `ifnull` and `ifnonnull`
    Goto(Offset),                 // covers `goto` and `goto_w`
    Jsr(Offset),                  // covers `jsr` and `jsr_w`
    Ret(u16),                     // covers `ret` and `wide ret`
    TableSwitch {
        default: Offset,
        low: i32,
        targets: Vec<Offset>,
    },
    LookupSwitch {
        default: Offset,
        pairs: Vec<(i32, Offset)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    GetStatic(&'a FieldRef),
    PutStatic(&'a FieldRef),
    GetField(&'a FieldRef),
    PutField(&'a FieldRef),
    Invoke(InvokeKind, &'a MethodRef),
    New(&'a ClassRef),
    NewArray(BaseType),
    ANewArray(&'a ClassRef),
    MultiANewArray(&'a ClassRef, u8),
    ArrayLength,
    AThrow,
    CheckCast(&'a ClassRef),
    InstanceOf(&'a ClassRef),
    MonitorEnter,
    MonitorExit,
}

impl<'a> InstructionEvent<'a> {
    /// Can control continue with the next sequential instruction?
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            InstructionEvent::Goto(_)
                | InstructionEvent::Ret(_)
                | InstructionEvent::TableSwitch { .. }
                | InstructionEvent::LookupSwitch { .. }
                | InstructionEvent::IReturn
                | InstructionEvent::LReturn
                | InstructionEvent::FReturn
                | InstructionEvent::DReturn
                | InstructionEvent::AReturn
                | InstructionEvent::Return
                | InstructionEvent::AThrow
        )
    }

    /// Non-fallthrough jump targets of this instruction
    pub fn jump_targets(&self) -> JumpTargets {
        match self {
            InstructionEvent::If(_, target)
            | InstructionEvent::IfICmp(_, target)
            | InstructionEvent::IfACmp(_, target)
            | InstructionEvent::IfNull(_, target)
            | InstructionEvent::Goto(target)
            | InstructionEvent::Jsr(target) => JumpTargets::One(*target),
            InstructionEvent::TableSwitch {
                default, targets, ..
            } => {
                let mut ts = vec![*default];
                ts.extend(targets.iter().copied());
                JumpTargets::Many(ts)
            }
            InstructionEvent::LookupSwitch { default, pairs } => {
                let mut ts = vec![*default];
                ts.extend(pairs.iter().map(|(_, target)| *target));
                JumpTargets::Many(ts)
            }
            _ => JumpTargets::None,
        }
    }

    /// Does this instruction end the basic block it sits in?
    pub fn ends_block(&self) -> bool {
        !self.falls_through() || !matches!(self.jump_targets(), JumpTargets::None)
    }
}

/// Non-fallthrough jump targets of an instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JumpTargets {
    None,
    One(Offset),
    Many(Vec<Offset>),
}

impl JumpTargets {
    pub fn targets(&self) -> &[Offset] {
        match self {
            JumpTargets::None => &[],
            JumpTargets::One(target) => std::slice::from_ref(target),
            JumpTargets::Many(targets) => targets,
        }
    }
}

/// Loadable single-slot constants (the operand of `ldc` and `ldc_w`)
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Loadable<'a> {
    Int(i32),
    Float(f32),
    String(&'a str),
    Class(&'a ClassRef),
}

/// Loadable two-slot constants (the operand of `ldc2_w`)
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Loadable2 {
    Long(i64),
    Double(f64),
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// The four `invoke*` instructions that name their target through the constant pool
///
/// `invokedynamic` is deliberately not here; it does not occur in the class files this crate is
/// pointed at and would drag in the whole bootstrap-method machinery.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,

    /// The `u8` is the count operand byte of `invokeinterface`
    Interface(u8),
}

impl InvokeKind {
    /// Does the call pop a receiver object under its arguments?
    pub fn has_receiver(&self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fallthrough_and_targets() {
        let goto = InstructionEvent::Goto(Offset(10));
        assert!(!goto.falls_through());
        assert_eq!(goto.jump_targets().targets(), &[Offset(10)]);
        assert!(goto.ends_block());

        let iflt = InstructionEvent::If(OrdComparison::LT, Offset(4));
        assert!(iflt.falls_through());
        assert_eq!(iflt.jump_targets().targets(), &[Offset(4)]);
        assert!(iflt.ends_block());

        let jsr = InstructionEvent::Jsr(Offset(20));
        assert!(jsr.falls_through());
        assert!(jsr.ends_block());

        let ret = InstructionEvent::Ret(1);
        assert!(!ret.falls_through());
        assert!(ret.jump_targets().targets().is_empty());
        assert!(ret.ends_block());

        let iadd = InstructionEvent::IAdd;
        assert!(iadd.falls_through());
        assert!(!iadd.ends_block());
    }

    #[test]
    fn switch_targets_start_with_default() {
        let switch = InstructionEvent::LookupSwitch {
            default: Offset(40),
            pairs: vec![(1, Offset(8)), (10, Offset(16))],
        };
        assert!(!switch.falls_through());
        assert_eq!(
            switch.jump_targets().targets(),
            &[Offset(40), Offset(8), Offset(16)]
        );
    }

    #[test]
    fn comparison_negation() {
        assert_eq!(!OrdComparison::LT, OrdComparison::GE);
        assert_eq!(!OrdComparison::EQ, OrdComparison::NE);
        assert_eq!(!!OrdComparison::GT, OrdComparison::GT);
        assert_eq!(!EqComparison::EQ, EqComparison::NE);
    }
}

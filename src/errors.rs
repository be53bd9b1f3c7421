use crate::classfile::ConstantIndex;
use crate::classfile::descriptors::JvmType;
use crate::util::Offset;
use std::fmt;

/// Errors produced while decoding or analyzing a method body
///
/// The two variants are deliberately kept apart: a [`ClassFormat`] error means the byte array
/// itself cannot be decoded into instructions, while a [`Verify`] error means the instructions
/// decode fine but their operand stacks do not line up. Misuse of the assembler and violated
/// internal invariants are not represented here at all; those panic.
///
/// [`ClassFormat`]: Error::ClassFormat
/// [`Verify`]: Error::Verify
#[derive(Debug)]
pub enum Error {
    /// The code array is not valid JVM bytecode
    ClassFormat {
        at: Offset,
        kind: ClassFormatErrorKind,
    },

    /// The code decodes, but operand stack simulation failed
    Verify { at: Offset, kind: VerifyErrorKind },
}

#[derive(Debug, PartialEq, Eq)]
pub enum ClassFormatErrorKind {
    /// Opcode byte that is not a JVM instruction
    InvalidOpcode(u8),

    /// Opcode that may not follow a `wide` prefix
    InvalidWideOpcode(u8),

    /// The code array ends in the middle of an instruction's operands
    TruncatedInstruction,

    /// A branch resolves to an address outside the code array
    BranchTargetOutOfBounds(isize),

    /// A branch or handler points into the middle of an instruction
    BranchTargetMidInstruction,

    /// An exception handler table entry names addresses outside the code array
    HandlerOutOfBounds,

    /// A `tableswitch` whose high key is below its low key
    InvertedSwitchRange { low: i32, high: i32 },

    /// A `lookupswitch` with a negative pair count
    NegativePairCount(i32),

    /// Constant pool index with no entry behind it
    MissingConstant(ConstantIndex),

    /// Constant pool entry of the wrong kind for the referencing instruction
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
    },

    /// A field or method descriptor string that does not parse
    BadDescriptor(String),

    /// A `newarray` whose `atype` operand names no primitive type
    InvalidArrayType(u8),

    /// A `multianewarray` with a dimension count of zero
    ZeroDimensions,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyErrorKind {
    /// An instruction popped from an empty operand stack
    EmptyStack,

    /// An instruction popped a value of the wrong type
    WrongType { expected: JvmType, found: JvmType },

    /// An instruction popped a category 2 value where a category 1 pair was required
    WrongCategory(JvmType),

    /// A field or method descriptor that does not parse, so the instruction's stack effect is
    /// unknowable
    UnusableDescriptor(String),

    /// Two paths into the same block carry different stack shapes
    StackShapeConflict {
        existing: Vec<JvmType>,
        incoming: Vec<JvmType>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ClassFormat { at, kind } => {
                write!(f, "malformed bytecode at {:?}: {:?}", at, kind)
            }
            Error::Verify { at, kind } => {
                write!(f, "stack shape error at {:?}: {:?}", at, kind)
            }
        }
    }
}

impl std::error::Error for Error {}

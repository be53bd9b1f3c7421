use crate::util::Offset;

/// Entry in a method's exception handler table
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ExceptionHandler {
    /// Start of the range in the method where the handler applies (inclusive)
    pub start_pc: Offset,

    /// End of the range in the method where the handler applies (exclusive)
    pub end_pc: Offset,

    /// Start of the exception handler code
    pub handler_pc: Offset,
}

/// The analyzable part of a method: its code array and its exception handler table
///
/// The constant pool is not carried here because it belongs to the enclosing class, not the
/// method; it gets borrowed alongside the body at analysis time.
#[derive(Debug, Default)]
pub struct MethodBody {
    pub code: Vec<u8>,
    pub handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    pub fn new(code: Vec<u8>) -> MethodBody {
        MethodBody {
            code,
            handlers: vec![],
        }
    }

    pub fn with_handlers(code: Vec<u8>, handlers: Vec<ExceptionHandler>) -> MethodBody {
        MethodBody { code, handlers }
    }
}

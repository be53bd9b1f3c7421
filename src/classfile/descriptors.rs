//! Field and method descriptor strings
//!
//! Descriptors are only ever read here, never rendered: the analysis needs to know how many
//! operand stack slots a `getfield` or `invokevirtual` moves, and of which types, and that is
//! exactly the information a descriptor encodes.

use crate::errors::ClassFormatErrorKind;
use crate::util::Width;
use std::iter::Peekable;
use std::str::Chars;

/// Types as they appear on the operand stack
///
/// This is coarser than the descriptor grammar: `byte`, `char`, `short`, and `boolean` are all
/// `int` once they are on the stack, and every class or array type is just a reference.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Reference,

    /// Pushed by `jsr`, consumed by `ret`
    ReturnAddress,
}

impl JvmType {
    /// Computational category, per the JVM specification: category 2 types take two stack slots
    pub fn category(&self) -> usize {
        self.width()
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JvmType::Reference)
    }
}

impl Width for JvmType {
    fn width(&self) -> usize {
        match self {
            JvmType::Long | JvmType::Double => 2,
            JvmType::Int | JvmType::Float | JvmType::Reference | JvmType::ReturnAddress => 1,
        }
    }
}

/// Primitive element types of a `newarray` instruction
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// The `atype` operand byte of `newarray`
    pub fn atype(&self) -> u8 {
        match self {
            BaseType::Boolean => 4,
            BaseType::Char => 5,
            BaseType::Float => 6,
            BaseType::Double => 7,
            BaseType::Byte => 8,
            BaseType::Short => 9,
            BaseType::Int => 10,
            BaseType::Long => 11,
        }
    }

    pub fn from_atype(atype: u8) -> Option<BaseType> {
        match atype {
            4 => Some(BaseType::Boolean),
            5 => Some(BaseType::Char),
            6 => Some(BaseType::Float),
            7 => Some(BaseType::Double),
            8 => Some(BaseType::Byte),
            9 => Some(BaseType::Short),
            10 => Some(BaseType::Int),
            11 => Some(BaseType::Long),
            _ => None,
        }
    }
}

impl From<BaseType> for JvmType {
    fn from(base: BaseType) -> JvmType {
        match base {
            BaseType::Byte
            | BaseType::Char
            | BaseType::Short
            | BaseType::Boolean
            | BaseType::Int => JvmType::Int,
            BaseType::Float => JvmType::Float,
            BaseType::Long => JvmType::Long,
            BaseType::Double => JvmType::Double,
        }
    }
}

/// Parse a field descriptor such as `I` or `[Ljava/lang/String;`
pub fn parse_field_descriptor(descriptor: &str) -> Result<JvmType, ClassFormatErrorKind> {
    let mut chars = descriptor.chars().peekable();
    match parse_type(&mut chars) {
        Some(typ) if chars.next().is_none() => Ok(typ),
        _ => Err(ClassFormatErrorKind::BadDescriptor(descriptor.to_string())),
    }
}

/// Parse a method descriptor such as `(ILjava/lang/Object;)J`
///
/// Returns the argument types in declaration order and the return type (`None` for `void`).
pub fn parse_method_descriptor(
    descriptor: &str,
) -> Result<(Vec<JvmType>, Option<JvmType>), ClassFormatErrorKind> {
    let bad = || ClassFormatErrorKind::BadDescriptor(descriptor.to_string());

    let mut chars = descriptor.chars().peekable();
    if chars.next() != Some('(') {
        return Err(bad());
    }

    let mut arguments = vec![];
    while chars.peek() != Some(&')') {
        arguments.push(parse_type(&mut chars).ok_or_else(bad)?);
    }
    let _ = chars.next();

    let ret = match chars.peek() {
        Some('V') => {
            let _ = chars.next();
            None
        }
        _ => Some(parse_type(&mut chars).ok_or_else(bad)?),
    };

    match chars.next() {
        None => Ok((arguments, ret)),
        Some(_) => Err(bad()),
    }
}

/// Read one field type off the front of the character buffer
fn parse_type(source: &mut Peekable<Chars>) -> Option<JvmType> {
    match source.next()? {
        'B' | 'C' | 'I' | 'S' | 'Z' => Some(JvmType::Int),
        'J' => Some(JvmType::Long),
        'F' => Some(JvmType::Float),
        'D' => Some(JvmType::Double),
        'L' => loop {
            match source.next()? {
                ';' => return Some(JvmType::Reference),
                _ => (),
            }
        },
        '[' => {
            // element type must still be well formed, even though it all flattens to a reference
            parse_type(source)?;
            Some(JvmType::Reference)
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_descriptors() {
        assert_eq!(parse_field_descriptor("I"), Ok(JvmType::Int));
        assert_eq!(parse_field_descriptor("Z"), Ok(JvmType::Int));
        assert_eq!(parse_field_descriptor("J"), Ok(JvmType::Long));
        assert_eq!(parse_field_descriptor("D"), Ok(JvmType::Double));
        assert_eq!(
            parse_field_descriptor("Ljava/lang/String;"),
            Ok(JvmType::Reference)
        );
        assert_eq!(parse_field_descriptor("[[I"), Ok(JvmType::Reference));
        assert_eq!(
            parse_field_descriptor("[Ljava/lang/Object;"),
            Ok(JvmType::Reference)
        );
    }

    #[test]
    fn bad_field_descriptors() {
        assert!(parse_field_descriptor("").is_err());
        assert!(parse_field_descriptor("Q").is_err());
        assert!(parse_field_descriptor("II").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
        assert!(parse_field_descriptor("[").is_err());
    }

    #[test]
    fn method_descriptors() {
        assert_eq!(parse_method_descriptor("()V"), Ok((vec![], None)));
        assert_eq!(
            parse_method_descriptor("(IJ)I"),
            Ok((vec![JvmType::Int, JvmType::Long], Some(JvmType::Int)))
        );
        assert_eq!(
            parse_method_descriptor("(Ljava/lang/Object;[B)Ljava/lang/String;"),
            Ok((
                vec![JvmType::Reference, JvmType::Reference],
                Some(JvmType::Reference)
            ))
        );
    }

    #[test]
    fn bad_method_descriptors() {
        assert!(parse_method_descriptor("I").is_err());
        assert!(parse_method_descriptor("()").is_err());
        assert!(parse_method_descriptor("(V)V").is_err());
        assert!(parse_method_descriptor("()VV").is_err());
        assert!(parse_method_descriptor("(I").is_err());
    }

    #[test]
    fn stack_widths() {
        assert_eq!(JvmType::Int.category(), 1);
        assert_eq!(JvmType::Reference.category(), 1);
        assert_eq!(JvmType::ReturnAddress.category(), 1);
        assert_eq!(JvmType::Long.category(), 2);
        assert_eq!(JvmType::Double.category(), 2);
    }
}

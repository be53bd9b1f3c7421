use crate::errors::ClassFormatErrorKind;
use crate::util::Width;
use std::fmt;

/// Index into a [`ConstantPool`]
///
/// Index 0 is reserved and never refers to an entry.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConstantIndex(pub u16);

impl fmt::Debug for ConstantIndex {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("#{}", self.0))
    }
}

/// Reference to a class
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ClassRef {
    /// Binary name, eg. `java/lang/String`
    pub name: String,
}

/// Reference to a field
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FieldRef {
    pub class: String,
    pub name: String,

    /// Field descriptor, eg. `[B`
    pub descriptor: String,
}

/// Reference to a method (on a class or on an interface)
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MethodRef {
    pub class: String,
    pub name: String,

    /// Method descriptor, eg. `(II)J`
    pub descriptor: String,
}

/// Constant pool entry kinds that bytecode instructions can refer to
#[derive(Clone, Debug)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(ClassRef),
    FieldRef(FieldRef),
    MethodRef(MethodRef),
    InterfaceMethodRef(MethodRef),
}

impl Width for Constant {
    /// `long` and `double` entries occupy two pool slots
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Constant pool of the enclosing class
///
/// Entries are stored against their slot index, with `None` in slot 0 and in the phantom slot
/// after each `long` or `double` entry.
#[derive(Default, Debug)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        ConstantPool {
            entries: vec![None],
        }
    }

    /// Add an entry, returning the index it landed at
    pub fn push(&mut self, constant: Constant) -> ConstantIndex {
        let index = ConstantIndex(self.entries.len() as u16);
        let width = constant.width();
        self.entries.push(Some(constant));
        if width == 2 {
            self.entries.push(None);
        }
        index
    }

    /// Look up an entry
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, ClassFormatErrorKind> {
        match self.entries.get(index.0 as usize) {
            Some(Some(constant)) => Ok(constant),
            _ => Err(ClassFormatErrorKind::MissingConstant(index)),
        }
    }

    /// Look up a `Class` entry
    pub fn get_class(&self, index: ConstantIndex) -> Result<&ClassRef, ClassFormatErrorKind> {
        match self.get(index)? {
            Constant::Class(class) => Ok(class),
            _ => Err(ClassFormatErrorKind::UnexpectedConstant {
                index,
                expected: "Class",
            }),
        }
    }

    /// Look up a `FieldRef` entry
    pub fn get_field_ref(&self, index: ConstantIndex) -> Result<&FieldRef, ClassFormatErrorKind> {
        match self.get(index)? {
            Constant::FieldRef(field) => Ok(field),
            _ => Err(ClassFormatErrorKind::UnexpectedConstant {
                index,
                expected: "FieldRef",
            }),
        }
    }

    /// Look up a `MethodRef` entry
    pub fn get_method_ref(&self, index: ConstantIndex) -> Result<&MethodRef, ClassFormatErrorKind> {
        match self.get(index)? {
            Constant::MethodRef(method) => Ok(method),
            _ => Err(ClassFormatErrorKind::UnexpectedConstant {
                index,
                expected: "MethodRef",
            }),
        }
    }

    /// Look up an `InterfaceMethodRef` entry
    pub fn get_interface_method_ref(
        &self,
        index: ConstantIndex,
    ) -> Result<&MethodRef, ClassFormatErrorKind> {
        match self.get(index)? {
            Constant::InterfaceMethodRef(method) => Ok(method),
            _ => Err(ClassFormatErrorKind::UnexpectedConstant {
                index,
                expected: "InterfaceMethodRef",
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let i = pool.push(Constant::Integer(7));
        let l = pool.push(Constant::Long(8));
        let f = pool.push(Constant::Float(9.0));

        assert_eq!(i, ConstantIndex(1));
        assert_eq!(l, ConstantIndex(2));
        assert_eq!(f, ConstantIndex(4));

        // the phantom slot behind a `long` is not addressable
        assert!(pool.get(ConstantIndex(3)).is_err());
        assert!(pool.get(ConstantIndex(4)).is_ok());
    }

    #[test]
    fn kind_checked_lookup() {
        let mut pool = ConstantPool::new();
        let cls = pool.push(Constant::Class(ClassRef {
            name: "java/lang/Object".to_string(),
        }));

        assert!(pool.get_class(cls).is_ok());
        assert!(matches!(
            pool.get_field_ref(cls),
            Err(ClassFormatErrorKind::UnexpectedConstant {
                expected: "FieldRef",
                ..
            })
        ));
        assert!(matches!(
            pool.get(ConstantIndex(0)),
            Err(ClassFormatErrorKind::MissingConstant(_))
        ));
    }
}

use std::fmt::{Debug, Formatter};
use std::ops::{Add, Sub};

/// Elements with a width (eg. operand stack slots, which can take 1 or 2 slots)
pub trait Width {
    fn width(&self) -> usize;
}

/// Byte offset into a method's code array
///
/// All branch targets, block boundaries, and flag queries are expressed in terms of these
/// offsets, never in terms of instruction counts (instructions have different sizes).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Offset(pub usize);

impl Sub for Offset {
    type Output = isize;

    fn sub(self, other: Offset) -> isize {
        (self.0 as isize) - (other.0 as isize)
    }
}

impl Add<usize> for Offset {
    type Output = Offset;

    fn add(self, other: usize) -> Offset {
        Offset(self.0 + other)
    }
}

impl Debug for Offset {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("@{}", self.0))
    }
}

use super::{apply, apply_bits, check_bounds, check_range, BitOp, ControlError, Integral, Numeric, Op};
use std::cmp::Ordering;
use std::fmt;

/// A number that always satisfies `min <= value <= max`.
///
/// Every write goes through a range check first; on failure the stored value
/// is left untouched.
#[derive(Debug, Clone, Copy)]
pub struct Bounded<T: Numeric> {
    value: T,
    min: T,
    max: T,
}

impl<T: Numeric> Bounded<T> {
    pub fn new(value: T, min: T, max: T) -> Result<Self, ControlError> {
        check_bounds(min, max)?;
        let value = check_range(value, min, max)?;
        Ok(Self { value, min, max })
    }

    /// Zero with the full range of `T`.
    pub fn full_range() -> Self {
        Self {
            value: T::ZERO,
            min: T::MIN,
            max: T::MAX,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn set(&mut self, value: T) -> Result<(), ControlError> {
        self.value = check_range(value, self.min, self.max)?;
        Ok(())
    }

    fn update(&mut self, op: Op, rhs: T) -> Result<(), ControlError> {
        self.value = apply(op, self.value, rhs, self.min, self.max)?;
        Ok(())
    }

    pub fn try_add(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update(Op::Add, rhs)
    }

    pub fn try_sub(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update(Op::Sub, rhs)
    }

    pub fn try_mul(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update(Op::Mul, rhs)
    }

    pub fn try_div(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update(Op::Div, rhs)
    }

    pub fn try_rem(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update(Op::Rem, rhs)
    }

    pub fn increment(&mut self) -> Result<(), ControlError> {
        self.update(Op::Add, T::ONE)
    }

    pub fn decrement(&mut self) -> Result<(), ControlError> {
        self.update(Op::Sub, T::ONE)
    }
}

impl<T: Integral> Bounded<T> {
    fn update_bits(&mut self, op: BitOp, rhs: T, shift: u32) -> Result<(), ControlError> {
        self.value = apply_bits(op, self.value, rhs, shift, self.min, self.max)?;
        Ok(())
    }

    pub fn try_and(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update_bits(BitOp::And, rhs, 0)
    }

    pub fn try_or(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update_bits(BitOp::Or, rhs, 0)
    }

    pub fn try_xor(&mut self, rhs: T) -> Result<(), ControlError> {
        self.update_bits(BitOp::Xor, rhs, 0)
    }

    pub fn try_shl(&mut self, shift: u32) -> Result<(), ControlError> {
        self.update_bits(BitOp::Shl, T::ZERO, shift)
    }

    pub fn try_shr(&mut self, shift: u32) -> Result<(), ControlError> {
        self.update_bits(BitOp::Shr, T::ZERO, shift)
    }
}

impl<T: Numeric> Default for Bounded<T> {
    fn default() -> Self {
        Self::full_range()
    }
}

impl<T: Numeric> PartialEq<T> for Bounded<T> {
    fn eq(&self, other: &T) -> bool {
        self.value == *other
    }
}

impl<T: Numeric> PartialOrd<T> for Bounded<T> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.value.partial_cmp(other)
    }
}

impl<T: Numeric> fmt::Display for Bounded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

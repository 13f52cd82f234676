//! Checked numeric and pointer wrappers.
//!
//! Three shapes cover every combination the index code needs:
//! - [`Bounded`]: always initialized, every write is range checked.
//! - [`Checked`]: must be written before it can be read, optionally range checked.
//! - [`CheckedPtr`]: a nullable reference that refuses null dereference.
//!
//! All failures are returned as [`ControlError`] at the point of violation.

pub mod bounded;
pub mod checked;
pub mod pointer;

pub use bounded::Bounded;
pub use checked::Checked;
pub use pointer::CheckedPtr;

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("value read before it was initialized")]
    NotInitialized,
    #[error("value {value} is out of bounds [{min}, {max}]")]
    OutOfBounds {
        value: String,
        min: String,
        max: String,
    },
    #[error("null pointer dereference")]
    NullPointer,
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: String, max: String },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Primitive number usable inside the wrappers.
pub trait Numeric: Copy + PartialOrd + fmt::Debug + fmt::Display {
    const ZERO: Self;
    const ONE: Self;
    const MIN: Self;
    const MAX: Self;

    fn checked_add(self, rhs: Self) -> Option<Self>;
    fn checked_sub(self, rhs: Self) -> Option<Self>;
    fn checked_mul(self, rhs: Self) -> Option<Self>;
    fn checked_div(self, rhs: Self) -> Option<Self>;
    fn checked_rem(self, rhs: Self) -> Option<Self>;
}

/// Integer types additionally support the bitwise operations.
pub trait Integral:
    Numeric + BitAnd<Output = Self> + BitOr<Output = Self> + BitXor<Output = Self>
{
    fn checked_shl(self, rhs: u32) -> Option<Self>;
    fn checked_shr(self, rhs: u32) -> Option<Self>;
}

macro_rules! impl_integral {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                fn checked_add(self, rhs: Self) -> Option<Self> { <$t>::checked_add(self, rhs) }
                fn checked_sub(self, rhs: Self) -> Option<Self> { <$t>::checked_sub(self, rhs) }
                fn checked_mul(self, rhs: Self) -> Option<Self> { <$t>::checked_mul(self, rhs) }
                fn checked_div(self, rhs: Self) -> Option<Self> { <$t>::checked_div(self, rhs) }
                fn checked_rem(self, rhs: Self) -> Option<Self> { <$t>::checked_rem(self, rhs) }
            }

            impl Integral for $t {
                fn checked_shl(self, rhs: u32) -> Option<Self> { <$t>::checked_shl(self, rhs) }
                fn checked_shr(self, rhs: u32) -> Option<Self> { <$t>::checked_shr(self, rhs) }
            }
        )*
    };
}

// Floats never "overflow" in IEEE terms; a non-finite result is treated as one.
macro_rules! impl_float {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                fn checked_add(self, rhs: Self) -> Option<Self> { finite(self + rhs) }
                fn checked_sub(self, rhs: Self) -> Option<Self> { finite(self - rhs) }
                fn checked_mul(self, rhs: Self) -> Option<Self> { finite(self * rhs) }
                fn checked_div(self, rhs: Self) -> Option<Self> { finite(self / rhs) }
                fn checked_rem(self, rhs: Self) -> Option<Self> { finite(self % rhs) }
            }
        )*
    };
}

impl_integral!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_float!(f32, f64);

fn finite<F: Into<f64> + Copy>(v: F) -> Option<F> {
    if v.into().is_finite() {
        Some(v)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
        }
    }

    fn eval<T: Numeric>(self, lhs: T, rhs: T) -> Option<T> {
        match self {
            Op::Add => lhs.checked_add(rhs),
            Op::Sub => lhs.checked_sub(rhs),
            Op::Mul => lhs.checked_mul(rhs),
            Op::Div => lhs.checked_div(rhs),
            Op::Rem => lhs.checked_rem(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BitOp {
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

pub(crate) fn check_range<T: Numeric>(value: T, min: T, max: T) -> Result<T, ControlError> {
    if min <= value && value <= max {
        Ok(value)
    } else {
        Err(out_of_bounds(value, min, max))
    }
}

pub(crate) fn check_bounds<T: Numeric>(min: T, max: T) -> Result<(), ControlError> {
    if min <= max {
        Ok(())
    } else {
        Err(ControlError::InvalidRange {
            min: min.to_string(),
            max: max.to_string(),
        })
    }
}

fn out_of_bounds<T: Numeric>(value: impl fmt::Display, min: T, max: T) -> ControlError {
    ControlError::OutOfBounds {
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

/// Computes `lhs op rhs` and validates the result against `[min, max]`.
pub(crate) fn apply<T: Numeric>(op: Op, lhs: T, rhs: T, min: T, max: T) -> Result<T, ControlError> {
    if matches!(op, Op::Div | Op::Rem) && rhs == T::ZERO {
        return Err(ControlError::DivisionByZero);
    }
    match op.eval(lhs, rhs) {
        Some(v) => check_range(v, min, max),
        None => Err(out_of_bounds(
            format_args!("{} {} {}", lhs, op.symbol(), rhs),
            min,
            max,
        )),
    }
}

/// Bitwise counterpart of [`apply`]. Shifts use `rhs` as the shift amount.
pub(crate) fn apply_bits<T: Integral>(
    op: BitOp,
    lhs: T,
    rhs: T,
    shift: u32,
    min: T,
    max: T,
) -> Result<T, ControlError> {
    let result = match op {
        BitOp::And => Some(lhs & rhs),
        BitOp::Or => Some(lhs | rhs),
        BitOp::Xor => Some(lhs ^ rhs),
        BitOp::Shl => lhs.checked_shl(shift),
        BitOp::Shr => lhs.checked_shr(shift),
    };
    match result {
        Some(v) => check_range(v, min, max),
        None => Err(out_of_bounds(format_args!("{} shifted by {}", lhs, shift), min, max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_reports_out_of_bounds() {
        let err = apply(Op::Add, i8::MAX, 1, i8::MIN, i8::MAX).unwrap_err();
        assert_eq!(
            err,
            ControlError::OutOfBounds {
                value: "127 + 1".to_string(),
                min: "-128".to_string(),
                max: "127".to_string(),
            }
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(apply(Op::Div, 10u32, 0, 0, 100), Err(ControlError::DivisionByZero));
        assert_eq!(apply(Op::Rem, 1.5f64, 0.0, -10.0, 10.0), Err(ControlError::DivisionByZero));
    }

    #[test]
    fn test_float_infinity_is_rejected() {
        assert!(matches!(
            apply(Op::Mul, f32::MAX, 2.0, f32::MIN, f32::MAX),
            Err(ControlError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_shift_past_width() {
        assert!(apply_bits(BitOp::Shl, 1u8, 0, 8, 0, u8::MAX).is_err());
        assert_eq!(apply_bits(BitOp::Shl, 1u8, 0, 7, 0, u8::MAX), Ok(128));
        assert_eq!(apply_bits(BitOp::Xor, 0b1100u8, 0b1010, 0, 0, u8::MAX), Ok(0b0110));
    }
}

use super::{apply, apply_bits, check_bounds, check_range, BitOp, ControlError, Integral, Numeric, Op};
use std::cmp::Ordering;

/// A number that must be written before it can be read.
///
/// The initialized flag flips on the first successful write and stays set.
/// Optional bounds behave exactly like [`Bounded`](super::Bounded).
#[derive(Debug, Clone, Copy)]
pub struct Checked<T: Numeric> {
    value: Option<T>,
    min: T,
    max: T,
}

impl<T: Numeric> Checked<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            min: T::MIN,
            max: T::MAX,
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            value: Some(value),
            min: T::MIN,
            max: T::MAX,
        }
    }

    /// Uninitialized, with every later write checked against `[min, max]`.
    pub fn bounded(min: T, max: T) -> Result<Self, ControlError> {
        check_bounds(min, max)?;
        Ok(Self {
            value: None,
            min,
            max,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Result<T, ControlError> {
        self.value.ok_or(ControlError::NotInitialized)
    }

    pub fn set(&mut self, value: T) -> Result<(), ControlError> {
        self.value = Some(check_range(value, self.min, self.max)?);
        Ok(())
    }

    pub fn try_eq(&self, other: T) -> Result<bool, ControlError> {
        Ok(self.get()? == other)
    }

    pub fn try_cmp(&self, other: T) -> Result<Option<Ordering>, ControlError> {
        Ok(self.get()?.partial_cmp(&other))
    }

    fn update(&mut self, op: Op, rhs: T) -> Result<(), ControlError> {
        let current = self.get()?;
        self.value = Some(apply(op, current, rhs, self.min, self.max)?);
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

impl<T: Integral> Checked<T> {
    fn update_bits(&mut self, op: BitOp, rhs: T, shift: u32) -> Result<(), ControlError> {
        let current = self.get()?;
        self.value = Some(apply_bits(op, current, rhs, shift, self.min, self.max)?);
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

impl<T: Numeric> Default for Checked<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_before_write_fails() {
        let mut c: Checked<u32> = Checked::new();
        assert!(!c.is_initialized());
        assert_eq!(c.get(), Err(ControlError::NotInitialized));
        assert_eq!(c.try_eq(0), Err(ControlError::NotInitialized));
        assert_eq!(c.try_cmp(0), Err(ControlError::NotInitialized));
        assert_eq!(c.try_add(1), Err(ControlError::NotInitialized));
        assert_eq!(c.increment(), Err(ControlError::NotInitialized));
        assert_eq!(c.try_or(1), Err(ControlError::NotInitialized));
        assert!(!c.is_initialized());

        c.set(7).unwrap();
        assert!(c.is_initialized());
        assert_eq!(c.get(), Ok(7));
        assert_eq!(c.try_eq(7), Ok(true));
        assert_eq!(c.try_cmp(9), Ok(Some(Ordering::Less)));
        assert_eq!(c.get(), Ok(7));
    }

    #[test]
    fn test_flag_survives_failed_write() {
        let mut c = Checked::bounded(1i16, 12).unwrap();
        assert!(c.set(13).is_err());
        assert!(!c.is_initialized());

        c.set(12).unwrap();
        assert!(c.increment().is_err());
        assert!(c.is_initialized());
        assert_eq!(c.get(), Ok(12));

        c.try_sub(11).unwrap();
        assert_eq!(c.get(), Ok(1));
        assert!(c.decrement().is_err());
        assert_eq!(c.get(), Ok(1));
    }

    #[test]
    fn test_with_value_is_readable() {
        let mut c = Checked::with_value(2.5f32);
        c.try_mul(4.0).unwrap();
        assert_eq!(c.get(), Ok(10.0));
        assert_eq!(c.try_div(0.0), Err(ControlError::DivisionByZero));
    }

    #[test]
    fn test_shifts_after_init() {
        let mut c = Checked::with_value(0x80u8);
        c.try_shr(7).unwrap();
        assert_eq!(c.get(), Ok(1));
        c.try_xor(0xFF).unwrap();
        assert_eq!(c.get(), Ok(0xFE));
        c.try_and(0x0F).unwrap();
        assert_eq!(c.get(), Ok(0x0E));
    }
}

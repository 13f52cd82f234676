use super::ControlError;

/// Nullable shared reference that fails instead of dereferencing null.
#[derive(Debug)]
pub struct CheckedPtr<'a, T: ?Sized> {
    target: Option<&'a T>,
}

impl<'a, T: ?Sized> CheckedPtr<'a, T> {
    pub fn null() -> Self {
        Self { target: None }
    }

    pub fn new(target: &'a T) -> Self {
        Self {
            target: Some(target),
        }
    }

    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    pub fn set(&mut self, target: &'a T) {
        self.target = Some(target);
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    pub fn get(&self) -> Result<&'a T, ControlError> {
        self.target.ok_or(ControlError::NullPointer)
    }
}

impl<'a, T> CheckedPtr<'a, [T]> {
    pub fn len(&self) -> Result<usize, ControlError> {
        Ok(self.get()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ControlError> {
        Ok(self.get()?.is_empty())
    }

    pub fn index(&self, index: usize) -> Result<&'a T, ControlError> {
        let slice = self.get()?;
        slice.get(index).ok_or(ControlError::IndexOutOfRange {
            index,
            len: slice.len(),
        })
    }
}

impl<T: ?Sized> Clone for CheckedPtr<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for CheckedPtr<'_, T> {}

impl<T: ?Sized> Default for CheckedPtr<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<'a, T: ?Sized> From<Option<&'a T>> for CheckedPtr<'a, T> {
    fn from(target: Option<&'a T>) -> Self {
        Self { target }
    }
}

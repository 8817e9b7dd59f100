// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

/// An opaque, heap-allocated `T` referred to only by pointer across the C
/// boundary. Callers must not dereference or inspect the pointer; only the
/// `pscan_*` functions in this crate may.
#[repr(C)]
pub struct Handle<T> {
    inner: *mut T,
}

impl<T> Handle<T> {
    /// Takes ownership of `inner` out of the handle, leaving it null so a
    /// second `take` (or a double `destroy`) is a no-op instead of a
    /// double-free.
    pub fn take(&mut self) -> Option<Box<T>> {
        let raw = std::mem::replace(&mut self.inner, std::ptr::null_mut());
        if raw.is_null() {
            None
        } else {
            Some(unsafe { Box::from_raw(raw) })
        }
    }

    /// # Safety
    /// `self.inner` must either be null or point at a live `T` that nothing
    /// else holds a mutable reference to.
    pub unsafe fn as_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }

    /// # Safety
    /// `self.inner` must either be null or point at a live `T`.
    pub unsafe fn as_ref(&self) -> Option<&T> {
        self.inner.as_ref()
    }
}

impl<T> From<T> for Handle<T> {
    fn from(value: T) -> Self {
        Handle {
            inner: Box::into_raw(Box::new(value)),
        }
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        drop(self.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_idempotent() {
        let mut h: Handle<u32> = Handle::from(42);
        assert_eq!(*h.take().unwrap(), 42);
        assert!(h.take().is_none());
    }
}

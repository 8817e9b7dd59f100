// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// The raw parts of a match-offset buffer, laid out so a host runtime can
/// read `ptr[0..len)` directly without copying.
///
/// Constructed only from Rust (via [`MatchBuffer::from_vec`]); a C caller
/// only ever receives one by value from [`crate::pscan_Context_detach`] or
/// reads its fields through the accessor functions.
#[repr(C)]
pub struct MatchBuffer {
    ptr: *const u64,
    len: usize,
    capacity: usize,
}

impl MatchBuffer {
    pub fn from_vec(vec: Vec<u64>) -> Self {
        let mut v = ManuallyDrop::new(vec);
        MatchBuffer {
            ptr: v.as_mut_ptr(),
            len: v.len(),
            capacity: v.capacity(),
        }
    }

    pub fn empty() -> Self {
        MatchBuffer {
            ptr: NonNull::dangling().as_ptr(),
            len: 0,
            capacity: 0,
        }
    }

    pub fn as_slice(&self) -> &[u64] {
        if self.capacity == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    /// Reconstructs and drops the backing `Vec<u64>`. Must not be called
    /// more than once for a given buffer's raw parts.
    fn free(&mut self) {
        if self.capacity == 0 {
            return;
        }
        let vec = unsafe { Vec::from_raw_parts(self.ptr as *mut u64, self.len, self.capacity) };
        drop(vec);
        self.ptr = NonNull::dangling().as_ptr();
        self.len = 0;
        self.capacity = 0;
    }
}

impl Drop for MatchBuffer {
    fn drop(&mut self) {
        self.free();
    }
}

// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

//! C ABI bridge over [`pscan_core::Context`].
//!
//! Every entry point is `#[no_mangle] extern "C"`, returns [`Status`] by
//! value, and never lets a panic cross the FFI boundary: [`catch_ffi`]
//! converts an unwind into the most specific applicable status instead.

mod handle;
mod matches;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use pscan_core::{Context, ScanOptions, Status};

pub use handle::Handle;
pub use matches::MatchBuffer;

/// The bridge's own upper bound on pattern length, independent of any
/// limit in `pscan_core` itself (which has none). Chosen for
/// argument-marshalling simplicity, not correctness.
const MAX_PATTERN_LEN: usize = 4096;
/// The bridge's own upper bound on path length, in bytes of UTF-8.
const MAX_PATH_LEN: usize = 1024;

/// Runs `f`, converting an unwinding panic into a [`Status`] instead of
/// letting it cross the FFI boundary.
fn catch_ffi(f: impl FnOnce() -> Status) -> Status {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            tracing::error!(%message, "panic caught at FFI boundary");
            if message.contains("alloc") || message.contains("capacity overflow") {
                Status::OutOfBounds
            } else {
                Status::InvalidArg
            }
        }
    }
}

/// Allocates a new, uninitialized context with default [`ScanOptions`].
///
/// # Safety
/// None. Must eventually be passed to exactly one of
/// [`pscan_Context_destroy`] (or dropped by its owner).
#[no_mangle]
pub extern "C" fn pscan_Context_new() -> Handle<Context> {
    Handle::from(Context::new(ScanOptions::default()))
}

/// Validates and stores `pattern`/`cap` on `ctx`.
///
/// # Safety
/// `ctx` must be non-null and point at a live context. `pattern` must be
/// valid for reads of `pattern_len` bytes, or null iff `pattern_len == 0`.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_init(
    ctx: *mut Handle<Context>,
    pattern: *const u8,
    pattern_len: usize,
    cap: i32,
) -> Status {
    catch_ffi(|| {
        let Some(ctx) = (unsafe { ctx.as_mut() }).and_then(|h| unsafe { h.as_mut() }) else {
            return Status::NullArg;
        };
        if pattern.is_null() && pattern_len != 0 {
            return Status::NullArg;
        }
        if pattern_len > MAX_PATTERN_LEN {
            return Status::InvalidArg;
        }
        if cap <= 0 {
            return Status::InvalidArg;
        }
        let pattern_slice = if pattern_len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(pattern, pattern_len) }
        };
        ctx.init(pattern_slice, cap as usize)
    })
}

/// Opens a region over the UTF-8 path `path[0..path_len)`.
///
/// # Safety
/// `ctx` must be non-null and point at a live context. `path` must be
/// valid for reads of `path_len` bytes of UTF-8.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_load(
    ctx: *mut Handle<Context>,
    path: *const u8,
    path_len: usize,
) -> Status {
    catch_ffi(|| {
        let Some(ctx) = (unsafe { ctx.as_mut() }).and_then(|h| unsafe { h.as_mut() }) else {
            return Status::NullArg;
        };
        if path.is_null() {
            return Status::NullArg;
        }
        if path_len == 0 || path_len > MAX_PATH_LEN {
            return Status::InvalidArg;
        }
        let bytes = unsafe { std::slice::from_raw_parts(path, path_len) };
        let Ok(path_str) = std::str::from_utf8(bytes) else {
            return Status::InvalidArg;
        };
        ctx.load(PathBuf::from(path_str))
    })
}

/// Runs the scan.
///
/// # Safety
/// `ctx` must be non-null and point at a live, initialized, loaded context.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_execute(ctx: *mut Handle<Context>) -> Status {
    catch_ffi(|| {
        let Some(ctx) = (unsafe { ctx.as_mut() }).and_then(|h| unsafe { h.as_mut() }) else {
            return Status::NullArg;
        };
        ctx.execute()
    })
}

/// The number of offsets the last successful `execute()` produced. `0`
/// before execution, after `destroy`, or after `detach`.
///
/// # Safety
/// `ctx` must be non-null and point at a live context.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_match_count(ctx: *const Handle<Context>) -> usize {
    let Some(handle) = (unsafe { ctx.as_ref() }) else {
        return 0;
    };
    match unsafe { handle.as_ref() } {
        Some(c) => c.match_count(),
        None => 0,
    }
}

/// A pointer to the first of `match_count()` ascending `u64` offsets. Valid
/// only until the next call to `execute`, `detach`, or `destroy` on the
/// same context. Null if there are no matches.
///
/// # Safety
/// `ctx` must be non-null and point at a live context.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_matches_ptr(ctx: *const Handle<Context>) -> *const u64 {
    let Some(handle) = (unsafe { ctx.as_ref() }) else {
        return std::ptr::null();
    };
    match unsafe { handle.as_ref() } {
        Some(c) => c.matches().as_ptr(),
        None => std::ptr::null(),
    }
}

/// Transfers ownership of the match buffer out of `ctx` to the caller,
/// implementing the core's ownership-transfer contract: after this call,
/// `pscan_Context_destroy` will not free it. The returned [`MatchBuffer`]
/// must eventually reach exactly one [`pscan_MatchBuffer_drop`] call.
///
/// # Safety
/// `ctx` must be non-null and point at a live context.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_detach(ctx: *mut Handle<Context>) -> MatchBuffer {
    let Some(ctx) = (unsafe { ctx.as_mut() }).and_then(|h| unsafe { h.as_mut() }) else {
        return MatchBuffer::empty();
    };
    MatchBuffer::from_vec(ctx.detach())
}

/// Releases the region and frees the match buffer (unless detached), then
/// frees `ctx` itself. Safe to call on an already-destroyed handle.
///
/// # Safety
/// `ctx` must be null or point at a context this crate allocated.
#[no_mangle]
pub unsafe extern "C" fn pscan_Context_destroy(ctx: *mut Handle<Context>) {
    if let Some(handle) = unsafe { ctx.as_mut() } {
        if let Some(mut inner) = handle.take() {
            inner.destroy();
        }
    }
}

/// Frees a [`MatchBuffer`] returned by [`pscan_Context_detach`]. Must be
/// called exactly once per detached buffer.
///
/// # Safety
/// `buf`'s raw parts must have come from `pscan_Context_detach` and not
/// already have been freed.
#[no_mangle]
pub unsafe extern "C" fn pscan_MatchBuffer_drop(buf: MatchBuffer) {
    drop(buf);
}

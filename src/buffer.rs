//! Two-phase output buffer protocol.
//!
//! Variable-length results are returned through a caller-provided
//! `(buffer, size)` pair. Called with a null buffer, an operation writes the
//! required element count into `size` and copies nothing. Called with a
//! buffer, it fails with `BufferTooSmall` if `*size` is less than required,
//! leaving the buffer untouched, and otherwise fills it.
//!
//! Strings require one extra element for the terminating NUL.

use crate::error::{BridgeError, Result};
use crate::handle::{to_handle_owned, Opaque};
use crate::{bail, check_not_null};
use std::os::raw::c_char;

/// Copy a slice into a caller buffer, or report its length
///
/// # Safety
///
/// `size` must be null or valid for reads and writes. A non-null `buffer`
/// must be valid for `*size` writes of `T`.
pub unsafe fn copy_slice_to_buffer<T: Copy>(
    src: &[T],
    buffer: *mut T,
    size: *mut usize,
) -> Result<()> {
    check_not_null!(size);
    if buffer.is_null() {
        // SAFETY: size is non-null and valid per the caller contract
        unsafe { *size = src.len() };
        return Ok(());
    }

    // SAFETY: as above
    let given = unsafe { *size };
    if given < src.len() {
        bail!(BridgeError::BufferTooSmall {
            what: "a vector",
            required: src.len(),
            given,
        });
    }

    // SAFETY: buffer holds at least src.len() elements and cannot overlap
    // a Rust-owned slice
    unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), buffer, src.len()) };
    Ok(())
}

/// Copy a string and its terminating NUL into a caller buffer, or report
/// the required length
///
/// # Safety
///
/// Same as [`copy_slice_to_buffer`] with `c_char` elements.
pub unsafe fn copy_str_to_buffer(
    src: &str,
    buffer: *mut c_char,
    size: *mut usize,
) -> Result<()> {
    check_not_null!(size);
    let required = src.len() + 1;
    if buffer.is_null() {
        // SAFETY: size is non-null and valid per the caller contract
        unsafe { *size = required };
        return Ok(());
    }

    // SAFETY: as above
    let given = unsafe { *size };
    if given < required {
        bail!(BridgeError::BufferTooSmall {
            what: "a string",
            required,
            given,
        });
    }

    // SAFETY: buffer holds at least `required` bytes
    unsafe {
        std::ptr::copy_nonoverlapping(src.as_ptr().cast::<c_char>(), buffer, src.len());
        *buffer.add(src.len()) = 0;
    }
    Ok(())
}

/// Move values into a caller array as owning handles, or report the count
///
/// Every handle written must eventually be destroyed by the caller. On
/// failure nothing is written and the values are dropped.
///
/// # Safety
///
/// Same as [`copy_slice_to_buffer`] with `*mut C` elements.
pub unsafe fn move_into_handle_array<C: Opaque>(
    src: Vec<C::Native>,
    array: *mut *mut C,
    size: *mut usize,
) -> Result<()> {
    check_not_null!(size);
    if array.is_null() {
        // SAFETY: size is non-null and valid per the caller contract
        unsafe { *size = src.len() };
        return Ok(());
    }

    // SAFETY: as above
    let given = unsafe { *size };
    if given < src.len() {
        bail!(BridgeError::BufferTooSmall {
            what: "a vector of handles",
            required: src.len(),
            given,
        });
    }

    for (i, value) in src.into_iter().enumerate() {
        // SAFETY: i < src.len() <= *size
        unsafe { *array.add(i) = to_handle_owned::<C>(value) };
    }
    Ok(())
}

//! C interface for [`Dim`] through checked generational handles.
//!
//! Handles are `u64` values issued by a process-wide registry. A destroyed
//! or forged handle fails with `STALE_HANDLE` instead of touching freed
//! memory, so double destroy is detected.

use super::dims_arg;
use crate::boundary::translate;
use crate::buffer::copy_slice_to_buffer;
use crate::dim::Dim;
use crate::error::Status;
use crate::handle::registry::{HandleRegistry, RawHandle};
use crate::{bridge_error, check_not_null};
use once_cell::sync::Lazy;

static DIM_HANDLES: Lazy<HandleRegistry<Dim>> = Lazy::new(|| HandleRegistry::from_config("dim"));

/// Create a `Dim` and write its checked handle into `newobj`
///
/// # Safety
///
/// `dims` must hold `n` readable values (may be null when `n` is 0);
/// `newobj` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetCreateDimHandle(
    dims: *const u32,
    n: usize,
    batch: u32,
    newobj: *mut RawHandle,
) -> Status {
    translate("dynetCreateDimHandle", || {
        check_not_null!(newobj);
        // SAFETY: forwarded caller contract
        let dims = unsafe { dims_arg(dims, n) }?;
        let dim = Dim::with_batch(dims, batch).map_err(|e| bridge_error!(e))?;
        let handle = DIM_HANDLES.insert(dim)?;
        // SAFETY: non-null and writable per the caller contract
        unsafe { *newobj = handle };
        Ok(())
    })
}

/// Copy the `Dim` behind `src` into a new checked handle
///
/// # Safety
///
/// `newobj` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetCloneDimHandle(src: RawHandle, newobj: *mut RawHandle) -> Status {
    translate("dynetCloneDimHandle", || {
        check_not_null!(newobj);
        let dim = DIM_HANDLES.with(src, |d| *d)?;
        let handle = DIM_HANDLES.insert(dim)?;
        // SAFETY: non-null and writable per the caller contract
        unsafe { *newobj = handle };
        Ok(())
    })
}

/// Destroy a checked handle
#[no_mangle]
pub extern "C" fn dynetDeleteDimHandle(handle: RawHandle) -> Status {
    translate("dynetDeleteDimHandle", || {
        DIM_HANDLES.remove(handle)?;
        Ok(())
    })
}

/// Total number of elements, batch included
///
/// # Safety
///
/// `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimHandleTotalSize(handle: RawHandle, retval: *mut u32) -> Status {
    translate("dynetGetDimHandleTotalSize", || {
        check_not_null!(retval);
        let size = DIM_HANDLES
            .with(handle, Dim::size)?
            .map_err(|e| bridge_error!(e))?;
        // SAFETY: non-null and writable per the caller contract
        unsafe { *retval = size };
        Ok(())
    })
}

/// Dimension sizes, via the buffer protocol
///
/// # Safety
///
/// `size` must be readable and writable; a non-null `retval` must hold
/// `*size` values.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimHandleDimensions(
    handle: RawHandle,
    retval: *mut u32,
    size: *mut usize,
) -> Status {
    translate("dynetGetDimHandleDimensions", || {
        check_not_null!(size);
        DIM_HANDLES.with(handle, |dim| {
            // SAFETY: forwarded caller contract
            unsafe { copy_slice_to_buffer(dim.dims(), retval, size) }
        })?
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::ffi::dynetGetLastErrorCode;

    fn create(dims: &[u32], batch: u32) -> RawHandle {
        let mut handle = 0;
        let status =
            unsafe { dynetCreateDimHandle(dims.as_ptr(), dims.len(), batch, &mut handle) };
        assert_eq!(status, Status::Ok);
        assert_ne!(handle, 0);
        handle
    }

    #[test]
    fn test_create_query_destroy() {
        let handle = create(&[2, 3], 4);

        let mut size = 0u32;
        assert_eq!(
            unsafe { dynetGetDimHandleTotalSize(handle, &mut size) },
            Status::Ok
        );
        assert_eq!(size, 24);

        let mut n = 0usize;
        unsafe { dynetGetDimHandleDimensions(handle, std::ptr::null_mut(), &mut n) };
        let mut dims = vec![0u32; n];
        assert_eq!(
            unsafe { dynetGetDimHandleDimensions(handle, dims.as_mut_ptr(), &mut n) },
            Status::Ok
        );
        assert_eq!(dims, [2, 3]);

        assert_eq!(dynetDeleteDimHandle(handle), Status::Ok);
    }

    #[test]
    fn test_total_size_overflow_is_reported() {
        let handle = create(&[65536], 65536);

        let mut size = 3u32;
        assert_eq!(
            unsafe { dynetGetDimHandleTotalSize(handle, &mut size) },
            Status::Error
        );
        assert_eq!(dynetGetLastErrorCode(), ErrorCode::NativeOperation.as_i32());
        assert_eq!(size, 3);

        assert_eq!(dynetDeleteDimHandle(handle), Status::Ok);
    }

    #[test]
    fn test_use_after_delete_is_detected() {
        let handle = create(&[5], 1);
        assert_eq!(dynetDeleteDimHandle(handle), Status::Ok);

        let mut size = 0u32;
        assert_eq!(
            unsafe { dynetGetDimHandleTotalSize(handle, &mut size) },
            Status::Error
        );
        assert_eq!(dynetGetLastErrorCode(), ErrorCode::StaleHandle.as_i32());
        assert_eq!(size, 0);
    }

    #[test]
    fn test_double_delete_is_detected() {
        let handle = create(&[5], 1);
        assert_eq!(dynetDeleteDimHandle(handle), Status::Ok);
        assert_eq!(dynetDeleteDimHandle(handle), Status::Error);
        assert_eq!(dynetGetLastErrorCode(), ErrorCode::StaleHandle.as_i32());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = create(&[2, 2], 1);
        let mut copy = 0;
        assert_eq!(
            unsafe { dynetCloneDimHandle(original, &mut copy) },
            Status::Ok
        );
        assert_ne!(copy, original);

        assert_eq!(dynetDeleteDimHandle(original), Status::Ok);
        let mut size = 0u32;
        assert_eq!(unsafe { dynetGetDimHandleTotalSize(copy, &mut size) }, Status::Ok);
        assert_eq!(size, 4);
        assert_eq!(dynetDeleteDimHandle(copy), Status::Ok);
    }

    #[test]
    fn test_invalid_shape_issues_no_handle() {
        let mut handle = 0;
        let status = unsafe { dynetCreateDimHandle(std::ptr::null(), 0, 0, &mut handle) };
        assert_eq!(status, Status::Error);
        assert_eq!(handle, 0);
        assert_eq!(dynetGetLastErrorCode(), ErrorCode::NativeOperation.as_i32());
    }
}

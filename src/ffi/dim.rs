//! C interface for [`Dim`] through raw owning handles.
//!
//! Every `dynetCreate*`, `dynetClone*` and derived-value function writes an
//! owning handle that the caller must release with [`dynetDeleteDim`]
//! exactly once. All other functions take the handle as a borrowed argument.
//! Handles carry no liveness tag: using one after `dynetDeleteDim` is
//! undefined. See [`dim_handle`](super::dim_handle) for checked handles.

use super::dims_arg;
use crate::boundary::translate;
use crate::buffer::{copy_slice_to_buffer, copy_str_to_buffer};
use crate::dim::{Dim, DimResult};
use crate::error::{Result, Status};
use crate::handle::{destroy_owned, from_handle, from_handle_mut, to_handle_owned, Opaque};
use crate::{bridge_error, check_not_null};
use std::os::raw::c_char;

crate::opaque_type!(
    /// Opaque C type standing in for [`Dim`]
    DynetDim
);

// SAFETY: DynetDim is a zero-sized marker only ever used behind pointers
unsafe impl Opaque for DynetDim {
    type Native = Dim;
}

/// Write a new owning handle for `dim` into `newobj`
///
/// # Safety
///
/// `newobj` must be non-null and writable.
unsafe fn emit(dim: Dim, newobj: *mut *mut DynetDim) -> Result<()> {
    // SAFETY: upheld by the caller
    unsafe { *newobj = to_handle_owned(dim) };
    Ok(())
}

/// Read a scalar accessor of a borrowed `Dim` into `retval`
///
/// Nothing is written when the accessor fails.
///
/// # Safety
///
/// `dim` must be null or live; `retval` must be null or writable.
unsafe fn read<T>(
    dim: *const DynetDim,
    retval: *mut T,
    f: impl FnOnce(&Dim) -> DimResult<T>,
) -> Result<()> {
    check_not_null!(dim, retval);
    // SAFETY: non-null, liveness upheld by the caller
    let value = f(unsafe { from_handle(dim) }).map_err(|e| bridge_error!(e))?;
    // SAFETY: non-null, writable per the caller contract
    unsafe { *retval = value };
    Ok(())
}

/// Create an empty `Dim` (no dimensions, batch of one)
///
/// # Safety
///
/// `newobj` must be writable. The written handle is owning.
#[no_mangle]
pub unsafe extern "C" fn dynetCreateDim(newobj: *mut *mut DynetDim) -> Status {
    translate("dynetCreateDim", || {
        check_not_null!(newobj);
        // SAFETY: checked above
        unsafe { emit(Dim::default(), newobj) }
    })
}

/// Create a `Dim` from `n` dimension sizes
///
/// # Safety
///
/// `dims` must hold `n` readable values (may be null when `n` is 0);
/// `newobj` must be writable. The written handle is owning.
#[no_mangle]
pub unsafe extern "C" fn dynetCreateDimWithDimensions(
    dims: *const u32,
    n: usize,
    newobj: *mut *mut DynetDim,
) -> Status {
    translate("dynetCreateDimWithDimensions", || {
        check_not_null!(newobj);
        // SAFETY: forwarded caller contract
        let dims = unsafe { dims_arg(dims, n) }?;
        let dim = Dim::new(dims).map_err(|e| bridge_error!(e))?;
        // SAFETY: checked above
        unsafe { emit(dim, newobj) }
    })
}

/// Create a `Dim` from `n` dimension sizes and a batch size
///
/// # Safety
///
/// Same as [`dynetCreateDimWithDimensions`].
#[no_mangle]
pub unsafe extern "C" fn dynetCreateDimWithDimensionsAndBatch(
    dims: *const u32,
    n: usize,
    batch: u32,
    newobj: *mut *mut DynetDim,
) -> Status {
    translate("dynetCreateDimWithDimensionsAndBatch", || {
        check_not_null!(newobj);
        // SAFETY: forwarded caller contract
        let dims = unsafe { dims_arg(dims, n) }?;
        let dim = Dim::with_batch(dims, batch).map_err(|e| bridge_error!(e))?;
        // SAFETY: checked above
        unsafe { emit(dim, newobj) }
    })
}

/// Copy a `Dim` into a new owning handle
///
/// # Safety
///
/// `src` must be live; `newobj` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetCloneDim(src: *const DynetDim, newobj: *mut *mut DynetDim) -> Status {
    translate("dynetCloneDim", || {
        check_not_null!(src, newobj);
        // SAFETY: non-null, liveness upheld by the caller
        let dim = *unsafe { from_handle(src) };
        // SAFETY: checked above
        unsafe { emit(dim, newobj) }
    })
}

/// Destroy an owning `Dim` handle
///
/// # Safety
///
/// `dim` must be an owning handle from this module that has not been
/// destroyed. It is dangling afterwards; destroying it twice is forbidden.
#[no_mangle]
pub unsafe extern "C" fn dynetDeleteDim(dim: *mut DynetDim) -> Status {
    translate("dynetDeleteDim", || {
        check_not_null!(dim);
        // SAFETY: upheld by the caller
        unsafe { destroy_owned(dim) };
        Ok(())
    })
}

/// Total number of elements, batch included
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimTotalSize(dim: *const DynetDim, retval: *mut u32) -> Status {
    // SAFETY: forwarded caller contract
    translate("dynetGetDimTotalSize", || unsafe { read(dim, retval, Dim::size) })
}

/// Number of elements in one batch element
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimBatchSize(dim: *const DynetDim, retval: *mut u32) -> Status {
    // SAFETY: forwarded caller contract
    translate("dynetGetDimBatchSize", || unsafe { read(dim, retval, Dim::batch_size) })
}

/// Batch size
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimBatchElems(dim: *const DynetDim, retval: *mut u32) -> Status {
    translate("dynetGetDimBatchElems", || {
        // SAFETY: forwarded caller contract
        unsafe { read(dim, retval, |d| Ok(d.batch_elems())) }
    })
}

/// Sum of all dimensions
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimSumDims(dim: *const DynetDim, retval: *mut u32) -> Status {
    // SAFETY: forwarded caller contract
    translate("dynetGetDimSumDims", || unsafe { read(dim, retval, Dim::sum_dims) })
}

/// Number of dimensions
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimNDimensions(dim: *const DynetDim, retval: *mut u32) -> Status {
    translate("dynetGetDimNDimensions", || {
        // SAFETY: forwarded caller contract
        unsafe { read(dim, retval, |d| Ok(d.ndims() as u32)) }
    })
}

/// Size of the first dimension
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimRows(dim: *const DynetDim, retval: *mut u32) -> Status {
    // SAFETY: forwarded caller contract
    translate("dynetGetDimRows", || unsafe { read(dim, retval, |d| Ok(d.rows())) })
}

/// Size of the second dimension
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimCols(dim: *const DynetDim, retval: *mut u32) -> Status {
    // SAFETY: forwarded caller contract
    translate("dynetGetDimCols", || unsafe { read(dim, retval, |d| Ok(d.cols())) })
}

/// Size of dimension `i`; 1 past the last dimension
///
/// # Safety
///
/// `dim` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimDimensionSize(
    dim: *const DynetDim,
    i: u32,
    retval: *mut u32,
) -> Status {
    translate("dynetGetDimDimensionSize", || {
        // SAFETY: forwarded caller contract
        unsafe { read(dim, retval, |d| Ok(d.get(i as usize))) }
    })
}

/// Dimension sizes, via the buffer protocol
///
/// # Safety
///
/// `dim` must be live; `size` must be readable and writable; a non-null
/// `retval` must hold `*size` values.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimDimensions(
    dim: *const DynetDim,
    retval: *mut u32,
    size: *mut usize,
) -> Status {
    translate("dynetGetDimDimensions", || {
        check_not_null!(dim, size);
        // SAFETY: non-null, liveness upheld by the caller
        let dim = unsafe { from_handle(dim) };
        // SAFETY: forwarded caller contract
        unsafe { copy_slice_to_buffer(dim.dims(), retval, size) }
    })
}

/// Set the size of dimension `i`
///
/// # Safety
///
/// `dim` must be live and not borrowed elsewhere.
#[no_mangle]
pub unsafe extern "C" fn dynetSetDimDimensionSize(dim: *mut DynetDim, i: u32, s: u32) -> Status {
    translate("dynetSetDimDimensionSize", || {
        check_not_null!(dim);
        // SAFETY: non-null, liveness upheld by the caller
        let dim = unsafe { from_handle_mut(dim) };
        dim.set(i as usize, s).map_err(|e| bridge_error!(e))
    })
}

/// Set the batch size
///
/// # Safety
///
/// `dim` must be live and not borrowed elsewhere.
#[no_mangle]
pub unsafe extern "C" fn dynetSetDimBatchElems(dim: *mut DynetDim, batch: u32) -> Status {
    translate("dynetSetDimBatchElems", || {
        check_not_null!(dim);
        // SAFETY: non-null, liveness upheld by the caller
        let dim = unsafe { from_handle_mut(dim) };
        dim.set_batch_elems(batch).map_err(|e| bridge_error!(e))
    })
}

/// Change the number of dimensions; new dimensions have size 1
///
/// # Safety
///
/// `dim` must be live and not borrowed elsewhere.
#[no_mangle]
pub unsafe extern "C" fn dynetResizeDim(dim: *mut DynetDim, i: u32) -> Status {
    translate("dynetResizeDim", || {
        check_not_null!(dim);
        // SAFETY: non-null, liveness upheld by the caller
        let dim = unsafe { from_handle_mut(dim) };
        dim.resize(i as usize).map_err(|e| bridge_error!(e))
    })
}

/// Remove dimension `i`
///
/// # Safety
///
/// `dim` must be live and not borrowed elsewhere.
#[no_mangle]
pub unsafe extern "C" fn dynetDeleteDimDimension(dim: *mut DynetDim, i: u32) -> Status {
    translate("dynetDeleteDimDimension", || {
        check_not_null!(dim);
        // SAFETY: non-null, liveness upheld by the caller
        let dim = unsafe { from_handle_mut(dim) };
        dim.delete_dim(i as usize).map_err(|e| bridge_error!(e))
    })
}

/// Copy without trailing size-1 dimensions, as a new owning handle
///
/// # Safety
///
/// `dim` must be live; `newobj` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetTruncateDim(dim: *const DynetDim, newobj: *mut *mut DynetDim) -> Status {
    translate("dynetTruncateDim", || {
        check_not_null!(dim, newobj);
        // SAFETY: non-null, liveness upheld by the caller
        let truncated = unsafe { from_handle(dim) }.truncate();
        // SAFETY: checked above
        unsafe { emit(truncated, newobj) }
    })
}

/// Copy with a batch size of one, as a new owning handle
///
/// # Safety
///
/// `dim` must be live; `newobj` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetDimSingleBatch(
    dim: *const DynetDim,
    newobj: *mut *mut DynetDim,
) -> Status {
    translate("dynetGetDimSingleBatch", || {
        check_not_null!(dim, newobj);
        // SAFETY: non-null, liveness upheld by the caller
        let single = unsafe { from_handle(dim) }.single_batch();
        // SAFETY: checked above
        unsafe { emit(single, newobj) }
    })
}

/// Transposed shape, as a new owning handle
///
/// # Safety
///
/// `dim` must be live; `newobj` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetTransposeDim(dim: *const DynetDim, newobj: *mut *mut DynetDim) -> Status {
    translate("dynetTransposeDim", || {
        check_not_null!(dim, newobj);
        // SAFETY: non-null, liveness upheld by the caller
        let transposed = unsafe { from_handle(dim) }
            .transpose()
            .map_err(|e| bridge_error!(e))?;
        // SAFETY: checked above
        unsafe { emit(transposed, newobj) }
    })
}

/// Whether two shapes are equal; writes 1 or 0
///
/// # Safety
///
/// `dim` and `other` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetIsEqualDim(
    dim: *const DynetDim,
    other: *const DynetDim,
    retval: *mut u32,
) -> Status {
    translate("dynetIsEqualDim", || {
        check_not_null!(dim, other, retval);
        // SAFETY: non-null, liveness upheld by the caller
        let other = unsafe { from_handle(other) };
        // SAFETY: forwarded caller contract
        unsafe { read(dim, retval, |d| Ok(u32::from(d == other))) }
    })
}

/// Whether two shapes differ; writes 1 or 0
///
/// # Safety
///
/// `dim` and `other` must be live; `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetIsNotEqualDim(
    dim: *const DynetDim,
    other: *const DynetDim,
    retval: *mut u32,
) -> Status {
    translate("dynetIsNotEqualDim", || {
        check_not_null!(dim, other, retval);
        // SAFETY: non-null, liveness upheld by the caller
        let other = unsafe { from_handle(other) };
        // SAFETY: forwarded caller contract
        unsafe { read(dim, retval, |d| Ok(u32::from(d != other))) }
    })
}

/// Text form such as `{2,3X4}`, via the buffer protocol
///
/// # Safety
///
/// `dim` must be live; `size` must be readable and writable; a non-null
/// `retval` must hold `*size` bytes.
#[no_mangle]
pub unsafe extern "C" fn dynetRepresentDimAsString(
    dim: *const DynetDim,
    retval: *mut c_char,
    size: *mut usize,
) -> Status {
    translate("dynetRepresentDimAsString", || {
        check_not_null!(dim, size);
        // SAFETY: non-null, liveness upheld by the caller
        let text = unsafe { from_handle(dim) }.to_string();
        // SAFETY: forwarded caller contract
        unsafe { copy_str_to_buffer(&text, retval, size) }
    })
}

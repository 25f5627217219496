//! Opaque handle bridge.
//!
//! Native objects cross the C boundary as pointers to zero-sized opaque
//! types. Each exposed type is registered once by implementing [`Opaque`];
//! the generic functions here then convert in both directions without
//! copying.
//!
//! Two flavors of handle exist:
//!
//! - **borrowing** ([`to_handle`], [`to_handle_mut`]): points into memory
//!   owned elsewhere and is never destroyed by the receiver;
//! - **owning** ([`to_handle_owned`]): a fresh heap allocation that the
//!   receiver must pass to [`destroy_owned`] exactly once.
//!
//! Raw handles carry no liveness information. Misuse is a caller contract
//! violation, not a recoverable error. [`registry::HandleRegistry`] provides
//! checked generational handles where that matters.
//!
//! ```no_run
//! use dynet_c_bridge::dim::Dim;
//! use dynet_c_bridge::ffi::dim::DynetDim;
//! use dynet_c_bridge::handle::{destroy_owned, to_handle_owned};
//!
//! let handle = to_handle_owned::<DynetDim>(Dim::default());
//! unsafe { destroy_owned(handle) };
//! // Forbidden: the handle is dangling after the first destroy.
//! unsafe { destroy_owned(handle) };
//! ```

pub mod registry;

use crate::metrics;

/// Registration of an opaque C type standing in for a native type.
///
/// # Safety
///
/// The implementing type must never be constructed or dereferenced on its
/// own; pointers to it are only ever produced by this module from pointers
/// to `Self::Native`.
pub unsafe trait Opaque: Sized {
    /// The native type behind the handle
    type Native;
}

/// Declare a zero-sized opaque C type
#[macro_export]
macro_rules! opaque_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $name {
            _private: [u8; 0],
            _marker: ::std::marker::PhantomData<(*mut u8, ::std::marker::PhantomPinned)>,
        }
    };
}

/// Borrowing handle to a native object
pub fn to_handle<C: Opaque>(native: &C::Native) -> *const C {
    (native as *const C::Native).cast()
}

/// Mutable borrowing handle to a native object
pub fn to_handle_mut<C: Opaque>(native: &mut C::Native) -> *mut C {
    (native as *mut C::Native).cast()
}

/// Move a native value to the heap and return an owning handle
pub fn to_handle_owned<C: Opaque>(value: C::Native) -> *mut C {
    metrics::global().record_handle_created();
    Box::into_raw(Box::new(value)).cast()
}

/// Reinterpret a handle as a shared reference
///
/// # Safety
///
/// `handle` must be non-null, produced by this module for `C`, not yet
/// destroyed, and (for borrowing handles) not outlive its owner.
pub unsafe fn from_handle<'a, C: Opaque>(handle: *const C) -> &'a C::Native {
    // SAFETY: upheld by the caller
    unsafe { &*handle.cast::<C::Native>() }
}

/// Reinterpret a handle as a mutable reference
///
/// # Safety
///
/// Same as [`from_handle`], and no other reference to the object may be live.
pub unsafe fn from_handle_mut<'a, C: Opaque>(handle: *mut C) -> &'a mut C::Native {
    // SAFETY: upheld by the caller
    unsafe { &mut *handle.cast::<C::Native>() }
}

/// Destroy an owning handle, dropping the native value
///
/// # Safety
///
/// `handle` must be non-null, come from [`to_handle_owned`] for `C`, and not
/// have been destroyed before. It is dangling afterwards.
pub unsafe fn destroy_owned<C: Opaque>(handle: *mut C) {
    // SAFETY: upheld by the caller
    drop(unsafe { Box::from_raw(handle.cast::<C::Native>()) });
    metrics::global().record_handle_destroyed();
}

//! Flat C interface.
//!
//! Every function here returns a [`Status`] and runs its body through the
//! translation boundary. After `DYNET_C_ERROR`, `dynetGetMessage` describes
//! the failure until the next call on the same thread.
//!
//! Error state is per thread. Calls on one thread are single in-flight; a
//! message pointer obtained on one thread must not be read after another
//! boundary call on that thread.

pub mod dim;
pub mod dim_handle;

use crate::boundary::translate;
use crate::buffer::copy_str_to_buffer;
use crate::config::{self, BridgeConfig};
use crate::error::{BridgeError, ErrorCode, Result, Status};
use crate::error_state::{self, ErrorState, MessagePolicy};
use crate::{bridge_error, check_not_null, metrics};
use std::ffi::CStr;
use std::os::raw::c_char;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Clear the calling thread's error state
#[no_mangle]
pub extern "C" fn dynetResetStatus() {
    error_state::with_current(ErrorState::reset);
}

/// Message of the calling thread's last failure, or `"OK"`
///
/// The pointer stays valid until the next boundary call on this thread.
#[no_mangle]
pub extern "C" fn dynetGetMessage() -> *const c_char {
    error_state::current_message_ptr()
}

/// Code of the calling thread's last failure, `0` when none is stored
#[no_mangle]
pub extern "C" fn dynetGetLastErrorCode() -> i32 {
    error_state::with_current(|state| state.code())
        .flatten()
        .map_or(0, ErrorCode::as_i32)
}

/// Install a JSON configuration process-wide
///
/// # Safety
///
/// `json` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dynetConfigure(json: *const c_char) -> Status {
    let mut installed = None;
    let status = translate("dynetConfigure", || {
        check_not_null!(json);
        // SAFETY: non-null and NUL-terminated per the caller contract
        let text = unsafe { CStr::from_ptr(json) }.to_str().map_err(|e| {
            bridge_error!(BridgeError::InvalidArgument(format!(
                "configuration is not valid UTF-8: {}",
                e
            )))
        })?;
        let config = BridgeConfig::from_json_str(text).map_err(|e| bridge_error!(e))?;
        config::install(config.clone()).map_err(|e| bridge_error!(e))?;
        installed = Some(config);
        Ok(())
    });
    if let Some(config) = installed {
        error_state::with_current(|state| state.set_policy(MessagePolicy::from(&config)));
    }
    status
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already set.
#[no_mangle]
pub extern "C" fn dynetInitLogging() -> Status {
    translate("dynetInitLogging", || {
        let directive = "dynet_c_bridge=info"
            .parse::<Directive>()
            .map_err(|e| bridge_error!(BridgeError::Config(format!("{}", e))))?;
        let installed = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
            .try_init()
            .is_ok();
        tracing::debug!(installed, "Logging initialized");
        Ok(())
    })
}

/// Number of owning handles created and not yet destroyed
///
/// # Safety
///
/// `retval` must be writable.
#[no_mangle]
pub unsafe extern "C" fn dynetGetLiveHandleCount(retval: *mut usize) -> Status {
    translate("dynetGetLiveHandleCount", || {
        check_not_null!(retval);
        let live = metrics::global().stats().live_handles();
        // SAFETY: non-null and writable per the caller contract
        unsafe { *retval = usize::try_from(live).unwrap_or(usize::MAX) };
        Ok(())
    })
}

/// Boundary metrics in Prometheus text format, via the buffer protocol
///
/// Counters move between the size query and the fill; callers should
/// over-allocate or retry on `BUFFER_TOO_SMALL`.
///
/// # Safety
///
/// `size` must be readable and writable; a non-null `retval` must hold
/// `*size` bytes.
#[no_mangle]
pub unsafe extern "C" fn dynetRenderMetrics(retval: *mut c_char, size: *mut usize) -> Status {
    translate("dynetRenderMetrics", || {
        check_not_null!(size);
        let text = metrics::global().to_prometheus();
        // SAFETY: forwarded caller contract
        unsafe { copy_str_to_buffer(&text, retval, size) }
    })
}

/// Borrow `n` dimension values from a C array. `dims` may be null when `n` is 0.
///
/// # Safety
///
/// A non-null `dims` must point to `n` readable values that outlive `'a`.
pub(crate) unsafe fn dims_arg<'a>(dims: *const u32, n: usize) -> Result<&'a [u32]> {
    if n == 0 {
        return Ok(&[]);
    }
    check_not_null!(dims);
    // SAFETY: non-null and valid for n reads per the caller contract
    Ok(unsafe { std::slice::from_raw_parts(dims, n) })
}

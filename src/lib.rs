//! # DyNet C Bridge
//!
//! A flat C ABI over native DyNet value types. Native failures never cross
//! the boundary: each exported function returns a status code and leaves a
//! human-readable message in a per-thread error context.
//!
//! ## Architecture
//!
//! ```text
//! C caller
//!     │
//!     │ extern "C" (ffi)
//!     ▼
//! Translation boundary (boundary, error_state)
//!     │
//!     │ opaque handles, output buffers (handle, buffer)
//!     ▼
//! Native types (dim)
//! ```
//!
//! ## Features
//!
//! - **Status Codes**: `DYNET_C_OK` / `DYNET_C_ERROR` with `"file: line: msg"` messages
//! - **Panic Containment**: panics are caught and reported like any other failure
//! - **Opaque Handles**: zero-copy raw handles plus checked generational handles
//! - **Buffer Protocol**: size query then fill for every variable-length result
//! - **Metrics**: call, failure and live-handle counters in Prometheus format

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod boundary;
pub mod buffer;
pub mod config;
pub mod dim;
pub mod error;
pub mod error_state;
#[allow(non_snake_case)]
pub mod ffi;
pub mod handle;
pub mod metrics;

// Re-export commonly used types
pub use boundary::{translate, translate_with};
pub use config::BridgeConfig;
pub use dim::{Dim, DimError, MAX_TENSOR_DIM};
pub use error::{BridgeError, Error, ErrorCode, Result, Status};
pub use error_state::ErrorState;
pub use handle::registry::{HandleRegistry, RawHandle};
pub use handle::Opaque;
pub use metrics::BoundaryStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

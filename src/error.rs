//! Error types for the C boundary.
//!
//! This module defines the status codes returned across the flat interface,
//! the failure taxonomy, and the located error value that the boundary
//! records into the error state.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Status returned by every exported function
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The call completed and its outputs are valid
    Ok = 0,
    /// The call failed; see `dynetGetMessage`
    Error = -1,
}

impl Status {
    /// Check if status indicates success
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Check if status indicates failure
    pub fn is_error(self) -> bool {
        self == Status::Error
    }
}

/// Error codes for categorizing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required argument was null or structurally invalid
    InvalidArgument,
    /// Caller-provided output buffer is smaller than required
    BufferTooSmall,
    /// Failure raised by the wrapped native computation
    NativeOperation,
    /// Generational handle is stale, destroyed, or was never issued
    StaleHandle,
    /// Handle registry capacity exhausted
    ResourceLimit,
    /// Internal protocol misuse (e.g. rethrow with nothing stored)
    ProtocolMisuse,
    /// Invalid bridge configuration
    Config,
}

impl ErrorCode {
    /// Stable numeric code reported by `dynetGetLastErrorCode`
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::InvalidArgument => 1,
            ErrorCode::BufferTooSmall => 2,
            ErrorCode::NativeOperation => 3,
            ErrorCode::StaleHandle => 4,
            ErrorCode::ResourceLimit => 5,
            ErrorCode::ProtocolMisuse => 6,
            ErrorCode::Config => 7,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorCode::BufferTooSmall => write!(f, "BUFFER_TOO_SMALL"),
            ErrorCode::NativeOperation => write!(f, "NATIVE_OPERATION"),
            ErrorCode::StaleHandle => write!(f, "STALE_HANDLE"),
            ErrorCode::ResourceLimit => write!(f, "RESOURCE_LIMIT"),
            ErrorCode::ProtocolMisuse => write!(f, "PROTOCOL_MISUSE"),
            ErrorCode::Config => write!(f, "CONFIG"),
        }
    }
}

/// Failure taxonomy for boundary calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Required pointer argument was null
    #[error("Argument `{0}` must not be null.")]
    NullArgument(&'static str),

    /// Argument is present but structurally invalid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output buffer capacity is less than the required size
    #[error("Size is not enough to copy {what}: required {required}, given {given}.")]
    BufferTooSmall {
        /// What was being copied ("a vector", "a string", ...)
        what: &'static str,
        /// Required element count
        required: usize,
        /// Capacity the caller provided
        given: usize,
    },

    /// Failure raised by the native computation, forwarded verbatim
    #[error("{0}")]
    Native(String),

    /// Generational handle no longer refers to a live object
    #[error("Handle {0:#018x} is stale or was never issued.")]
    StaleHandle(u64),

    /// Resource limit exceeded
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Diagnostic misuse of the error state
    #[error("{0}")]
    ProtocolMisuse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Error code for this failure kind
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::NullArgument(_) | BridgeError::InvalidArgument(_) => {
                ErrorCode::InvalidArgument
            }
            BridgeError::BufferTooSmall { .. } => ErrorCode::BufferTooSmall,
            BridgeError::Native(_) => ErrorCode::NativeOperation,
            BridgeError::StaleHandle(_) => ErrorCode::StaleHandle,
            BridgeError::ResourceLimit(_) => ErrorCode::ResourceLimit,
            BridgeError::ProtocolMisuse(_) => ErrorCode::ProtocolMisuse,
            BridgeError::Config(_) => ErrorCode::Config,
        }
    }
}

impl From<crate::config::ConfigError> for BridgeError {
    fn from(e: crate::config::ConfigError) -> Self {
        BridgeError::Config(e.to_string())
    }
}

impl From<crate::dim::DimError> for BridgeError {
    fn from(e: crate::dim::DimError) -> Self {
        BridgeError::Native(e.to_string())
    }
}

/// A failure together with the source location that raised it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    file: Cow<'static, str>,
    line: u32,
    kind: BridgeError,
}

impl Error {
    /// Create a located error. Usually built through [`bridge_error!`](crate::bridge_error).
    pub fn new(
        file: impl Into<Cow<'static, str>>,
        line: u32,
        kind: impl Into<BridgeError>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            kind: kind.into(),
        }
    }

    /// The failure kind
    pub fn kind(&self) -> &BridgeError {
        &self.kind
    }

    /// The failure's error code
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Source file of the raise site
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source line of the raise site
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.file, self.line, self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Result type alias for boundary operations
pub type Result<T> = std::result::Result<T, Error>;

/// Build an [`Error`] located at the invocation site.
#[macro_export]
macro_rules! bridge_error {
    ($kind:expr) => {
        $crate::error::Error::new(file!(), line!(), $kind)
    };
}

/// Return early with an [`Error`] located at the invocation site.
#[macro_export]
macro_rules! bail {
    ($kind:expr) => {
        return Err($crate::bridge_error!($kind))
    };
}

/// Fail with a `NullArgument` error for the first null pointer argument.
#[macro_export]
macro_rules! check_not_null {
    ($($var:ident),+ $(,)?) => {
        $(
            if $var.is_null() {
                $crate::bail!($crate::error::BridgeError::NullArgument(stringify!($var)));
            }
        )+
    };
}

//! Holder of the most recent boundary failure.
//!
//! An [`ErrorState`] keeps at most one [`ErrorRecord`]. Every boundary call
//! that fails overwrites it; `reset` clears it. Each thread gets its own
//! state through [`with_current`], so failures on different threads never
//! observe each other. Once a thread's state has been torn down (exports
//! called from other thread-local destructors), failures are still reported
//! through the status code but no message is kept. An `ErrorState` can also be owned explicitly and
//! passed to [`translate_with`](crate::boundary::translate_with).

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Error, ErrorCode, Result, Status};
use std::cell::RefCell;
use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Message reported when no failure is stored
pub const OK_MESSAGE: &str = "OK";

const OK_C_MESSAGE: &CStr = c"OK";

/// How failure messages are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePolicy {
    /// Prefix the message with `file: line: `
    pub include_location: bool,
    /// Truncate longer messages to this many bytes
    pub max_message_bytes: usize,
}

impl From<&BridgeConfig> for MessagePolicy {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            include_location: config.include_location,
            max_message_bytes: config.max_message_bytes,
        }
    }
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl MessagePolicy {
    fn render(&self, error: &Error) -> CString {
        let mut text = if self.include_location {
            error.to_string()
        } else {
            error.kind().to_string()
        };
        if text.contains('\0') {
            text = text.replace('\0', " ");
        }
        if text.len() > self.max_message_bytes {
            let mut cut = self.max_message_bytes;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        CString::new(text).unwrap_or_default()
    }
}

/// The most recent captured failure
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    error: Error,
    message: CString,
}

impl ErrorRecord {
    /// The retained failure
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// The rendered message
    pub fn message(&self) -> &CStr {
        &self.message
    }
}

/// Error context holding at most one failure
#[derive(Debug, Clone, Default)]
pub struct ErrorState {
    record: Option<ErrorRecord>,
    policy: MessagePolicy,
}

impl ErrorState {
    /// Create an empty error state with the default message policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty error state with the given message policy
    pub fn with_policy(policy: MessagePolicy) -> Self {
        Self {
            record: None,
            policy,
        }
    }

    /// The message policy
    pub fn policy(&self) -> MessagePolicy {
        self.policy
    }

    /// Replace the message policy; affects failures captured from now on
    pub fn set_policy(&mut self, policy: MessagePolicy) {
        self.policy = policy;
    }

    /// Store a failure, replacing any previous one
    pub fn handle(&mut self, error: Error) -> Status {
        let message = self.policy.render(&error);
        self.record = Some(ErrorRecord { error, message });
        Status::Error
    }

    /// Clear the stored failure
    pub fn reset(&mut self) {
        self.record = None;
    }

    /// True exactly when a failure is stored
    pub fn has_exception(&self) -> bool {
        self.record.is_some()
    }

    /// Current message, or `"OK"` when nothing is stored
    ///
    /// The returned string stays valid until the next mutating call on this
    /// state.
    pub fn message(&self) -> &CStr {
        self.record
            .as_ref()
            .map_or(OK_C_MESSAGE, |record| record.message.as_c_str())
    }

    /// Current message as UTF-8
    pub fn message_str(&self) -> &str {
        self.message().to_str().unwrap_or(OK_MESSAGE)
    }

    /// The stored record, if any
    pub fn record(&self) -> Option<&ErrorRecord> {
        self.record.as_ref()
    }

    /// The stored failure, if any
    pub fn last_error(&self) -> Option<&Error> {
        self.record.as_ref().map(ErrorRecord::error)
    }

    /// Code of the stored failure
    pub fn code(&self) -> Option<ErrorCode> {
        self.last_error().map(Error::code)
    }

    /// Re-raise the stored failure in-process.
    ///
    /// Never crosses the C boundary. With nothing stored this fails with a
    /// `ProtocolMisuse` error instead.
    pub fn rethrow(&self) -> Result<Infallible> {
        match &self.record {
            Some(record) => Err(record.error.clone()),
            None => Err(crate::bridge_error!(BridgeError::ProtocolMisuse(
                "No exception is stored in the error state.".into()
            ))),
        }
    }
}

thread_local! {
    static CURRENT: RefCell<ErrorState> =
        RefCell::new(ErrorState::with_policy(MessagePolicy::from(&crate::config::current())));
}

/// Run `f` against the calling thread's error state
///
/// Returns `None` without calling `f` when the state has already been
/// destroyed during thread exit. Must not be re-entered from inside `f`.
pub fn with_current<R>(f: impl FnOnce(&mut ErrorState) -> R) -> Option<R> {
    CURRENT.try_with(|cell| f(&mut cell.borrow_mut())).ok()
}

/// Pointer to the calling thread's current message
///
/// Valid until the next failure or reset on this thread. Falls back to the
/// static `"OK"` once the state has been destroyed.
pub fn current_message_ptr() -> *const c_char {
    with_current(|state| state.message().as_ptr()).unwrap_or(OK_C_MESSAGE.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge_error;

    fn native(msg: &str) -> Error {
        bridge_error!(BridgeError::Native(msg.to_string()))
    }

    #[test]
    fn test_new_state_is_ok() {
        let state = ErrorState::new();
        assert!(!state.has_exception());
        assert_eq!(state.message_str(), OK_MESSAGE);
        assert!(state.code().is_none());
    }

    #[test]
    fn test_handle_and_reset_polarity() {
        let mut state = ErrorState::new();

        assert_eq!(state.handle(native("bad shape")), Status::Error);
        assert!(state.has_exception());
        assert!(state.message_str().contains("bad shape"));
        assert!(state.message_str().starts_with(file!()));

        state.reset();
        assert!(!state.has_exception());
        assert_eq!(state.message_str(), "OK");
    }

    #[test]
    fn test_new_failure_overwrites() {
        let mut state = ErrorState::new();
        state.handle(native("first"));
        state.handle(bridge_error!(BridgeError::NullArgument("dim")));

        assert!(!state.message_str().contains("first"));
        assert_eq!(state.code(), Some(ErrorCode::InvalidArgument));
    }

    #[test]
    fn test_rethrow() {
        let mut state = ErrorState::new();
        let err = state.rethrow().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProtocolMisuse);

        let original = native("kept");
        state.handle(original.clone());
        assert_eq!(state.rethrow().unwrap_err(), original);
        // rethrow does not consume the record
        assert!(state.has_exception());
    }

    #[test]
    fn test_policy_without_location() {
        let mut state = ErrorState::with_policy(MessagePolicy {
            include_location: false,
            max_message_bytes: 4096,
        });
        state.handle(native("plain"));
        assert_eq!(state.message_str(), "plain");
    }

    #[test]
    fn test_policy_truncates_on_char_boundary() {
        let mut state = ErrorState::with_policy(MessagePolicy {
            include_location: false,
            max_message_bytes: 16,
        });
        state.handle(native("ééééééééééé"));
        assert!(state.message().to_bytes().len() <= 16);
        assert!(state.message_str().starts_with('é'));
    }

    #[test]
    fn test_interior_nul_is_replaced() {
        let mut state = ErrorState::new();
        state.handle(native("a\0b"));
        assert!(state.message_str().ends_with("a b"));
    }

    #[test]
    fn test_thread_local_states_are_isolated() {
        with_current(|s| s.handle(native("main thread")));

        let other = std::thread::spawn(|| with_current(|s| s.has_exception()))
            .join()
            .unwrap();
        assert_eq!(other, Some(false));

        assert_eq!(with_current(|s| s.has_exception()), Some(true));
        with_current(ErrorState::reset);
    }

    #[test]
    fn test_current_message_ptr() {
        with_current(|s| s.handle(native("via pointer")));
        let text = unsafe { CStr::from_ptr(current_message_ptr()) };
        assert!(text.to_str().unwrap().contains("via pointer"));

        with_current(ErrorState::reset);
        let text = unsafe { CStr::from_ptr(current_message_ptr()) };
        assert_eq!(text.to_str().unwrap(), "OK");
    }
}

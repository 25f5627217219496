//! Exception translation boundary.
//!
//! Every exported function runs its body through [`translate`], the single
//! point where native failures become a status code. A returned [`Error`]
//! is recorded into the error state; a panic is caught and recorded as a
//! native failure located at the panic site. Nothing unwinds into the C
//! caller, and panics inside a boundary call are reported through `tracing`
//! instead of the default hook's stderr output.
//!
//! A successful call clears the error state, so `has_exception` is false
//! after any call that returned `Ok`.

use crate::error::{BridgeError, Error, Result, Status};
use crate::error_state::{self, ErrorState};
use crate::{bridge_error, config, metrics};
use once_cell::sync::Lazy;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use tracing::{error, warn};

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
    static PANIC_SITE: RefCell<Option<(String, u32)>> = const { RefCell::new(None) };
}

// Panics outside a boundary call keep going to the previous hook.
static PANIC_HOOK: Lazy<()> = Lazy::new(|| {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if DEPTH.try_with(Cell::get).unwrap_or(0) == 0 {
            previous(info);
            return;
        }
        if let Some(location) = info.location() {
            let site = (location.file().to_string(), location.line());
            let _ = PANIC_SITE.try_with(|slot| *slot.borrow_mut() = Some(site));
        }
    }));
});

/// Run a boundary operation against the calling thread's error state
///
/// If the thread's error state is already destroyed the status is still
/// returned, without a stored message.
pub fn translate<F>(operation: &'static str, f: F) -> Status
where
    F: FnOnce() -> Result<()>,
{
    match run(operation, f) {
        Ok(()) => {
            error_state::with_current(ErrorState::reset);
            Status::Ok
        }
        Err(e) => {
            report(operation, &e);
            error_state::with_current(|state| state.handle(e)).unwrap_or(Status::Error)
        }
    }
}

/// Run a boundary operation against an explicit error context
pub fn translate_with<F>(state: &mut ErrorState, operation: &'static str, f: F) -> Status
where
    F: FnOnce() -> Result<()>,
{
    match run(operation, f) {
        Ok(()) => {
            state.reset();
            Status::Ok
        }
        Err(e) => {
            report(operation, &e);
            state.handle(e)
        }
    }
}

fn run<F>(operation: &'static str, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    Lazy::force(&PANIC_HOOK);
    metrics::global().record_call();

    match contained(f) {
        Ok(result) => result,
        Err(payload) => {
            metrics::global().record_panic();
            let reason = panic_message(payload.as_ref());
            let site = PANIC_SITE
                .try_with(|slot| slot.borrow_mut().take())
                .ok()
                .flatten();
            let kind = BridgeError::Native(format!("panic in `{}`: {}", operation, reason));
            let err = match site {
                Some((file, line)) => Error::new(file, line, kind),
                None => bridge_error!(kind),
            };
            let _ = contained(|| {
                error!(
                    operation,
                    reason = %reason,
                    file = %err.file(),
                    line = err.line(),
                    "Panic caught at C boundary"
                )
            });
            Err(err)
        }
    }
}

fn report(operation: &'static str, e: &Error) {
    metrics::global().record_failure(e.code());
    if config::current().log_failures {
        // subscribers may touch thread-locals that are gone during thread exit
        let _ = contained(|| warn!(operation, code = %e.code(), "{}", e));
    }
}

/// Run `f` with panics caught and kept away from the previous hook
fn contained<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    let _ = PANIC_SITE.try_with(|slot| slot.borrow_mut().take());
    let _ = DEPTH.try_with(|depth| depth.set(depth.get() + 1));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    let _ = DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bail;
    use crate::error::ErrorCode;
    use std::cell::Cell;

    #[test]
    fn test_success_returns_ok() {
        let mut state = ErrorState::new();
        let status = translate_with(&mut state, "noop", || Ok(()));
        assert_eq!(status, Status::Ok);
        assert!(!state.has_exception());
        assert_eq!(state.message_str(), "OK");
    }

    #[test]
    fn test_failure_is_recorded() {
        let mut state = ErrorState::new();
        let status = translate_with(&mut state, "fails", || {
            bail!(BridgeError::Native("Cannot transpose".into()))
        });
        assert_eq!(status, Status::Error);
        assert!(state.has_exception());
        assert!(state.message_str().contains("Cannot transpose"));
    }

    #[test]
    fn test_success_clears_previous_failure() {
        let mut state = ErrorState::new();
        translate_with(&mut state, "fails", || bail!(BridgeError::Native("x".into())));
        assert!(state.has_exception());

        translate_with(&mut state, "noop", || Ok(()));
        assert!(!state.has_exception());
    }

    #[test]
    fn test_panic_does_not_escape() {
        let mut state = ErrorState::new();
        let status = translate_with(&mut state, "explodes", || panic!("index out of range"));
        assert_eq!(status, Status::Error);
        assert_eq!(state.code(), Some(ErrorCode::NativeOperation));
        assert!(state.message_str().contains("panic in `explodes`: index out of range"));
    }

    #[test]
    fn test_panic_is_located_at_panic_site() {
        let mut state = ErrorState::new();

        let panic_line = line!() + 2;
        translate_with(&mut state, "explodes", || {
            let sum = u32::MAX.checked_add(1).expect("dimension sum overflow");
            assert!(sum > 0);
            Ok(())
        });
        let err = state.last_error().unwrap();
        assert_eq!(err.file(), file!());
        assert_eq!(err.line(), panic_line);
        assert!(state.message_str().contains("dimension sum overflow"));
    }

    #[test]
    fn test_panic_site_does_not_leak_into_next_failure() {
        let mut state = ErrorState::new();
        translate_with(&mut state, "explodes", || panic!("first"));
        translate_with(&mut state, "fails", || bail!(BridgeError::Native("second".into())));

        assert!(state.message_str().contains("second"));
        assert!(PANIC_SITE.with(|slot| slot.borrow().is_none()));
        assert_eq!(DEPTH.with(Cell::get), 0);
    }

    #[test]
    fn test_null_argument_skips_native_logic() {
        let invoked = Cell::new(false);
        let ptr: *const u32 = std::ptr::null();
        let mut state = ErrorState::new();

        let status = translate_with(&mut state, "guarded", || {
            crate::check_not_null!(ptr);
            invoked.set(true);
            Ok(())
        });
        assert_eq!(status, Status::Error);
        assert_eq!(state.code(), Some(ErrorCode::InvalidArgument));
        assert!(!invoked.get());
    }

    #[test]
    fn test_translate_uses_thread_local_state() {
        let status = translate("fails", || bail!(BridgeError::Native("thread local".into())));
        assert_eq!(status, Status::Error);
        assert_eq!(
            error_state::with_current(|s| s.message_str().contains("thread local")),
            Some(true)
        );

        assert_eq!(translate("noop", || Ok(())), Status::Ok);
        assert_eq!(error_state::with_current(|s| s.has_exception()), Some(false));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}

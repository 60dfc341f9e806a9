//! Panic capture for the request logger.
//!
//! The hook records the backtrace of a panicking thread so the request
//! logger, which catches the unwind on that same thread, can attach it to
//! the resulting fault.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

use crate::faults::fault::Fault;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Install the backtrace-recording hook. The previous hook still runs.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

/// Take the backtrace recorded for the last panic on this thread.
pub fn take_panic_backtrace() -> Option<String> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

/// Turn a caught panic payload into an internal fault.
pub fn fault_from_panic(payload: Box<dyn Any + Send + 'static>) -> Fault {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };

    Fault::internal(format!("Handler panicked: {message}"))
        .with_error_type("panic")
        .with_backtrace(take_panic_backtrace())
}

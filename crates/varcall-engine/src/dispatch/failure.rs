//! Per-thread failure slot
//!
//! A generation failure cannot unwind through the trampoline frame, so the
//! worker parks the error here and the trampoline returns zeroed registers.
//! The caller that issued the dispatched call retrieves it on the same thread.

use std::cell::RefCell;

use crate::error::DispatchError;

thread_local! {
    static LAST_FAILURE: RefCell<Option<DispatchError>> = const { RefCell::new(None) };
}

pub(crate) fn record(error: DispatchError) {
    LAST_FAILURE.with(|slot| *slot.borrow_mut() = Some(error));
}

/// Take the error left by the most recent failed dispatch on this thread
pub fn take_last_failure() -> Option<DispatchError> {
    LAST_FAILURE.with(|slot| slot.borrow_mut().take())
}

/// Discard any pending failure on this thread
pub fn clear_last_failure() {
    LAST_FAILURE.with(|slot| *slot.borrow_mut() = None);
}

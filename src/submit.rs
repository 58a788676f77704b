use std::cell::RefCell;
use std::rc::Rc;

use gloo::timers::callback::Timeout;
use web_sys::HtmlButtonElement;

use crate::busy::BusyGuard;

struct PendingRestore {
    timeout: Timeout,
    guard: Rc<RefCell<Option<BusyGuard>>>,
}

impl PendingRestore {
    /// Stops the timer and hands back the guard if it has not fired yet.
    fn cancel(self) -> Option<BusyGuard> {
        let PendingRestore { timeout, guard } = self;
        timeout.cancel();
        let guard = guard.borrow_mut().take();
        guard
    }
}

/// Busy state for the native submit button. The browser may answer the
/// submission with a download instead of a navigation, so the button is
/// given back on a timer rather than on completion.
#[derive(Default)]
pub(crate) struct SubmitRestore {
    pending: RefCell<Option<PendingRestore>>,
}

impl SubmitRestore {
    /// Marks `button` busy and schedules its restore after `delay_ms`. A
    /// restore still pending from an earlier submit is superseded, keeping
    /// the label captured before the first submit.
    pub(crate) fn arm(&self, button: &HtmlButtonElement, label: &str, delay_ms: u32) {
        let previous = self.pending.borrow_mut().take();
        let guard = previous
            .and_then(PendingRestore::cancel)
            .unwrap_or_else(|| BusyGuard::engage(button, label));
        let slot = Rc::new(RefCell::new(Some(guard)));
        let fire = slot.clone();
        let timeout = Timeout::new(delay_ms, move || {
            let guard = fire.borrow_mut().take();
            drop(guard);
        });
        *self.pending.borrow_mut() = Some(PendingRestore {
            timeout,
            guard: slot,
        });
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(|pending| pending.guard.borrow().is_some())
    }
}

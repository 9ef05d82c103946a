//! Process-taint tracking
//!
//! A panic inside a running case is captured by the case runner and
//! becomes a failed result. A panic anywhere else in the worker marks
//! the process as tainted: the worker keeps reporting remaining tests
//! but must exit nonzero even if every reported test passed.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static TAINTED: AtomicBool = AtomicBool::new(false);
static HOOK: Once = Once::new();

thread_local! {
    static IN_CASE: Cell<bool> = const { Cell::new(false) };
}

/// Install the process-wide panic hook. Idempotent.
pub fn install_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if IN_CASE.with(Cell::get) {
                // Captured by the case runner; stays a per-case failure.
                return;
            }
            TAINTED.store(true, Ordering::SeqCst);
            tracing::error!("worker tainted by panic outside a test case");
            previous(info);
        }));
    });
}

pub fn is_tainted() -> bool {
    TAINTED.load(Ordering::SeqCst)
}

/// Marks the current thread as executing a test case for the lifetime
/// of the returned guard.
pub struct CaseScope(());

impl CaseScope {
    pub fn enter() -> Self {
        IN_CASE.with(|c| c.set(true));
        CaseScope(())
    }
}

impl Drop for CaseScope {
    fn drop(&mut self) {
        IN_CASE.with(|c| c.set(false));
    }
}

/// Clear the taint flag and serialize tests that depend on it; the flag
/// is process-global, so concurrent test threads would otherwise race.
#[cfg(test)]
pub fn reset_for_test() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let guard = LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    TAINTED.store(false, Ordering::SeqCst);
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_scope_toggles_thread_flag() {
        assert!(!IN_CASE.with(Cell::get));
        {
            let _scope = CaseScope::enter();
            assert!(IN_CASE.with(Cell::get));
        }
        assert!(!IN_CASE.with(Cell::get));
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

/// Rejects nested entry into an entrypoint while a call to it is still running.
///
/// Venues are external code; any of them may try to call back into the entrypoint that invoked it.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

/// Marks the guarded entrypoint as active until dropped.
#[must_use]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another `Entered` of this guard is alive.
    pub fn enter(&self) -> Option<Entered<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Entered { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard
            .entered
            .store(false, Ordering::Release);
    }
}

//! Per-endpoint mutual exclusion for poll cycles.

use std::collections::HashSet;

use parking_lot::Mutex;

/// Set of endpoint ids whose cycle is currently executing.
///
/// `try_acquire` is an atomic test-and-set: it succeeds only when the id is
/// absent. The returned [`GuardPermit`] removes the id when dropped, so the
/// slot is released on every exit path, unwinding included.
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    running: Mutex<HashSet<String>>,
}

impl ConcurrencyGuard {
    /// Create an empty guard set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `id`, or `None` if a cycle for `id` is in flight.
    #[must_use]
    pub fn try_acquire(&self, id: &str) -> Option<GuardPermit<'_>> {
        let mut running = self.running.lock();
        if running.insert(id.to_string()) {
            Some(GuardPermit {
                guard: self,
                id: id.to_string(),
            })
        } else {
            None
        }
    }

    /// Whether a cycle for `id` is in flight.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.running.lock().contains(id)
    }

    /// Number of cycles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.running.lock().len()
    }

    /// True when no cycle is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.running.lock().is_empty()
    }

    fn release(&self, id: &str) {
        self.running.lock().remove(id);
    }
}

/// Proof that the holder owns the slot for one endpoint id.
#[derive(Debug)]
pub struct GuardPermit<'a> {
    guard: &'a ConcurrencyGuard,
    id: String,
}

impl GuardPermit<'_> {
    /// Endpoint id this permit holds.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for GuardPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.id);
    }
}

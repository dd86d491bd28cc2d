//! Shared time source for debounce and click timing.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// A manually advanced clock handle.
///
/// The host sets the time from its event loop; tests advance it
/// explicitly, which makes every debounce window and double-click check
/// deterministic. Clones share the underlying time.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    time: Rc<Cell<Duration>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(now: Duration) -> Self {
        Self {
            time: Rc::new(Cell::new(now)),
        }
    }

    pub fn now(&self) -> Duration {
        self.time.get()
    }

    /// Sets the current time. Never moves backwards.
    pub fn set(&self, now: Duration) {
        if now > self.time.get() {
            self.time.set(now);
        }
    }

    pub fn advance(&self, by: Duration) {
        self.time.set(self.time.get() + by);
    }
}

impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.time, &other.time)
    }
}

impl Eq for Clock {}

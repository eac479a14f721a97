use chrono::{DateTime, Utc};

/// Host-driven trailing-edge debounce timer.
///
/// There is no background thread: the host reports activity with [`Debouncer::schedule`] and
/// polls with [`Debouncer::fire_if_due`] from its event loop.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: chrono::Duration,
    deadline: Option<DateTime<Utc>>,
}

impl Debouncer {
    pub fn new(delay: chrono::Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Starts the timer, or restarts it if already pending.
    pub fn schedule(&mut self, now: DateTime<Utc>) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns `true` once per schedule, the first time `now` reaches the deadline.
    pub fn fire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

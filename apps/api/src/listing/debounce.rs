use std::time::Duration;

use tokio::time::Instant;

/// Holds rapidly changing input and only exposes it once it has been quiet
/// for `delay`. Until then the previously settled value is returned.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    pending: T,
    settled: T,
    changed_at: Option<Instant>,
    delay: Duration,
}

impl<T: Clone + Default> Debounced<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: T::default(),
            settled: T::default(),
            changed_at: None,
            delay,
        }
    }
}

impl<T: Clone> Debounced<T> {
    pub fn set(&mut self, value: T, now: Instant) {
        if self.is_settled(now) {
            self.settled = std::mem::replace(&mut self.pending, value);
        } else {
            self.pending = value;
        }
        self.changed_at = Some(now);
    }

    /// Settles the pending value immediately.
    pub fn flush(&mut self) {
        self.settled = self.pending.clone();
        self.changed_at = None;
    }

    /// The latest input, settled or not.
    pub fn raw(&self) -> &T {
        &self.pending
    }

    pub fn get(&self, now: Instant) -> &T {
        if self.is_settled(now) {
            &self.pending
        } else {
            &self.settled
        }
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.changed_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.delay)
    }
}

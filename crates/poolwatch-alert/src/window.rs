use poolwatch_common::types::is_server_error;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of the most recent upstream statuses.
///
/// The `5xx` count is maintained incrementally on every push/evict, so
/// [`RollingWindow::error_rate`] does not rescan the buffer.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    data: VecDeque<u16>,
    errors: usize,
}

impl RollingWindow {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity),
            errors: 0,
        }
    }

    /// Appends `status`, evicting and returning the oldest entry when full.
    pub fn push(&mut self, status: u16) -> Option<u16> {
        let evicted = if self.data.len() >= self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        if evicted.is_some_and(is_server_error) {
            self.errors -= 1;
        }

        self.data.push_back(status);
        if is_server_error(status) {
            self.errors += 1;
        }
        evicted
    }

    /// Percentage of `5xx` entries, `0.0` when empty.
    pub fn error_rate(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.errors as f64 * 100.0 / self.data.len() as f64
    }

    /// Same as [`error_rate`](Self::error_rate) but recounted from the buffer.
    pub fn scan_error_rate(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let errors = self.data.iter().filter(|s| is_server_error(**s)).count();
        errors as f64 * 100.0 / self.data.len() as f64
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.data.iter().copied()
    }
}

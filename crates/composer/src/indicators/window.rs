use std::collections::VecDeque;

/// Fixed-capacity FIFO window. Pushing into a full window evicts the oldest value.
#[derive(Debug, Clone)]
pub struct BoundedWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl BoundedWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = f64> + ExactSizeIterator + '_ {
        self.values.iter().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn min(&self) -> Option<f64> {
        self.iter().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }
}

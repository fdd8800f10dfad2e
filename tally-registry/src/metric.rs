use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_common::metrics::Metric;

/// Integer sum, starting at zero.
#[derive(Debug)]
pub struct Counter {
    name: String,
    value: AtomicI64,
}

impl Counter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicI64::new(0),
        }
    }

    pub fn inc(&self) {
        self.increment(1);
    }

    /// Adds `delta`, which may be negative.
    pub fn increment(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Metric for Counter {
    fn with_name(name: String) -> Self {
        Self::new(name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        self.get().to_string()
    }

    fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct AverageState {
    sum: f64,
    count: u64,
}

/// Running mean of the samples added since the last reset.
///
/// Sum and count share one lock so a reader never sees a sample counted
/// without its value (or the reverse).
#[derive(Debug)]
pub struct Average {
    name: String,
    state: Mutex<AverageState>,
}

impl Average {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(AverageState::default()),
        }
    }

    pub fn add(&self, value: f64) {
        let mut state = self.lock();
        state.sum += value;
        state.count += 1;
    }

    /// Mean of the current samples, `0.0` when there are none.
    pub fn mean(&self) -> f64 {
        let state = self.lock();
        if state.count == 0 {
            0.0
        } else {
            state.sum / state.count as f64
        }
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    // The state is two plain numbers, so a panic elsewhere cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, AverageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Metric for Average {
    fn with_name(name: String) -> Self {
        Self::new(name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        format!("{:.2}", self.mean())
    }

    fn reset(&self) {
        *self.lock() = AverageState::default();
    }
}

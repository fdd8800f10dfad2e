//! In-process metrics registry with a periodic background flush.
//!
//! Producers update [`Counter`] and [`Average`] handles from any thread; the
//! [`MetricsRegistry`] renders every registered metric into one line per
//! period, hands it to a [`RecordSink`](tally_storage::RecordSink) and resets
//! the metrics for the next interval.

pub mod metric;
pub mod registry;
pub mod scheduler;

pub use metric::{Average, Counter};
pub use registry::MetricsRegistry;
pub use scheduler::SchedulerState;
pub use tally_common::metrics::Metric;

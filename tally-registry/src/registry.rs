use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use tally_common::config::TallyConfig;
use tally_common::error::{Result, TallyError};
use tally_common::metrics::Metric;
use tally_common::types::SnapshotRecord;
use tally_storage::{FileSink, RecordSink};
use tracing::{debug, warn};

use crate::metric::{Average, Counter};
use crate::scheduler::{FlushScheduler, SchedulerState};

/// State shared between the registry handle and the flush thread.
pub(crate) struct RegistryCore {
    metrics: Mutex<Vec<Arc<dyn Metric>>>,
    sink: Arc<dyn RecordSink>,
}

impl RegistryCore {
    pub(crate) fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            metrics: Mutex::new(Vec::new()),
            sink,
        }
    }

    // Pushes and flush cycles never leave the list half-updated.
    fn lock_metrics(&self) -> MutexGuard<'_, Vec<Arc<dyn Metric>>> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Renders every metric, appends the record, then resets every metric.
    ///
    /// The list lock is held for the whole cycle, which is what serialises
    /// manual and scheduled flushes and keeps `register` out of the iteration.
    /// Producers only touch per-metric state and are never blocked here. An
    /// update landing between a metric's render and its reset is lost.
    ///
    /// Metrics are reset even if the sink fails: that interval is dropped.
    pub(crate) fn flush_cycle(&self) -> Result<()> {
        let metrics = self.lock_metrics();

        let mut record = SnapshotRecord::new(Local::now());
        for metric in metrics.iter() {
            record.push(metric.name(), metric.render());
        }

        let written = self.sink.append(&record);

        for metric in metrics.iter() {
            metric.reset();
        }

        match &written {
            Ok(()) => debug!(metrics = metrics.len(), "flush cycle complete"),
            Err(err) => warn!(
                error = %err,
                metrics = metrics.len(),
                "sink rejected record, interval dropped"
            ),
        }
        written
    }
}

/// Ordered set of metrics that is flushed to a sink once per period.
///
/// Dropping the registry stops the background flush and waits for it to
/// exit; no cycle runs after that.
pub struct MetricsRegistry {
    scheduler: FlushScheduler,
    core: Arc<RegistryCore>,
}

impl MetricsRegistry {
    pub fn new(sink: Arc<dyn RecordSink>, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(TallyError::Config(
                "flush period must be greater than zero".into(),
            ));
        }

        let core = Arc::new(RegistryCore::new(sink));
        let scheduler = FlushScheduler::spawn(Arc::clone(&core), period)?;
        Ok(Self { scheduler, core })
    }

    /// Registry appending to the configured file.
    pub fn from_config(config: &TallyConfig) -> Result<Self> {
        config.validate()?;
        let sink = FileSink::open(&config.sink_path)?;
        Self::new(Arc::new(sink), config.flush_period())
    }

    /// Creates a metric of type `M` and adds it after all existing ones.
    ///
    /// Names are not checked for uniqueness; duplicates are flushed as
    /// separate fields.
    pub fn register<M: Metric>(&self, name: impl Into<String>) -> Arc<M> {
        self.register_metric(M::with_name(name.into()))
    }

    /// Adds an already constructed metric.
    pub fn register_metric<M: Metric>(&self, metric: M) -> Arc<M> {
        let metric = Arc::new(metric);
        let shared: Arc<dyn Metric> = metric.clone();
        self.core.lock_metrics().push(shared);
        metric
    }

    pub fn counter(&self, name: impl Into<String>) -> Arc<Counter> {
        self.register(name)
    }

    pub fn average(&self, name: impl Into<String>) -> Arc<Average> {
        self.register(name)
    }

    pub fn len(&self) -> usize {
        self.core.lock_metrics().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs one flush cycle on the calling thread.
    ///
    /// Returns once the sink has accepted (or rejected) the record and all
    /// metrics are reset. Never overlaps with a scheduled cycle.
    pub fn flush_now(&self) -> Result<()> {
        self.core.flush_cycle()
    }

    /// Asks the background loop for a cycle without waiting for the period.
    pub fn trigger_flush(&self) {
        self.scheduler.trigger();
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Stops the background flush and waits for it. Equivalent to dropping.
    pub fn shutdown(mut self) {
        self.scheduler.stop();
    }
}

impl Drop for MetricsRegistry {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}

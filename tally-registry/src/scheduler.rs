use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tally_common::error::{Result, TallyError};
use tokio::sync::{watch, Notify};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::registry::RegistryCore;

/// Where the background flush loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick, a trigger or the stop signal.
    Idle,
    /// Running one flush cycle; always runs to completion.
    Flushing,
    /// Terminal.
    Stopped,
}

impl SchedulerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Flushing,
            _ => SchedulerState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SchedulerState::Idle => 0,
            SchedulerState::Flushing => 1,
            SchedulerState::Stopped => 2,
        }
    }
}

/// Owns the thread that flushes the registry once per period.
///
/// The loop runs on its own current-thread tokio runtime so that the period
/// timer, explicit triggers and the stop signal can all be awaited together.
pub(crate) struct FlushScheduler {
    shutdown: watch::Sender<bool>,
    trigger: Arc<Notify>,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    pub(crate) fn spawn(core: Arc<RegistryCore>, period: Duration) -> Result<Self> {
        let first_tick = Instant::now().checked_add(period).ok_or_else(|| {
            TallyError::Config(format!("flush period {period:?} is out of range"))
        })?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());
        let state = Arc::new(AtomicU8::new(SchedulerState::Idle.as_u8()));

        let worker = Worker {
            core,
            first_tick,
            period,
            shutdown: shutdown_rx,
            trigger: Arc::clone(&trigger),
            state: Arc::clone(&state),
        };

        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::io::Result<()>>(1);
        let handle = thread::Builder::new()
            .name("tally-flush".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        worker.set_state(SchedulerState::Stopped);
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                runtime.block_on(worker.run());
            })
            .map_err(|e| TallyError::Scheduler(format!("failed to spawn flush thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(TallyError::Scheduler(format!(
                    "failed to build flush runtime: {err}"
                )));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(TallyError::Scheduler(
                    "flush thread exited during startup".into(),
                ));
            }
        }

        info!(period_ms = period.as_millis() as u64, "flush scheduler started");
        Ok(Self {
            shutdown,
            trigger,
            state,
            handle: Some(handle),
        })
    }

    /// Wakes the loop for one extra cycle. Remembered if the loop is busy.
    pub(crate) fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub(crate) fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Signals the loop and blocks until its thread has exited. A cycle that
    /// is already running finishes first. Idempotent.
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.shutdown.send_replace(true);
        if handle.join().is_err() {
            error!("flush scheduler thread panicked");
        }
        self.state
            .store(SchedulerState::Stopped.as_u8(), Ordering::Release);
        info!("flush scheduler stopped");
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    core: Arc<RegistryCore>,
    first_tick: Instant,
    period: Duration,
    shutdown: watch::Receiver<bool>,
    trigger: Arc<Notify>,
    state: Arc<AtomicU8>,
}

impl Worker {
    async fn run(mut self) {
        let mut ticker = interval_at(self.first_tick, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.stopping() {
                break;
            }

            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
                _ = self.trigger.notified() => {}
            }

            if self.stopping() {
                break;
            }

            self.set_state(SchedulerState::Flushing);
            match panic::catch_unwind(AssertUnwindSafe(|| self.core.flush_cycle())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    debug!(error = %err, "scheduled flush failed, next period will retry")
                }
                Err(_) => error!("scheduled flush panicked, next period will retry"),
            }
            self.set_state(SchedulerState::Idle);
        }

        self.set_state(SchedulerState::Stopped);
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

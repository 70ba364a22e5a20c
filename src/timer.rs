//! Gravity timer
//!
//! The controller decides when the gravity timer runs and at what interval;
//! a [`Timer`] only provides the mechanism.

use crate::session::Input;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// A repeating timer
pub trait Timer: Send {
    /// Start ticking every `interval`, replacing any running schedule
    fn start(&mut self, interval: Duration);
    fn cancel(&mut self);
    /// Interval of the running schedule, `None` when stopped
    fn interval(&self) -> Option<Duration>;
    /// Whether a tick stamped with `generation` belongs to the running schedule
    fn is_current(&self, _generation: u64) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct ManualState {
    interval: Option<Duration>,
    starts: u32,
    cancels: u32,
}

/// A timer that never fires on its own: callers drive ticks by hand.
/// Clones share state so a test can watch what the controller asked for.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock().interval.is_some()
    }

    /// How many times the timer was (re)started
    pub fn starts(&self) -> u32 {
        self.lock().starts
    }

    pub fn cancels(&self) -> u32 {
        self.lock().cancels
    }
}

impl Timer for ManualTimer {
    fn start(&mut self, interval: Duration) {
        let mut state = self.lock();
        state.interval = Some(interval);
        state.starts += 1;
    }

    fn cancel(&mut self) {
        let mut state = self.lock();
        state.interval = None;
        state.cancels += 1;
    }

    fn interval(&self) -> Option<Duration> {
        self.lock().interval
    }
}

/// Timer backed by a tokio task posting ticks into the session channel.
///
/// Every start or cancel bumps the generation, so ticks queued by a
/// schedule that has since been replaced are recognised and dropped.
pub struct TokioTimer {
    handle: Handle,
    tx: UnboundedSender<Input>,
    generation: u64,
    interval: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(handle: Handle, tx: UnboundedSender<Input>) -> Self {
        Self {
            handle,
            tx,
            generation: 0,
            interval: None,
            task: None,
        }
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }
}

impl Timer for TokioTimer {
    fn start(&mut self, interval: Duration) {
        self.stop_task();
        self.interval = Some(interval);
        let generation = self.generation;
        let tx = self.tx.clone();
        debug!(?interval, generation, "gravity timer started");

        self.task = Some(self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Input::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if self.interval.take().is_some() {
            debug!(generation = self.generation, "gravity timer cancelled");
        }
        self.stop_task();
    }

    fn interval(&self) -> Option<Duration> {
        self.interval
    }

    fn is_current(&self, generation: u64) -> bool {
        self.interval.is_some() && generation == self.generation
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

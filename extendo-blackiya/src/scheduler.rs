use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub type TimerTask = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alarm {
    pub name: String,
}

/// Host scheduling primitives: named recurring alarms plus one-shot delayed
/// callbacks that can be cancelled before they fire.
pub trait SyncScheduler: Send + Sync {
    /// Creating an alarm with an existing name replaces it.
    fn create_alarm(&self, name: &str, period_minutes: u32);
    fn set_timer(&self, delay: Duration, task: TimerTask) -> TimerId;
    fn clear_timer(&self, id: TimerId);
}

type TimerMap = Arc<Mutex<HashMap<TimerId, JoinHandle<()>>>>;

/// Scheduler backed by the tokio runtime. Alarm ticks are delivered on the
/// channel returned from [`TokioScheduler::new`].
pub struct TokioScheduler {
    next_id: AtomicU64,
    timers: TimerMap,
    alarms: Mutex<HashMap<String, JoinHandle<()>>>,
    alarm_tx: mpsc::UnboundedSender<Alarm>,
    minute: Duration,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alarm>) {
        Self::with_minute(Duration::from_secs(60))
    }

    /// Scales alarm periods; tests use a short "minute".
    pub fn with_minute(minute: Duration) -> (Self, mpsc::UnboundedReceiver<Alarm>) {
        let (alarm_tx, alarm_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_id: AtomicU64::new(1),
            timers: Arc::default(),
            alarms: Mutex::new(HashMap::new()),
            alarm_tx,
            minute,
        };
        (scheduler, alarm_rx)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SyncScheduler for TokioScheduler {
    fn create_alarm(&self, name: &str, period_minutes: u32) {
        let period = self.minute * period_minutes.max(1);
        let alarm_tx = self.alarm_tx.clone();
        let alarm_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let alarm = Alarm {
                    name: alarm_name.clone(),
                };
                if alarm_tx.send(alarm).is_err() {
                    break;
                }
            }
        });

        let previous = self
            .alarms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(alarm = name, period_minutes, "alarm created");
    }

    fn set_timer(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timers = self.timers.clone();
        // Hold the map lock while spawning so the task cannot remove its entry
        // before it has been inserted.
        let mut guard = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            task.await;
        });
        guard.insert(id, handle);
        id
    }

    fn clear_timer(&self, id: TimerId) {
        let handle = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        let timers = std::mem::take(&mut *self.timers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in timers.into_values() {
            handle.abort();
        }
        let alarms = std::mem::take(&mut *self.alarms.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in alarms.into_values() {
            handle.abort();
        }
    }
}

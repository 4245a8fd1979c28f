//! Tokio-backed timer driver
//!
//! The state machine never owns a clock. A negotiation context that runs
//! inside a tokio runtime can back `activate_timer`/`cancel_timer` with this
//! scheduler and feed the resulting [`TimerExpired`] notifications back as
//! `TimerFired` events.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::TimerId;

/// Notification sent when an armed timer expires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerExpired<K> {
    pub key: K,
    pub timer: TimerId,
}

/// One pending timer per key; arming again replaces the pending one.
pub struct TimerScheduler<K>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
{
    runtime: Handle,
    pending: Mutex<HashMap<K, JoinHandle<()>>>,
    tx: mpsc::UnboundedSender<TimerExpired<K>>,
}

impl<K> TimerScheduler<K>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
{
    /// Create a scheduler on the given runtime, returning the expiry receiver
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<TimerExpired<K>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            runtime,
            pending: Mutex::new(HashMap::new()),
            tx,
        };
        (scheduler, rx)
    }

    /// Create a scheduler on the runtime of the calling task
    pub fn from_current() -> Option<(Self, mpsc::UnboundedReceiver<TimerExpired<K>>)> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Arm `timer` for `key`. Returns false if the receiver side is gone.
    pub fn arm(&self, key: K, timer: TimerId, interval: Duration) -> bool {
        if self.tx.is_closed() {
            warn!(key=?key, timer=%timer, "Timer receiver closed, cannot arm");
            return false;
        }

        let tx = self.tx.clone();
        let task_key = key.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            debug!(key=?task_key, timer=%timer, "Timer fired");
            let _ = tx.send(TimerExpired { key: task_key, timer });
        });

        if let Some(previous) = self.pending.lock().insert(key.clone(), handle) {
            previous.abort();
        }
        trace!(key=?key, timer=%timer, interval=?interval, "Armed timer");
        true
    }

    /// Cancel the pending timer for `key`, if any
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.lock().remove(key) {
            Some(handle) => {
                handle.abort();
                trace!(key=?key, "Cancelled timer");
                true
            }
            None => false,
        }
    }

    /// Number of keys with a timer that has been armed and not cancelled
    pub fn pending_count(&self) -> usize {
        self.pending.lock().values().filter(|h| !h.is_finished()).count()
    }
}

impl<K> Drop for TimerScheduler<K>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
{
    fn drop(&mut self) {
        for (_, handle) in self.pending.lock().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timer_fires_once() {
        let (scheduler, mut rx) = TimerScheduler::<u32>::from_current().unwrap();
        assert!(scheduler.arm(7, TimerId::T1, Duration::from_millis(5)));

        let expired = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timer should fire")
            .unwrap();
        assert_eq!(expired, TimerExpired { key: 7, timer: TimerId::T1 });
    }

    #[tokio::test]
    async fn test_rearm_replaces_pending_timer() {
        let (scheduler, mut rx) = TimerScheduler::<&'static str>::from_current().unwrap();
        scheduler.arm("audio", TimerId::T1, Duration::from_millis(500));
        scheduler.arm("audio", TimerId::T2, Duration::from_millis(5));

        let expired = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(expired.timer, TimerId::T2);

        // The replaced T1 task was aborted
        let nothing = tokio::time::timeout(Duration::from_millis(700), rx.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_cancel() {
        let (scheduler, mut rx) = TimerScheduler::<u8>::from_current().unwrap();
        scheduler.arm(1, TimerId::T2, Duration::from_millis(20));
        assert!(scheduler.cancel(&1));
        assert!(!scheduler.cancel(&1));

        let nothing = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(nothing.is_err());
    }
}

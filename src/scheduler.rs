//! Single-slot delayed actions
//!
//! A [`PendingTimer`] holds at most one outstanding action. Scheduling a new
//! one aborts whatever was pending, so only the latest request counts.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct PendingTimer {
    name: &'static str,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl PendingTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
        }
    }

    /// Cancels the pending action (if any) and schedules `action` after `delay`.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
            tracing::debug!("Timer {} rescheduled in {:?}", self.name, delay);
        } else {
            tracing::debug!("Timer {} scheduled in {:?}", self.name, delay);
        }
    }

    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }

    /// True while an action is scheduled and has not finished yet.
    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PendingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_schedule_fires() {
        let timer = PendingTimer::new("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=5 {
            let fired = fired.clone();
            let last = last.clone();
            timer.schedule(Duration::from_millis(100), async move {
                fired.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(50)).await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_action() {
        let timer = PendingTimer::new("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();

        timer.schedule(Duration::from_millis(100), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_pending());
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}

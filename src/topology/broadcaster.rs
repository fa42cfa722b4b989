use super::types::TopologyChange;
use crate::scheduler::PendingTimer;
use std::future::Future;
use std::time::Duration;

/// Cluster-wide debounce for topology announcements.
#[derive(Debug)]
pub struct TopologyBroadcaster {
    timer: PendingTimer,
    scale_out_delay: Duration,
    scale_back_delay: Duration,
}

impl TopologyBroadcaster {
    pub fn new(scale_out_delay: Duration, scale_back_delay: Duration) -> Self {
        Self {
            timer: PendingTimer::new("topology-broadcast"),
            scale_out_delay,
            scale_back_delay,
        }
    }

    pub fn delay_for(&self, change: TopologyChange) -> Duration {
        match change {
            TopologyChange::BrokerJoined => self.scale_out_delay,
            TopologyChange::BrokerLeft => self.scale_back_delay,
        }
    }

    /// Replaces any pending announcement with `announce`.
    ///
    /// `announce` must compute the snapshot when it runs, not when it is
    /// scheduled, so the broadcast reflects the final state.
    pub fn schedule<F>(&self, change: TopologyChange, announce: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.timer.schedule(self.delay_for(change), announce);
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }
}

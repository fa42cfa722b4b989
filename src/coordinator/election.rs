use super::server::{NEW_LEADER_EVENT, StateServer};
use super::types::LeaderCommit;
use crate::delivery::InstanceSocket;
use crate::registry::ConnectionId;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;

impl StateServer {
    /// Starts an election in the background if none is running.
    pub fn trigger_election(self: &Arc<Self>) {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            server.run_election().await;
        });
    }

    /// Draws random joined masters until one acknowledges `newLeader`.
    ///
    /// The pool is re-read on every draw, so masters joining or leaving
    /// mid-election are taken into account. Returns the committed leader,
    /// or `None` if the pool ran dry, a leader already existed, or another
    /// loop was running.
    pub async fn run_election(&self) -> Option<ConnectionId> {
        if !self.state.lock().await.begin_election() {
            tracing::debug!("Election already running");
            return None;
        }

        let mut attempt: u32 = 0;
        loop {
            let candidate = {
                let mut state = self.state.lock().await;
                let pool: Vec<Arc<dyn InstanceSocket>> = state
                    .election_candidates()
                    .iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.socket.clone()))
                    .filter(|socket| socket.is_open())
                    .collect();

                if pool.is_empty() {
                    state.end_election();
                    if attempt > 0 {
                        tracing::info!("Election stopped, no candidates left");
                    }
                    return None;
                }
                let index = rand::thread_rng().gen_range(0..pool.len());
                pool[index].clone()
            };

            attempt += 1;
            tracing::info!("Searching a new leader (attempt {})", attempt);
            self.transmit_count.fetch_add(1, Ordering::Relaxed);

            if let Err(e) = candidate.emit(NEW_LEADER_EVENT, json!({})).await {
                tracing::warn!("Candidate {} did not accept leadership: {}", candidate.id(), e);
                tokio::task::yield_now().await;
                continue;
            }

            let mut state = self.state.lock().await;
            match state.commit_leader(candidate.id()) {
                LeaderCommit::Committed => {
                    state.end_election();
                    tracing::info!(
                        "New leader selected: {} on socket {}",
                        state.master_instance_id(candidate.id()).unwrap_or_default(),
                        candidate.id()
                    );
                    return Some(candidate.id().clone());
                }
                LeaderCommit::AlreadyLed => {
                    state.end_election();
                    tracing::warn!(
                        "Candidate {} on socket {} accepted leadership, but {} reclaimed it first",
                        state.master_instance_id(candidate.id()).unwrap_or_default(),
                        candidate.id(),
                        state
                            .leader()
                            .and_then(|id| state.master_instance_id(id))
                            .unwrap_or_default()
                    );
                    return None;
                }
                LeaderCommit::CandidateGone => {
                    tracing::warn!("Candidate {} left before it was committed", candidate.id());
                }
            }
        }
    }
}

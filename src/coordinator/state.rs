use super::types::{
    ClusterSettings, Disconnect, LeaderCommit, MasterLeave, ReconnectAnswer, RegisterAnswer,
};
use crate::config::ServerConfig;
use crate::error::{Result, StateError};
use crate::license::violates_license_terms;
use crate::reconnect::{ReconnectWindow, WindowMode};
use crate::registry::{ConnectionId, InstanceRecord, InstanceRegistry, MasterPhase};
use crate::topology::BrokerClusterState;
use serde_json::Value;
use std::time::Duration;

/// Everything the server knows about the cluster.
///
/// Every method is one uninterrupted transition: no I/O, no awaits. The
/// caller passes the wall clock in so tests can pin it. Side effects that
/// need I/O (broadcasts, elections, timers) are returned as outcomes.
#[derive(Debug)]
pub struct ClusterState {
    registry: InstanceRegistry,
    settings: Option<ClusterSettings>,
    shared_data: Value,
    reconnect_token: Option<String>,
    leader: Option<ConnectionId>,
    window: ReconnectWindow,
    warm_up_required: bool,
    warmed_up: bool,
    election_running: bool,
    wait_reconnect_duration: Duration,
}

impl ClusterState {
    pub fn new(config: &ServerConfig, now: u64) -> Self {
        let warm_up_required = config.warm_up_enabled();
        Self {
            registry: InstanceRegistry::new(),
            settings: None,
            shared_data: Value::Null,
            reconnect_token: None,
            leader: None,
            window: ReconnectWindow::at_boot(now, config.start_reconnect_duration, warm_up_required),
            warm_up_required,
            warmed_up: !warm_up_required,
            election_running: false,
            wait_reconnect_duration: config.wait_reconnect_duration,
        }
    }

    // ========== Brokers & Workers ==========

    pub fn broker_join(&mut self, record: InstanceRecord) {
        self.registry.add_broker(record);
    }

    /// Returns `true` if a broker was registered on this connection.
    pub fn broker_leave(&mut self, id: &ConnectionId) -> bool {
        self.registry.remove_broker(id).is_some()
    }

    /// Admits a worker and hands it the current broker snapshot.
    pub fn worker_join(&mut self, record: InstanceRecord, now: u64) -> Result<BrokerClusterState> {
        if !self.workers_ready() {
            return Err(StateError::NotReady);
        }
        if let Some(license) = &record.license {
            let mut pool = self.registry.attached_licenses(&record.connection_id);
            pool.push(license);
            if violates_license_terms(pool) {
                return Err(StateError::LicenseTermViolation);
            }
        }
        self.registry.add_worker(record);
        Ok(self.broker_snapshot(now))
    }

    pub fn worker_leave(&mut self, id: &ConnectionId) -> bool {
        self.registry.remove_worker(id).is_some()
    }

    /// Workers may join once the warm-up elapsed and the boot window closed.
    pub fn workers_ready(&self) -> bool {
        !self.warm_up_required || (self.warmed_up && !self.window.is_start())
    }

    pub fn mark_warmed_up(&mut self) {
        self.warmed_up = true;
    }

    pub fn broker_snapshot(&self, now: u64) -> BrokerClusterState {
        BrokerClusterState::from_brokers(self.registry.brokers(), now)
    }

    pub fn worker_ids(&self) -> Vec<ConnectionId> {
        self.registry.worker_ids()
    }

    // ========== Masters ==========

    pub fn register_master(
        &mut self,
        record: InstanceRecord,
        settings: ClusterSettings,
        shared_data: Value,
        now: u64,
    ) -> Result<RegisterAnswer> {
        // A connection registers once; a second attempt must not replace it.
        if self.registry.is_master_registered(&record.connection_id) {
            return Ok(RegisterAnswer::InstanceIdAlreadyReg);
        }

        if self.window.is_active() {
            return Ok(RegisterAnswer::ReconnectMode {
                try_in: self.window.remaining_ms(now),
                mode: self.window.mode(),
            });
        }

        if self.registry.is_master_instance_id_taken(&record.instance_id) {
            return Ok(RegisterAnswer::InstanceIdAlreadyReg);
        }

        if let Some(license) = &record.license {
            let mut pool = self.registry.attached_licenses(&record.connection_id);
            pool.push(license);
            if violates_license_terms(pool) {
                return Err(StateError::LicenseTermViolation);
            }
        }

        if self.registry.registered_master_count() == 0 {
            let token = uuid::Uuid::new_v4().to_string();
            tracing::info!(
                "First master {} registered, settings '{}' saved",
                record.instance_id,
                settings
            );
            self.settings = Some(settings);
            self.shared_data = shared_data;
            self.reconnect_token = Some(token.clone());
            self.registry.add_master(record, MasterPhase::Registered);
            return Ok(RegisterAnswer::First {
                reconnect_token: token,
            });
        }

        if self.settings == Some(settings) {
            self.registry.add_master(record, MasterPhase::Registered);
            Ok(RegisterAnswer::Ok {
                reconnect_token: self.reconnect_token.clone().unwrap_or_default(),
                shared_data: self.shared_data.clone(),
            })
        } else {
            tracing::info!(
                "Master {} declared settings '{}' that differ from the cluster's",
                record.instance_id,
                settings
            );
            Ok(RegisterAnswer::NotSameSettings)
        }
    }

    /// Re-admits a master from a previous session straight into the joined set.
    pub fn reconnect_master(
        &mut self,
        record: InstanceRecord,
        token: &str,
        settings: ClusterSettings,
        shared_data: Value,
        was_leader: bool,
    ) -> ReconnectAnswer {
        if self.registry.is_master_joined(&record.connection_id) {
            return ReconnectAnswer::AlreadyJoined;
        }
        if self.reconnect_token.as_deref() != Some(token) {
            return ReconnectAnswer::WrongReconnectToken;
        }

        if self.registry.registered_master_count() == 0 {
            self.settings = Some(settings);
            self.shared_data = shared_data;
        }

        if was_leader {
            if self.leader.is_some() {
                return ReconnectAnswer::RemoveLeadership;
            }
            tracing::info!("Former leader {} reclaimed leadership", record.instance_id);
            self.leader = Some(record.connection_id.clone());
        }
        self.registry.add_master(record, MasterPhase::Joined);
        ReconnectAnswer::Ok
    }

    pub fn join_master(&mut self, id: &ConnectionId) -> Result<()> {
        if self.registry.join_master(id) {
            Ok(())
        } else {
            Err(StateError::MasterNotRegistered)
        }
    }

    pub fn leave_master(&mut self, id: &ConnectionId, now: u64) -> MasterLeave {
        if self.registry.remove_master(id).is_none() {
            return MasterLeave::default();
        }

        let was_leader = self.leader.as_ref() == Some(id);
        if was_leader {
            self.leader = None;
        }

        let cluster_emptied = self.registry.registered_master_count() == 0;
        if cluster_emptied {
            self.settings = None;
            self.shared_data = Value::Null;
            self.window.enter_wait(now, self.wait_reconnect_duration);
        }

        MasterLeave {
            removed: true,
            was_leader,
            cluster_emptied,
        }
    }

    /// Clears the connection from every registry.
    pub fn disconnect(&mut self, id: &ConnectionId, now: u64) -> Disconnect {
        Disconnect {
            broker_removed: self.broker_leave(id),
            worker_removed: self.worker_leave(id),
            master: self.leave_master(id, now),
        }
    }

    pub fn is_master_joined(&self, id: &ConnectionId) -> bool {
        self.registry.is_master_joined(id)
    }

    pub fn master_instance_id(&self, id: &ConnectionId) -> Option<&str> {
        self.registry
            .master(id)
            .map(|m| m.instance.instance_id.as_str())
    }

    // ========== Election ==========

    /// Claims the single election slot. `false` if a loop is already running.
    pub fn begin_election(&mut self) -> bool {
        if self.election_running {
            return false;
        }
        self.election_running = true;
        true
    }

    pub fn end_election(&mut self) {
        self.election_running = false;
    }

    /// Joined masters eligible for leadership; empty while a leader is held.
    pub fn election_candidates(&self) -> Vec<ConnectionId> {
        if self.leader.is_some() {
            return Vec::new();
        }
        self.registry.joined_master_ids()
    }

    pub fn commit_leader(&mut self, candidate: &ConnectionId) -> LeaderCommit {
        if self.leader.is_some() {
            return LeaderCommit::AlreadyLed;
        }
        if !self.registry.is_master_joined(candidate) {
            return LeaderCommit::CandidateGone;
        }
        self.leader = Some(candidate.clone());
        LeaderCommit::Committed
    }

    pub fn leader(&self) -> Option<&ConnectionId> {
        self.leader.as_ref()
    }

    // ========== Reconnect window ==========

    pub fn window(&self) -> &ReconnectWindow {
        &self.window
    }

    pub fn expire_window(&mut self, expected: WindowMode) -> bool {
        self.window.expire(expected)
    }

    // ========== Read-only views ==========

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> Option<ClusterSettings> {
        self.settings
    }

    pub fn shared_data(&self) -> &Value {
        &self.shared_data
    }

    pub fn reconnect_token(&self) -> Option<&str> {
        self.reconnect_token.as_deref()
    }
}

use super::state::ClusterState;
use super::types::{
    BrokerJoinRequest, Connection, MasterLeave, MasterReconnectRequest, MasterRegisterRequest,
    ReconnectAnswer, RegisterAnswer, WorkerJoinRequest, now_ms,
};
use crate::config::ServerConfig;
use crate::delivery::{InstanceSocket, broadcast};
use crate::error::{Result, StateError};
use crate::handshake::{Compatibility, resolve_instance_ip};
use crate::license::License;
use crate::reconnect::WindowMode;
use crate::registry::{ConnectionId, InstanceRecord};
use crate::scheduler::PendingTimer;
use crate::topology::{BrokerClusterState, TopologyBroadcaster, TopologyChange};
use dashmap::DashMap;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Window over which `invokeMessageCount` and `transmitMessageCount` are counted.
const COUNTER_PERIOD: Duration = Duration::from_secs(1);

/// Sent to the drawn candidate during an election.
pub const NEW_LEADER_EVENT: &str = "newLeader";

/// Owns the cluster state, the live sockets and every timer.
///
/// Handlers take the state lock only for the duration of one
/// [`ClusterState`] transition and release it before any I/O.
pub struct StateServer {
    id: String,
    config: ServerConfig,
    compatibility: Compatibility,
    pub(super) state: Mutex<ClusterState>,
    pub(super) connections: DashMap<ConnectionId, Connection>,
    topology: TopologyBroadcaster,
    window_timer: PendingTimer,
    warm_up_timer: PendingTimer,
    launched_at: AtomicU64,
    /// Counted during the current second.
    invoke_count: AtomicU64,
    pub(super) transmit_count: AtomicU64,
    /// Totals of the last completed second, as reported by `state`.
    invoke_rate: AtomicU64,
    transmit_rate: AtomicU64,
}

impl StateServer {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let state = ClusterState::new(&config, now_ms());
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            compatibility: Compatibility::current(),
            state: Mutex::new(state),
            connections: DashMap::new(),
            topology: TopologyBroadcaster::new(config.scale_out_delay, config.scale_back_delay),
            window_timer: PendingTimer::new("reconnect-window"),
            warm_up_timer: PendingTimer::new("worker-warm-up"),
            launched_at: AtomicU64::new(0),
            invoke_count: AtomicU64::new(0),
            transmit_count: AtomicU64::new(0),
            invoke_rate: AtomicU64::new(0),
            transmit_rate: AtomicU64::new(0),
            config,
        })
    }

    /// Arms the boot timers (start window, worker warm-up) and the
    /// per-second message counters.
    pub fn start(self: &Arc<Self>) {
        self.launched_at.store(now_ms(), Ordering::SeqCst);
        self.spawn_counter_reset();

        if !self.config.warm_up_enabled() {
            info!("Startup delay disabled, workers may join immediately");
            return;
        }

        if !self.config.start_reconnect_duration.is_zero() {
            info!(
                "Start reconnect window active for {:?}",
                self.config.start_reconnect_duration
            );
            let weak = Arc::downgrade(self);
            self.window_timer
                .schedule(self.config.start_reconnect_duration, async move {
                    if let Some(server) = weak.upgrade()
                        && server.state.lock().await.expire_window(WindowMode::Start)
                    {
                        info!("Start reconnect window closed");
                    }
                });
        }

        let weak = Arc::downgrade(self);
        self.warm_up_timer
            .schedule(self.config.startup_delay(), async move {
                if let Some(server) = weak.upgrade() {
                    server.state.lock().await.mark_warmed_up();
                    info!("Warm-up finished, workers may join");
                }
            });
    }

    fn spawn_counter_reset(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + COUNTER_PERIOD;
            let mut interval = tokio::time::interval_at(start, COUNTER_PERIOD);
            loop {
                interval.tick().await;
                let Some(server) = weak.upgrade() else {
                    break;
                };
                server.roll_counters();
            }
        });
    }

    /// Moves the current second's counts into the reported rates.
    fn roll_counters(&self) {
        let invoked = self.invoke_count.swap(0, Ordering::Relaxed);
        let transmitted = self.transmit_count.swap(0, Ordering::Relaxed);
        self.invoke_rate.store(invoked, Ordering::Relaxed);
        self.transmit_rate.store(transmitted, Ordering::Relaxed);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn compatibility(&self) -> &Compatibility {
        &self.compatibility
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn record_invoke(&self) {
        self.invoke_count.fetch_add(1, Ordering::Relaxed);
    }

    // ========== Connection lifecycle ==========

    pub fn attach(&self, connection: Connection) {
        let id = connection.socket.id().clone();
        tracing::debug!(
            "Socket {} connected from {} as {:?}",
            id,
            connection.meta.remote_ip,
            connection.meta.instance_type
        );
        self.connections.insert(id, connection);
    }

    /// Runs the leave logic for every role the connection held.
    pub async fn detach(self: &Arc<Self>, id: &ConnectionId) {
        self.connections.remove(id);

        let outcome = self.state.lock().await.disconnect(id, now_ms());
        tracing::debug!("Socket {} disconnected: {:?}", id, outcome);

        if outcome.broker_removed {
            info!("Broker on socket {} left the cluster", id);
            self.schedule_topology(TopologyChange::BrokerLeft);
        }
        if outcome.worker_removed {
            info!("Worker on socket {} left the cluster", id);
        }
        self.after_master_leave(id, outcome.master);
    }

    // ========== Brokers ==========

    pub async fn broker_join(self: &Arc<Self>, id: &ConnectionId, req: BrokerJoinRequest) -> Result<()> {
        let record = self.instance_record(
            id,
            req.instance_id,
            req.instance_ip.as_deref(),
            req.instance_ip_family.as_deref(),
            req.secure,
            None,
        )?;
        info!(
            "Broker {} at {} joined the cluster on socket {}",
            record.instance_id,
            record.uri(),
            id
        );

        self.state.lock().await.broker_join(record);
        self.schedule_topology(TopologyChange::BrokerJoined);
        Ok(())
    }

    pub async fn broker_leave(self: &Arc<Self>, id: &ConnectionId) {
        if self.state.lock().await.broker_leave(id) {
            info!("Broker on socket {} left the cluster", id);
            self.schedule_topology(TopologyChange::BrokerLeft);
        }
    }

    // ========== Workers ==========

    pub async fn worker_join(
        &self,
        id: &ConnectionId,
        req: WorkerJoinRequest,
    ) -> Result<BrokerClusterState> {
        let record = self.instance_record(
            id,
            req.instance_id,
            req.instance_ip.as_deref(),
            req.instance_ip_family.as_deref(),
            false,
            req.license,
        )?;
        let instance_id = record.instance_id.clone();
        let ip = record.ip.clone();

        match self.state.lock().await.worker_join(record, now_ms()) {
            Ok(snapshot) => {
                info!("Worker {} at {} joined the cluster on socket {}", instance_id, ip, id);
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!("Worker {} at {} refused: {}", instance_id, ip, e);
                Err(e)
            }
        }
    }

    pub async fn worker_leave(&self, id: &ConnectionId) {
        if self.state.lock().await.worker_leave(id) {
            info!("Worker on socket {} left the cluster", id);
        }
    }

    // ========== Masters ==========

    pub async fn master_register(
        &self,
        id: &ConnectionId,
        req: MasterRegisterRequest,
    ) -> Result<RegisterAnswer> {
        let record = self.instance_record(
            id,
            req.instance_id,
            req.instance_ip.as_deref(),
            req.instance_ip_family.as_deref(),
            false,
            req.license,
        )?;
        let instance_id = record.instance_id.clone();

        let answer = self
            .state
            .lock()
            .await
            .register_master(record, req.settings, req.shared_data, now_ms());

        match &answer {
            Ok(RegisterAnswer::ReconnectMode { try_in, mode }) => info!(
                "Master {} deferred, {} reconnect window ends in {}ms",
                instance_id, mode, try_in
            ),
            Ok(RegisterAnswer::InstanceIdAlreadyReg) => {
                tracing::warn!("Master instance id {} is already registered", instance_id)
            }
            Ok(RegisterAnswer::NotSameSettings) => {}
            Ok(_) => info!("Master {} registered on socket {}", instance_id, id),
            Err(e) => tracing::warn!("Master {} refused: {}", instance_id, e),
        }
        answer
    }

    pub async fn master_reconnect(
        self: &Arc<Self>,
        id: &ConnectionId,
        req: MasterReconnectRequest,
    ) -> Result<ReconnectAnswer> {
        let record = self.instance_record(
            id,
            req.instance_id,
            req.instance_ip.as_deref(),
            req.instance_ip_family.as_deref(),
            false,
            None,
        )?;
        let instance_id = record.instance_id.clone();

        let (answer, elect) = {
            let mut state = self.state.lock().await;
            let answer = state.reconnect_master(
                record,
                &req.reconnect_token,
                req.settings,
                req.shared_data,
                req.was_leader,
            );
            // Wait expiry runs its own election; the start window does not.
            let elect = answer == ReconnectAnswer::Ok
                && state.leader() != Some(id)
                && state.window().mode() != WindowMode::Wait;
            (answer, elect)
        };

        match answer {
            ReconnectAnswer::Ok => info!("Master {} reconnected on socket {}", instance_id, id),
            ReconnectAnswer::RemoveLeadership => info!(
                "Master {} was leader but leadership is already taken",
                instance_id
            ),
            ReconnectAnswer::WrongReconnectToken => {
                tracing::warn!("Master {} presented a stale reconnect token", instance_id)
            }
            ReconnectAnswer::AlreadyJoined => {}
        }

        if elect {
            self.trigger_election();
        }
        Ok(answer)
    }

    pub async fn master_join(self: &Arc<Self>, id: &ConnectionId) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if let Err(e) = state.join_master(id) {
                tracing::warn!("Socket {} tried to join before registering", id);
                return Err(e);
            }
            info!(
                "Master {} joined the cluster on socket {}",
                state.master_instance_id(id).unwrap_or_default(),
                id
            );
        }
        self.trigger_election();
        Ok(())
    }

    pub async fn master_leave(self: &Arc<Self>, id: &ConnectionId) {
        let outcome = self.state.lock().await.leave_master(id, now_ms());
        self.after_master_leave(id, outcome);
    }

    fn after_master_leave(self: &Arc<Self>, id: &ConnectionId, outcome: MasterLeave) {
        if !outcome.removed {
            return;
        }
        info!("Master on socket {} left the cluster", id);

        if outcome.was_leader {
            info!("Leader left, electing a new one");
            self.trigger_election();
        }

        if outcome.cluster_emptied {
            info!(
                "All masters are down, settings and shared data were reset. Wait reconnect window active for {:?}",
                self.config.wait_reconnect_duration
            );
            let weak = Arc::downgrade(self);
            self.window_timer
                .schedule(self.config.wait_reconnect_duration, async move {
                    Self::close_wait_window(weak).await;
                });
        }
    }

    async fn close_wait_window(weak: Weak<Self>) {
        let Some(server) = weak.upgrade() else {
            return;
        };
        if server.state.lock().await.expire_window(WindowMode::Wait) {
            info!("Wait reconnect window closed");
            server.trigger_election();
        }
    }

    // ========== Topology ==========

    fn schedule_topology(self: &Arc<Self>, change: TopologyChange) {
        let weak = Arc::downgrade(self);
        self.topology.schedule(change, async move {
            if let Some(server) = weak.upgrade() {
                server.announce_topology(change).await;
            }
        });
    }

    /// Sends the current broker snapshot to every joined worker.
    pub async fn announce_topology(&self, change: TopologyChange) {
        let (snapshot, worker_ids) = {
            let state = self.state.lock().await;
            (state.broker_snapshot(now_ms()), state.worker_ids())
        };

        let payload = match serde_json::to_value(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode broker snapshot: {}", e);
                return;
            }
        };

        let targets: Vec<Arc<dyn InstanceSocket>> = worker_ids
            .iter()
            .filter_map(|id| self.connections.get(id).map(|c| c.socket.clone()))
            .collect();

        info!(
            "Announcing {} brokers to {} workers after {}",
            snapshot.broker_uris.len(),
            targets.len(),
            change.event()
        );
        self.transmit_count
            .fetch_add(targets.len() as u64, Ordering::Relaxed);
        broadcast(targets, change.event(), payload, self.config.retry_delay);
    }

    pub fn topology_pending(&self) -> bool {
        self.topology.is_pending()
    }

    // ========== Diagnostics ==========

    pub async fn server_state(&self, dynamic_only: bool) -> Value {
        let state = self.state.lock().await;
        let registry = state.registry();
        let leader = state
            .leader()
            .and_then(|id| state.master_instance_id(id))
            .map(str::to_string);

        let mut info = json!({
            "id": self.id,
            "clientCount": self.connections.len(),
            "brokerCount": registry.broker_count(),
            "workerCount": registry.worker_count(),
            "registeredMasterCount": registry.registered_master_count(),
            "joinedMasterCount": registry.joined_master_count(),
            "leader": leader,
            "reconnectMode": state.window().mode(),
            "invokeMessageCount": self.invoke_rate.load(Ordering::Relaxed),
            "transmitMessageCount": self.transmit_rate.load(Ordering::Relaxed),
        });

        if !dynamic_only && let Value::Object(map) = &mut info {
            map.insert("type".into(), json!(2));
            map.insert("port".into(), json!(self.config.port));
            map.insert("path".into(), json!(self.config.path));
            map.insert("tls".into(), json!(false));
            map.insert("serverVersion".into(), json!(self.compatibility.server_version));
            map.insert(
                "launchedTimestamp".into(),
                json!(self.launched_at.load(Ordering::SeqCst)),
            );
        }
        info
    }

    // ========== Helpers ==========

    fn instance_record(
        &self,
        id: &ConnectionId,
        instance_id: String,
        payload_ip: Option<&str>,
        payload_family: Option<&str>,
        secure: bool,
        license: Option<License>,
    ) -> Result<InstanceRecord> {
        let connection = self.connections.get(id).ok_or(StateError::SocketClosed)?;
        let meta = &connection.meta;
        let (ip, ip_family) = resolve_instance_ip(
            payload_ip,
            payload_family,
            meta.forwarded_for.as_deref(),
            meta.remote_ip,
        );

        Ok(InstanceRecord {
            connection_id: id.clone(),
            instance_id,
            ip,
            ip_family,
            port: meta.instance_port,
            secure,
            license,
        })
    }
}

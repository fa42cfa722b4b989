//! In-memory sockets for tests.

use super::socket::InstanceSocket;
use crate::error::{Result, StateError};
use crate::registry::ConnectionId;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Socket whose acknowledgments are scripted up front.
///
/// Every emit is recorded. Scripted answers are consumed in order; once the
/// script is empty every emit is acknowledged with `null`.
pub struct ScriptedSocket {
    id: ConnectionId,
    open: AtomicBool,
    script: Mutex<VecDeque<Result<Value>>>,
    emitted: Mutex<Vec<(String, Value)>>,
    close_after_emits: Mutex<Option<usize>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedSocket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            open: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            emitted: Mutex::new(Vec::new()),
            close_after_emits: Mutex::new(None),
            gate: Mutex::new(None),
        })
    }

    /// Queues `count` failed acknowledgments.
    pub fn fail_next(&self, count: usize) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..count {
            script.push_back(Err(StateError::Remote {
                name: "Declined".into(),
                message: "scripted failure".into(),
            }));
        }
    }

    /// Fails every emit from now on.
    pub fn fail_always(&self) {
        self.fail_next(10_000);
    }

    pub fn close_after(&self, emits: usize) {
        *self.close_after_emits.lock().unwrap() = Some(emits);
    }

    /// Holds every later acknowledgment until the returned handle is notified.
    pub fn hold_acks(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn emitted_events(&self, event: &str) -> Vec<Value> {
        self.emitted()
            .into_iter()
            .filter(|(e, _)| e == event)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl InstanceSocket for ScriptedSocket {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<Value> {
        if !self.is_open() {
            return Err(StateError::SocketClosed);
        }
        let count = {
            let mut emitted = self.emitted.lock().unwrap();
            emitted.push((event.to_string(), payload));
            emitted.len()
        };
        if let Some(limit) = *self.close_after_emits.lock().unwrap()
            && count >= limit
        {
            self.close();
        }
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

use super::types::{ConnectionId, InstanceRecord, MasterPhase, MasterRecord};
use crate::license::License;
use std::collections::{HashMap, HashSet};

/// Connection-keyed mappings for every instance role.
///
/// Iteration order is unspecified; callers only use whole-set views
/// (broadcast targets, election candidates, license pool).
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    brokers: HashMap<ConnectionId, InstanceRecord>,
    workers: HashMap<ConnectionId, InstanceRecord>,
    masters: HashMap<ConnectionId, MasterRecord>,
    master_instance_ids: HashSet<String>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // --- brokers ---

    /// Inserts or replaces the broker on this connection.
    pub fn add_broker(&mut self, record: InstanceRecord) {
        self.brokers.insert(record.connection_id.clone(), record);
    }

    pub fn remove_broker(&mut self, id: &ConnectionId) -> Option<InstanceRecord> {
        self.brokers.remove(id)
    }

    pub fn brokers(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.brokers.values()
    }

    pub fn broker_count(&self) -> usize {
        self.brokers.len()
    }

    // --- workers ---

    pub fn add_worker(&mut self, record: InstanceRecord) {
        self.workers.insert(record.connection_id.clone(), record);
    }

    pub fn remove_worker(&mut self, id: &ConnectionId) -> Option<InstanceRecord> {
        self.workers.remove(id)
    }

    pub fn worker_ids(&self) -> Vec<ConnectionId> {
        self.workers.keys().cloned().collect()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    // --- masters ---

    /// Adds the master in the given phase and reserves its instance id.
    ///
    /// Replacing the record of a connection releases the old instance id and
    /// never demotes a joined master back to registered.
    pub fn add_master(&mut self, instance: InstanceRecord, mut phase: MasterPhase) {
        if let Some(previous) = self.remove_master(&instance.connection_id)
            && previous.phase == MasterPhase::Joined
        {
            phase = MasterPhase::Joined;
        }
        self.master_instance_ids.insert(instance.instance_id.clone());
        self.masters
            .insert(instance.connection_id.clone(), MasterRecord { instance, phase });
    }

    /// Promotes a registered master. Returns `false` if it never registered.
    pub fn join_master(&mut self, id: &ConnectionId) -> bool {
        match self.masters.get_mut(id) {
            Some(master) => {
                master.phase = MasterPhase::Joined;
                true
            }
            None => false,
        }
    }

    /// Removes the master from the registered and joined views at once.
    pub fn remove_master(&mut self, id: &ConnectionId) -> Option<MasterRecord> {
        let removed = self.masters.remove(id)?;
        let still_used = self
            .masters
            .values()
            .any(|m| m.instance.instance_id == removed.instance.instance_id);
        if !still_used {
            self.master_instance_ids
                .remove(&removed.instance.instance_id);
        }
        Some(removed)
    }

    pub fn master(&self, id: &ConnectionId) -> Option<&MasterRecord> {
        self.masters.get(id)
    }

    pub fn is_master_registered(&self, id: &ConnectionId) -> bool {
        self.masters.contains_key(id)
    }

    pub fn is_master_joined(&self, id: &ConnectionId) -> bool {
        self.masters
            .get(id)
            .is_some_and(|m| m.phase == MasterPhase::Joined)
    }

    pub fn is_master_instance_id_taken(&self, instance_id: &str) -> bool {
        self.master_instance_ids.contains(instance_id)
    }

    pub fn registered_master_count(&self) -> usize {
        self.masters.len()
    }

    pub fn joined_master_ids(&self) -> Vec<ConnectionId> {
        self.masters
            .iter()
            .filter(|(_, m)| m.phase == MasterPhase::Joined)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn joined_master_count(&self) -> usize {
        self.masters
            .values()
            .filter(|m| m.phase == MasterPhase::Joined)
            .count()
    }

    // --- cross-role ---

    /// Licenses attached to joined workers and registered masters, leaving
    /// out the given connection so a re-join does not count itself twice.
    pub fn attached_licenses(&self, exclude: &ConnectionId) -> Vec<&License> {
        self.workers
            .iter()
            .filter(|(id, _)| *id != exclude)
            .filter_map(|(_, w)| w.license.as_ref())
            .chain(
                self.masters
                    .iter()
                    .filter(|(id, _)| *id != exclude)
                    .filter_map(|(_, m)| m.instance.license.as_ref()),
            )
            .collect()
    }
}

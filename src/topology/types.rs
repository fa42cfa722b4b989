use crate::registry::InstanceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Snapshot sent to workers on join and with every topology event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerClusterState {
    #[serde(rename = "brokerURIs")]
    pub broker_uris: Vec<String>,
    /// Generation time (ms since epoch).
    pub time: u64,
}

impl BrokerClusterState {
    /// Deduplicates by URI; brokers sharing an address count once.
    pub fn from_brokers<'a, I>(brokers: I, time: u64) -> Self
    where
        I: IntoIterator<Item = &'a InstanceRecord>,
    {
        let uris: BTreeSet<String> = brokers.into_iter().map(|b| b.uri()).collect();
        Self {
            broker_uris: uris.into_iter().collect(),
            time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyChange {
    BrokerJoined,
    BrokerLeft,
}

impl TopologyChange {
    /// Event name used when announcing this change to workers.
    pub fn event(&self) -> &'static str {
        match self {
            TopologyChange::BrokerJoined => "brokerJoin",
            TopologyChange::BrokerLeft => "brokerLeave",
        }
    }
}

//! Topology Module Tests
//!
//! ## Test Scopes
//! - **Snapshot**: deduplication, scheme and IPv6 handling, wire field names.
//! - **Debounce**: rapid changes collapse into the last one, delay per change kind.

#[cfg(test)]
mod tests {
    use crate::registry::{ConnectionId, InstanceRecord, IpFamily};
    use crate::topology::{BrokerClusterState, TopologyBroadcaster, TopologyChange};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn broker(ip: &str, port: u16, secure: bool) -> InstanceRecord {
        InstanceRecord {
            connection_id: ConnectionId::new(),
            instance_id: format!("broker-{}", port),
            ip: ip.to_string(),
            ip_family: IpFamily::infer(ip),
            port: Some(port),
            secure,
            license: None,
        }
    }

    // ============================================================
    // SNAPSHOT TESTS
    // ============================================================

    #[test]
    fn test_snapshot_deduplicates_uris() {
        let brokers = vec![
            broker("10.0.0.1", 8888, false),
            broker("10.0.0.1", 8888, false),
            broker("10.0.0.2", 8888, true),
            broker("::1", 8888, false),
        ];

        let state = BrokerClusterState::from_brokers(&brokers, 42);

        assert_eq!(
            state.broker_uris,
            vec![
                "ws://10.0.0.1:8888".to_string(),
                "ws://[::1]:8888".to_string(),
                "wss://10.0.0.2:8888".to_string(),
            ]
        );
        assert_eq!(state.time, 42);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let state = BrokerClusterState::from_brokers(&[broker("10.0.0.1", 1, false)], 7);
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["brokerURIs"][0], "ws://10.0.0.1:1");
        assert_eq!(json["time"], 7);
    }

    #[test]
    fn test_empty_snapshot() {
        let state = BrokerClusterState::from_brokers(std::iter::empty::<&InstanceRecord>(), 1);

        assert!(state.broker_uris.is_empty());
    }

    // ============================================================
    // DEBOUNCE TESTS
    // ============================================================

    #[test]
    fn test_change_event_names() {
        assert_eq!(TopologyChange::BrokerJoined.event(), "brokerJoin");
        assert_eq!(TopologyChange::BrokerLeft.event(), "brokerLeave");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_collapse_into_last() {
        // ARRANGE
        let broadcaster =
            TopologyBroadcaster::new(Duration::from_millis(5000), Duration::from_millis(1000));
        let fired = Arc::new(AtomicUsize::new(0));
        let last_kind = Arc::new(AtomicUsize::new(0));

        // ACT: join, join, leave within the window
        for (i, change) in [
            TopologyChange::BrokerJoined,
            TopologyChange::BrokerJoined,
            TopologyChange::BrokerLeft,
        ]
        .into_iter()
        .enumerate()
        {
            let fired = fired.clone();
            let last_kind = last_kind.clone();
            broadcaster.schedule(change, async move {
                fired.fetch_add(1, Ordering::SeqCst);
                last_kind.store(i, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // ASSERT: leave delay (1000ms) applies to the final event only
        tokio::time::sleep(Duration::from_millis(950)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(last_kind.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_waits_scale_out_delay() {
        let broadcaster =
            TopologyBroadcaster::new(Duration::from_millis(5000), Duration::from_millis(1000));
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();

        broadcaster.schedule(TopologyChange::BrokerJoined, async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(broadcaster.is_pending());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

//! Registry Module Tests
//!
//! ## Test Scopes
//! - **Records**: URI rendering for brokers (scheme, IPv6 bracketing).
//! - **Brokers / Workers**: idempotent insert per connection, removal.
//! - **Masters**: register -> join phase transition, instance id bookkeeping.

#[cfg(test)]
mod tests {
    use crate::license::{License, LicenseType};
    use crate::registry::{ConnectionId, InstanceRecord, InstanceRegistry, IpFamily, MasterPhase};

    fn record(instance_id: &str, ip: &str, port: u16) -> InstanceRecord {
        InstanceRecord {
            connection_id: ConnectionId::new(),
            instance_id: instance_id.to_string(),
            ip: ip.to_string(),
            ip_family: IpFamily::infer(ip),
            port: Some(port),
            secure: false,
            license: None,
        }
    }

    // ============================================================
    // RECORD TESTS
    // ============================================================

    #[test]
    fn test_connection_id_is_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_uri_for_plain_ipv4_broker() {
        let broker = record("b1", "10.0.0.5", 8888);

        assert_eq!(broker.uri(), "ws://10.0.0.5:8888");
    }

    #[test]
    fn test_uri_for_secure_ipv6_broker_is_bracketed() {
        let mut broker = record("b1", "fe80::1", 443);
        broker.secure = true;

        assert_eq!(broker.ip_family, IpFamily::IPv6);
        assert_eq!(broker.uri(), "wss://[fe80::1]:443");
    }

    #[test]
    fn test_ip_family_inference() {
        assert_eq!(IpFamily::infer("127.0.0.1"), IpFamily::IPv4);
        assert_eq!(IpFamily::infer("::ffff:10.0.0.1"), IpFamily::IPv6);
        assert_eq!(IpFamily::infer("broker.internal"), IpFamily::IPv4);
    }

    // ============================================================
    // BROKER / WORKER TESTS
    // ============================================================

    #[test]
    fn test_broker_insert_is_idempotent_per_connection() {
        let mut registry = InstanceRegistry::new();
        let mut broker = record("b1", "10.0.0.1", 8888);

        registry.add_broker(broker.clone());
        broker.port = Some(9999);
        registry.add_broker(broker.clone());

        assert_eq!(registry.broker_count(), 1);
        assert_eq!(registry.brokers().next().unwrap().port, Some(9999));
    }

    #[test]
    fn test_worker_removal() {
        let mut registry = InstanceRegistry::new();
        let worker = record("w1", "10.0.0.2", 3000);
        let id = worker.connection_id.clone();

        registry.add_worker(worker);
        assert_eq!(registry.worker_ids(), vec![id.clone()]);

        assert!(registry.remove_worker(&id).is_some());
        assert!(registry.remove_worker(&id).is_none());
        assert_eq!(registry.worker_count(), 0);
    }

    // ============================================================
    // MASTER TESTS
    // ============================================================

    #[test]
    fn test_master_join_requires_registration() {
        let mut registry = InstanceRegistry::new();

        assert!(!registry.join_master(&ConnectionId::new()));
    }

    #[test]
    fn test_master_register_then_join() {
        let mut registry = InstanceRegistry::new();
        let master = record("m1", "10.0.0.3", 3000);
        let id = master.connection_id.clone();

        registry.add_master(master, MasterPhase::Registered);
        assert!(registry.is_master_registered(&id));
        assert!(!registry.is_master_joined(&id));
        assert!(registry.joined_master_ids().is_empty());

        assert!(registry.join_master(&id));
        assert!(registry.is_master_joined(&id));
        assert_eq!(registry.joined_master_count(), 1);
        assert_eq!(registry.registered_master_count(), 1);
    }

    #[test]
    fn test_master_removal_clears_both_views_and_instance_id() {
        let mut registry = InstanceRegistry::new();
        let master = record("m1", "10.0.0.3", 3000);
        let id = master.connection_id.clone();

        registry.add_master(master, MasterPhase::Joined);
        assert!(registry.is_master_instance_id_taken("m1"));

        registry.remove_master(&id);

        assert!(!registry.is_master_registered(&id));
        assert_eq!(registry.joined_master_count(), 0);
        assert!(!registry.is_master_instance_id_taken("m1"));
    }

    #[test]
    fn test_replacing_master_record_releases_old_id_and_keeps_joined() {
        // ARRANGE
        let mut registry = InstanceRegistry::new();
        let master = record("m1", "10.0.0.3", 3000);
        let id = master.connection_id.clone();
        registry.add_master(master.clone(), MasterPhase::Joined);

        // ACT: same connection, new instance id, lower phase
        let mut renamed = master;
        renamed.instance_id = "m1b".to_string();
        registry.add_master(renamed, MasterPhase::Registered);

        // ASSERT
        assert!(registry.is_master_joined(&id));
        assert_eq!(registry.registered_master_count(), 1);
        assert!(!registry.is_master_instance_id_taken("m1"));
        assert!(registry.is_master_instance_id_taken("m1b"));
    }

    #[test]
    fn test_attached_licenses_cover_workers_and_masters() {
        let mut registry = InstanceRegistry::new();
        let mut worker = record("w1", "10.0.0.2", 3000);
        worker.license = Some(License::new("A", LicenseType::Cluster, 3));
        let mut master = record("m1", "10.0.0.3", 3000);
        master.license = Some(License::new("A", LicenseType::Cluster, 3));

        let worker_id = worker.connection_id.clone();

        registry.add_worker(worker);
        registry.add_worker(record("w2", "10.0.0.4", 3000));
        registry.add_master(master, MasterPhase::Registered);

        assert_eq!(registry.attached_licenses(&ConnectionId::new()).len(), 2);
        assert_eq!(registry.attached_licenses(&worker_id).len(), 1);
    }
}

use crate::registry::IpFamily;
use std::net::IpAddr;

/// Picks the address an instance is reachable at.
///
/// Payload address first, then the first hop of the forwarded-for header,
/// then the socket peer. The family is taken from the payload only when the
/// payload also carried the address.
pub fn resolve_instance_ip(
    payload_ip: Option<&str>,
    payload_family: Option<&str>,
    forwarded_for: Option<&str>,
    remote: IpAddr,
) -> (String, IpFamily) {
    if let Some(ip) = payload_ip.filter(|ip| !ip.is_empty()) {
        let family = match payload_family {
            Some("IPv4") => IpFamily::IPv4,
            Some("IPv6") => IpFamily::IPv6,
            _ => IpFamily::infer(ip),
        };
        return (ip.to_string(), family);
    }

    if let Some(first) = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return (first.to_string(), IpFamily::infer(first));
    }

    let family = match remote {
        IpAddr::V4(_) => IpFamily::IPv4,
        IpAddr::V6(_) => IpFamily::IPv6,
    };
    (remote.to_string(), family)
}

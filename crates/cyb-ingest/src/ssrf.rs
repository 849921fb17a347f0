//! SSRF defense for the fetch stage (spec §4.9, §8 property 8): hosts are
//! checked against a literal block set and a suffix block set before a
//! connection is attempted, and in production the resolved address is
//! additionally checked against the private IP ranges.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use url::Url;

use crate::error::{IngestError, IngestResult};

/// Literal hostnames that are never fetchable, regardless of environment.
const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1", "169.254.169.254"];

/// Hostname suffixes that are never fetchable.
const BLOCKED_SUFFIXES: &[&str] = &[".local", ".internal", ".localhost"];

/// Whether the runtime enforces the private-range resolution check (spec:
/// "In production the resolved ... must not fall within private ranges").
/// Non-production environments (local development, CI fixtures that
/// intentionally hit loopback addresses) skip the DNS resolution check but
/// still enforce the literal and suffix block sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

/// Validate a URL is an allowed http(s) fetch target, and in production
/// resolve its host to confirm it doesn't land in a private range.
///
/// # Errors
///
/// Returns [`IngestError::InvalidUrl`] if the scheme isn't http(s) or the
/// URL doesn't parse, [`IngestError::BlockedHost`] if the literal host,
/// suffix, or resolved address is disallowed.
pub fn guard_url(raw: &str, env: Environment) -> IngestResult<Url> {
    let url = Url::parse(raw).map_err(|e| IngestError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(IngestError::InvalidUrl(format!("unsupported scheme {}", url.scheme())));
    }

    let host = url
        .host_str()
        .ok_or_else(|| IngestError::InvalidUrl("URL has no host".to_string()))?
        .to_ascii_lowercase();

    if BLOCKED_HOSTS.contains(&host.as_str()) {
        return Err(IngestError::BlockedHost { host });
    }
    if BLOCKED_SUFFIXES.iter().any(|suffix| host.ends_with(suffix)) {
        return Err(IngestError::BlockedHost { host });
    }

    if env == Environment::Production {
        guard_resolution(&url, &host)?;
    }

    Ok(url)
}

fn guard_resolution(url: &Url, host: &str) -> IngestResult<()> {
    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|_| IngestError::BlockedHost { host: host.to_string() })?;

    let mut resolved_any = false;
    for addr in addrs {
        resolved_any = true;
        if is_private(addr.ip()) {
            return Err(IngestError::BlockedHost { host: host.to_string() });
        }
    }

    if !resolved_any {
        return Err(IngestError::BlockedHost { host: host.to_string() });
    }
    Ok(())
}

/// RFC1918, loopback, link-local (v4 and v6), IPv4-mapped-private, and
/// ULA fc00::/7 ranges.
#[must_use]
pub fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    match a {
        10 => true,
        127 => true,
        169 if b == 254 => true,
        172 => (16..=31).contains(&b),
        192 => ip.octets()[1] == 168,
        _ => false,
    }
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() {
        return true;
    }
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let segments = ip.segments();
    // fe80::/10 link-local
    if segments[0] & 0xffc0 == 0xfe80 {
        return true;
    }
    // fc00::/7 unique local
    if segments[0] & 0xfe00 == 0xfc00 {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_literal_hosts() {
        let err = guard_url("http://169.254.169.254/latest/meta-data", Environment::Production).unwrap_err();
        assert!(matches!(err, IngestError::BlockedHost { .. }));
    }

    #[test]
    fn blocks_suffix_hosts() {
        let err = guard_url("http://foo.local/", Environment::Production).unwrap_err();
        assert!(matches!(err, IngestError::BlockedHost { .. }));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = guard_url("ftp://example.com/", Environment::Development).unwrap_err();
        assert!(matches!(err, IngestError::InvalidUrl(_)));
    }

    #[test]
    fn allows_public_host_without_resolution_in_development() {
        assert!(guard_url("http://example.com/page", Environment::Development).is_ok());
    }

    #[test]
    fn private_v4_ranges_are_detected() {
        assert!(is_private(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_private(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1))));
        assert!(!is_private(IpAddr::V4(Ipv4Addr::new(172, 32, 0, 1))));
        assert!(is_private(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(is_private(IpAddr::V4(Ipv4Addr::new(169, 254, 1, 1))));
        assert!(!is_private(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    }

    #[test]
    fn private_v6_ranges_are_detected() {
        assert!(is_private(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_private(IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1))));
        assert!(is_private(IpAddr::V6(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 1))));
        assert!(!is_private(IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0, 0, 0, 0, 0, 0x8888))));
    }
}

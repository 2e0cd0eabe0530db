use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use anyhow::Result;

/// Resolves `host` to its first IPv4 address. IPv6 is not supported.
pub async fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    // First try to parse as IP address
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => return Ok(ip),
        Ok(IpAddr::V6(_)) => anyhow::bail!("IPv6 address {} is not supported", host),
        Err(_) => {}
    }

    let addr = format!("{}:0", host);
    let addrs = tokio::net::lookup_host(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Lookup for '{}' failed: {}", host, e))?;
    addrs
        .filter_map(|a| match a {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| anyhow::anyhow!("No IPv4 address found for {}", host))
}

//! Outbound URL validation.
//!
//! Slide images may point at arbitrary remote URLs, so every target is vetted
//! before the server connects: scheme check, hostname check, then DNS
//! resolution with every resolved address tested against private/internal
//! ranges. Addresses are checked after resolution, so a DNS answer pointing
//! into a private range is caught even when the URL text looks public.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tokio::net::lookup_host;
use tracing::warn;
use url::{Host, Url};

use crate::error::{FetchError, FetchResult};

/// Validate that a URL is safe to fetch from this server.
///
/// Rejects non-http(s) schemes, `localhost` and `*.local` hostnames, and any
/// URL whose host resolves to a loopback, private, link-local, unique-local,
/// or unspecified address (IPv4-mapped IPv6 forms included).
pub async fn guard_url(url: &Url) -> FetchResult<()> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(FetchError::BlockedScheme(scheme.to_string())),
    }

    let host = match url.host() {
        Some(h) => h,
        None => return Err(FetchError::blocked_host("URL has no host")),
    };

    let addrs: Vec<IpAddr> = match host {
        Host::Ipv4(ip) => vec![IpAddr::V4(ip)],
        Host::Ipv6(ip) => vec![IpAddr::V6(ip)],
        Host::Domain(domain) => {
            let name = domain.to_ascii_lowercase();
            if name == "localhost" || name.ends_with(".local") {
                return Err(FetchError::BlockedHost(name));
            }

            let port = url.port_or_known_default().unwrap_or(80);
            let resolved: Vec<IpAddr> = lookup_host((name.as_str(), port))
                .await
                .map_err(|_| FetchError::DnsFailed(name.clone()))?
                .map(|sa| sa.ip())
                .collect();
            resolved
        }
    };

    if addrs.is_empty() {
        return Err(FetchError::DnsFailed(
            url.host_str().unwrap_or_default().to_string(),
        ));
    }

    for addr in &addrs {
        if is_blocked_addr(*addr) {
            warn!(url = %url, addr = %addr, "Blocked fetch to internal address");
            return Err(FetchError::BlockedHost(format!(
                "{} resolves to blocked address {}",
                url.host_str().unwrap_or_default(),
                addr
            )));
        }
    }

    Ok(())
}

/// Check an already-resolved address against the blocked ranges.
pub fn is_blocked_addr(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v4(v4: Ipv4Addr) -> bool {
    // 127/8, 10/8 + 172.16/12 + 192.168/16, 169.254/16, 0.0.0.0
    v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
}

fn is_blocked_v6(v6: Ipv6Addr) -> bool {
    // An IPv4-mapped address is judged by its embedded IPv4 rules.
    if let Some(mapped) = v6.to_ipv4_mapped() {
        return is_blocked_v4(mapped);
    }

    let seg0 = v6.segments()[0];
    let link_local = (seg0 & 0xffc0) == 0xfe80; // fe80::/10
    let unique_local = (seg0 & 0xfe00) == 0xfc00; // fc00::/7

    v6.is_loopback() || v6.is_unspecified() || link_local || unique_local
}

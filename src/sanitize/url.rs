//! URL argument validation — scheme, host extraction, DNS and address
//! range checks.
//!
//! Outbound URL arguments must be https, and the host must resolve only to
//! public addresses. Loopback, RFC1918, link-local, and unique-local
//! ranges are rejected so an agent cannot point "download this" at the
//! gateway's own network.

use std::net::IpAddr;
use tokio::net::lookup_host;

/// Extract `(host, port)` from an https URL. Non-https schemes return an
/// error; this is an allow-list of one.
pub fn https_host(url: &str) -> Result<(String, u16), String> {
    let rest = url
        .strip_prefix("https://")
        .ok_or_else(|| format!("URL '{}' is not https — only https is permitted", url))?;

    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    if authority.is_empty() {
        return Err(format!("URL '{}' has no host", url));
    }

    // Strip userinfo if present; nobody legitimate embeds credentials here.
    let hostport = authority.rsplit('@').next().unwrap_or(authority);

    let (host, port) = match hostport.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
            let port: u16 = p
                .parse()
                .map_err(|_| format!("URL '{}' has an invalid port", url))?;
            (h.to_string(), port)
        }
        _ => (hostport.to_string(), 443),
    };

    if host.is_empty() {
        return Err(format!("URL '{}' has no host", url));
    }
    Ok((host, port))
}

/// True when the address is in a range an outbound action must never
/// reach: loopback, private, link-local, unspecified, or IPv6 unique-local.
pub fn is_disallowed_addr(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10 link-local
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                // fc00::/7 unique-local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

/// Validate an https URL: parse, resolve DNS, and reject if any resolved
/// address lands in a disallowed range. Resolution happens here, before
/// use, so a DNS answer cannot change between check and dispatch callers
/// that reuse the sanitized form.
pub async fn validate_https_url(url: &str) -> Result<(), String> {
    let (host, port) = https_host(url)?;

    // Literal IPs skip DNS but still get the range check.
    if let Ok(addr) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        if is_disallowed_addr(&addr) {
            return Err(format!(
                "URL host {} is a loopback/private/link-local address",
                host
            ));
        }
        return Ok(());
    }

    let addrs: Vec<IpAddr> = lookup_host((host.as_str(), port))
        .await
        .map_err(|e| format!("DNS resolution failed for '{}': {}", host, e))?
        .map(|sa| sa.ip())
        .collect();

    if addrs.is_empty() {
        return Err(format!("DNS returned no addresses for '{}'", host));
    }

    for addr in &addrs {
        if is_disallowed_addr(addr) {
            return Err(format!(
                "host '{}' resolves to disallowed address {}",
                host, addr
            ));
        }
    }

    Ok(())
}

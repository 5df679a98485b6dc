//! Remote attachment download with SSRF protection.
//!
//! Only `http`/`https` URLs are fetched. Hosts resolving to loopback, private,
//! link-local or otherwise internal addresses are refused unless the policy
//! allows private networks or explicitly allowlists the hostname. The
//! validated address is pinned into the client so a second DNS answer cannot
//! redirect the request, and redirects are disabled outright.

use std::{
    net::{IpAddr, SocketAddr},
    sync::LazyLock,
    time::Duration,
};

use {bytes::Bytes, futures::StreamExt, ipnet::IpNet, tracing::debug};

use crate::error::{Error, Result};

/// Maximum accepted URL length.
pub const MAX_URL_LENGTH: usize = 2048;

/// Default request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

static BLOCKED_NETS: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    [
        "0.0.0.0/8",
        "10.0.0.0/8",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "172.16.0.0/12",
        "192.0.0.0/24",
        "192.168.0.0/16",
        "198.18.0.0/15",
        "224.0.0.0/4",
        "240.0.0.0/4",
        "::/128",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
        "ff00::/8",
    ]
    .iter()
    .filter_map(|net| net.parse().ok())
    .collect()
});

/// Which destinations a fetch may reach.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Permit private/internal addresses for every host.
    pub allow_private_network: bool,
    /// Hostnames permitted even when they resolve to private addresses.
    /// `*.example.com` matches any subdomain of `example.com`.
    pub allowed_hostnames: Vec<String>,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            allow_private_network: false,
            allowed_hostnames: Vec::new(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl FetchPolicy {
    fn host_allowlisted(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_hostnames.iter().any(|pattern| {
            let pattern = pattern.trim().trim_end_matches('.').to_ascii_lowercase();
            match pattern.strip_prefix("*.") {
                Some(suffix) => host.len() > suffix.len() + 1 && host.ends_with(&format!(".{suffix}")),
                None => host == pattern,
            }
        })
    }

    fn private_allowed(&self, host: &str) -> bool {
        self.allow_private_network || self.host_allowlisted(host)
    }
}

/// Bytes downloaded from a URL.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    /// `Content-Type` response header, if present.
    pub content_type: Option<String>,
}

/// Returns `true` for loopback, private, link-local, CGNAT, multicast and
/// reserved addresses, including IPv4-mapped IPv6 forms of those.
#[must_use]
pub fn is_private_ip(ip: &IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(*ip, IpAddr::V4),
        IpAddr::V4(_) => *ip,
    };
    BLOCKED_NETS.iter().any(|net| net.contains(&ip))
}

fn is_internal_hostname(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

/// Validate a URL's scheme and host against `policy` without touching DNS.
pub fn check_url(raw: &str, policy: &FetchPolicy) -> Result<url::Url> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(Error::blocked(
            raw.chars().take(64).collect::<String>(),
            format!("URL longer than {MAX_URL_LENGTH} characters"),
        ));
    }
    let parsed = url::Url::parse(raw).map_err(|e| Error::invalid_input(format!("invalid URL {raw}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::blocked(raw, format!("scheme '{}' is not allowed", parsed.scheme())));
    }
    let host = match parsed.host() {
        Some(url::Host::Domain(d)) => d.to_string(),
        Some(url::Host::Ipv4(v4)) => {
            check_ip(raw, &IpAddr::V4(v4), &v4.to_string(), policy)?;
            return Ok(parsed);
        },
        Some(url::Host::Ipv6(v6)) => {
            check_ip(raw, &IpAddr::V6(v6), &v6.to_string(), policy)?;
            return Ok(parsed);
        },
        None => return Err(Error::blocked(raw, "URL has no host")),
    };
    if is_internal_hostname(&host) && !policy.private_allowed(&host) {
        return Err(Error::blocked(raw, format!("internal hostname {host}")));
    }
    Ok(parsed)
}

fn check_ip(url: &str, ip: &IpAddr, host: &str, policy: &FetchPolicy) -> Result<()> {
    if is_private_ip(ip) && !policy.private_allowed(host) {
        return Err(Error::blocked(url, format!("{ip} is a private address")));
    }
    Ok(())
}

/// Download `url` into memory, refusing bodies larger than `max_bytes`.
pub async fn fetch_url(url: &str, policy: &FetchPolicy, max_bytes: u64) -> Result<FetchedMedia> {
    let parsed = check_url(url, policy)?;

    let mut builder = reqwest::Client::builder()
        .timeout(policy.timeout)
        .redirect(reqwest::redirect::Policy::none());

    if let Some(url::Host::Domain(host)) = parsed.host() {
        let port = parsed.port_or_known_default().unwrap_or(443);
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| Error::external(format!("failed to resolve {host}"), e))?
            .collect();
        for addr in &addrs {
            check_ip(url, &addr.ip(), host, policy)?;
        }
        let pinned = addrs
            .first()
            .copied()
            .ok_or_else(|| Error::blocked(url, format!("no addresses for {host}")))?;
        debug!(url, host, resolved_ip = %pinned.ip(), "resolved media host");
        builder = builder.resolve(host, pinned);
    }

    let client = builder
        .build()
        .map_err(|e| Error::external("failed to build HTTP client", e))?;
    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| Error::external(format!("request to {url} failed"), e))?
        .error_for_status()
        .map_err(|e| Error::external(format!("request to {url} failed"), e))?;

    if let Some(len) = response.content_length()
        && len > max_bytes
    {
        return Err(Error::TooLarge { size: len, max: max_bytes });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::external(format!("reading {url}"), e))?;
        let size = (body.len() + chunk.len()) as u64;
        if size > max_bytes {
            return Err(Error::TooLarge { size, max: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(FetchedMedia {
        bytes: Bytes::from(body),
        content_type,
    })
}

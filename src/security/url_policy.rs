//! Outbound URL policy for the image proxy.
//!
//! A URL is allowed iff
//! - the scheme is `https`, and
//! - the host is not loopback, private or link-local, and
//! - the host is a trusted CDN host, or it is the configured storage host
//!   and the path sits under the public-object prefix.
//!
//! The blocklist only narrows; acceptance always needs an allowlist match.

use std::fmt;

use url::{Host, Url};

/// Image CDN hosts that are always allowed.
pub const TRUSTED_IMAGE_HOSTS: &[&str] = &[
    "s1.anilist.co",
    "s2.anilist.co",
    "s3.anilist.co",
    "s4.anilist.co",
    "img.anili.st",
];

/// Path segment of publicly readable objects on the storage host.
pub const STORAGE_PUBLIC_PATH: &str = "/storage/v1/object/public/";

/// Why a URL was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Malformed,
    Scheme,
    BlockedHost,
    NotAllowlisted,
}

impl Denial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Denial::Malformed => "malformed",
            Denial::Scheme => "scheme",
            Denial::BlockedHost => "blocked_host",
            Denial::NotAllowlisted => "not_allowlisted",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Denial::Malformed => "URL could not be parsed",
            Denial::Scheme => "only https URLs are allowed",
            Denial::BlockedHost => "host is loopback, private or link-local",
            Denial::NotAllowlisted => "host is not an allowed image source",
        };
        f.write_str(text)
    }
}

/// Immutable allowlist evaluated against candidate URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlPolicy {
    storage_host: Option<String>,
}

impl UrlPolicy {
    /// Build a policy from the optional storage service base URL.
    ///
    /// A storage URL that does not parse or has no host contributes nothing.
    pub fn new(storage_url: Option<&str>) -> Self {
        let storage_host = storage_url.and_then(|raw| match Url::parse(raw) {
            Ok(url) => url.host_str().map(str::to_ascii_lowercase),
            Err(e) => {
                tracing::warn!(storage_url = raw, error = %e, "Ignoring unparseable storage URL");
                None
            }
        });
        Self { storage_host }
    }

    pub fn storage_host(&self) -> Option<&str> {
        self.storage_host.as_deref()
    }

    /// Evaluate `raw`, returning the parsed URL when it may be fetched.
    pub fn check(&self, raw: &str) -> Result<Url, Denial> {
        let url = Url::parse(raw).map_err(|_| Denial::Malformed)?;

        if url.scheme() != "https" {
            return Err(Denial::Scheme);
        }

        let host = match url.host() {
            Some(host) => host,
            None => return Err(Denial::Malformed),
        };
        if is_blocked_host(&host) {
            return Err(Denial::BlockedHost);
        }

        let hostname = match host {
            Host::Domain(domain) => domain.to_ascii_lowercase(),
            // IP literals are never on the allowlist.
            Host::Ipv4(_) | Host::Ipv6(_) => return Err(Denial::NotAllowlisted),
        };

        if TRUSTED_IMAGE_HOSTS.contains(&hostname.as_str()) {
            return Ok(url);
        }

        match &self.storage_host {
            Some(storage_host)
                if *storage_host == hostname && url.path().contains(STORAGE_PUBLIC_PATH) =>
            {
                Ok(url)
            }
            _ => Err(Denial::NotAllowlisted),
        }
    }

    pub fn is_allowed(&self, raw: &str) -> bool {
        self.check(raw).is_ok()
    }
}

/// Convenience wrapper: evaluate `raw` against a one-off policy.
pub fn is_allowed_url(raw: &str, storage_url: Option<&str>) -> bool {
    UrlPolicy::new(storage_url).is_allowed(raw)
}

/// Loopback, RFC 1918 private and link-local hosts.
///
/// IPv6 unique-local addresses are not covered and names are not resolved;
/// the allowlist is what keeps those out.
pub fn is_blocked_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => ip.is_loopback() || ip.is_private() || ip.is_link_local(),
        Host::Ipv6(ip) => ip.is_loopback(),
    }
}

//! Host input normalization.
//!
//! Turns user-supplied strings (possibly defanged, possibly full URLs) into a
//! classified [`HostInput`]: either a canonical IP address or a lowercase
//! domain name.

use crate::errors::WibError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, net::IpAddr};

static DEFANG_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\.\]|\(\.\)|\{\.\}").expect("defang pattern is valid")
});

static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]+://").expect("scheme pattern is valid")
});

const MAX_DOMAIN_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    Ip,
    Domain,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::Ip => write!(f, "ip"),
            HostKind::Domain => write!(f, "domain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInput {
    pub kind: HostKind,
    pub normalized: String,
}

/// Replace `[.]`, `(.)` and `{.}` with a literal dot.
pub fn refang(value: &str) -> String {
    DEFANG_MARKERS.replace_all(value.trim(), ".").into_owned()
}

/// Inverse of [`refang`]: makes an indicator safe to paste into chats.
pub fn defang(value: &str) -> String {
    value.replace('.', "[.]")
}

pub fn is_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

/// Hostname syntax check. A single trailing dot is accepted.
pub fn is_domain(value: &str) -> bool {
    if is_ip(value) || value.is_empty() || value.len() > MAX_DOMAIN_LENGTH {
        return false;
    }

    let name = value.strip_suffix('.').unwrap_or(value);
    if name.is_empty() {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LENGTH
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Classify and clean a raw host string.
pub fn normalize(raw: &str) -> Result<HostInput, WibError> {
    let lowered = raw.trim().to_lowercase();
    let refanged = refang(&lowered);
    let without_scheme = SCHEME_PREFIX.replace(&refanged, "");

    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_matches(|c| c == '[' || c == ']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(HostInput {
            kind: HostKind::Ip,
            normalized: ip.to_string(),
        });
    }

    if is_domain(host) {
        return Ok(HostInput {
            kind: HostKind::Domain,
            normalized: host.trim_end_matches('.').to_string(),
        });
    }

    Err(WibError::InvalidHost(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(raw: &str, kind: HostKind, value: &str) {
        let host = normalize(raw).unwrap();
        assert_eq!(host.kind, kind, "kind for {}", raw);
        assert_eq!(host.normalized, value, "value for {}", raw);
    }

    #[test]
    fn test_normalize_examples() {
        check("1.1.1.1", HostKind::Ip, "1.1.1.1");
        check("[2606:4700:4700::1111]", HostKind::Ip, "2606:4700:4700::1111");
        check("api[.]google[.]com", HostKind::Domain, "api.google.com");
        check("https://example.com/path", HostKind::Domain, "example.com");
    }

    #[test]
    fn test_normalize_canonicalizes_ip() {
        for raw in ["8.8.8.8", "2001:db8::1", "2001:DB8:0:0:0:0:0:1", "::1"] {
            let expected = raw.parse::<IpAddr>().unwrap().to_string();
            check(raw, HostKind::Ip, &expected);
        }
    }

    #[test]
    fn test_refang_variants() {
        check("1(.)1{.}1[.]1", HostKind::Ip, "1.1.1.1");
        check("  Example[.]ORG  ", HostKind::Domain, "example.org");
        check("hxxps://evil[.]example[.]net/payload?x=1", HostKind::Domain, "evil.example.net");
        check("example.com?query", HostKind::Domain, "example.com");
        check("http://[2001:db8::1]/index.html", HostKind::Ip, "2001:db8::1");
    }

    #[test]
    fn test_trailing_dot_is_stripped() {
        check("example.com.", HostKind::Domain, "example.com");
    }

    #[test]
    fn test_invalid_inputs() {
        for raw in ["not a host", "", "exa_mple.com", "-bad.example.com", "bad-.example.com", "a..b", "!!!"] {
            let result = normalize(raw);
            assert!(matches!(result, Err(WibError::InvalidHost(_))), "expected failure for {:?}", raw);
        }
    }

    #[test]
    fn test_domain_length_limits() {
        let long_label = "a".repeat(64);
        assert!(!is_domain(&format!("{}.com", long_label)));
        assert!(is_domain(&format!("{}.com", "a".repeat(63))));

        let too_long = vec!["abcdefghij"; 24].join(".") + ".example";
        assert!(too_long.len() > 253);
        assert!(!is_domain(&too_long));
    }

    #[test]
    fn test_defang_roundtrip() {
        assert_eq!(defang("1.1.1.1"), "1[.]1[.]1[.]1");
        assert_eq!(refang(&defang("mail.example.com")), "mail.example.com");
    }
}

//! Free-text WHOIS response parsing.
//!
//! Registries disagree on labels, so each field has an ordered list of
//! patterns and the first one that matches wins. Reordering a list changes
//! what gets extracted for registries whose responses match several labels.

use crate::models::{dedup_preserving_order, non_empty, DomainWhoisRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?im){}", p)).expect("whois field pattern is valid"))
        .collect()
}

static REGISTRAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^Registrar:\s*(.+)$",
        r"^Sponsoring Registrar:\s*(.+)$",
        r"^Registrar Name:\s*(.+)$",
    ])
});

static NAMESERVER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[r"^Name Server:\s*([^\s#;]+)", r"^nserver:\s*([^\s#;]+)"])
});

static CREATED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^Creation Date:\s*(.+)$",
        r"^Registered on:\s*(.+)$",
        r"^Created:\s*(.+)$",
    ])
});

static UPDATED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^Updated Date:\s*(.+)$",
        r"^Last Updated on:\s*(.+)$",
        r"^Last Modified:\s*(.+)$",
    ])
});

static EXPIRES_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^Registry Expiry Date:\s*(.+)$",
        r"^Expiry Date:\s*(.+)$",
        r"^Expires:\s*(.+)$",
        r"^paid-till:\s*(.+)$",
    ])
});

static DNSSEC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| compile(&[r"^DNSSEC:\s*(.+)$"]));

pub struct WhoisParser;

impl WhoisParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, domain: &str, text: &str) -> DomainWhoisRecord {
        let registrar = find_first(&REGISTRAR_PATTERNS, text).filter(|r| !r.is_empty());
        let nameservers = find_all(&NAMESERVER_PATTERNS, text);
        let dnssec_signed = find_first(&DNSSEC_PATTERNS, text).map(|raw| is_signed(&raw));

        DomainWhoisRecord {
            domain: domain.to_string(),
            registrar,
            nameservers: non_empty(nameservers),
            dnssec_signed,
            created_at: find_first(&CREATED_PATTERNS, text).and_then(|v| parse_whois_date(&v)),
            updated_at: find_first(&UPDATED_PATTERNS, text).and_then(|v| parse_whois_date(&v)),
            expires_at: find_first(&EXPIRES_PATTERNS, text).and_then(|v| parse_whois_date(&v)),
        }
    }
}

impl Default for WhoisParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_first(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

// Matches from every pattern, lowercased, deduplicated in first-seen order.
fn find_all(patterns: &[Regex], text: &str) -> Vec<String> {
    let values = patterns.iter().flat_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
    });
    dedup_preserving_order(values)
}

fn is_signed(raw: &str) -> bool {
    let value = raw.trim().to_lowercase();
    value.starts_with("signed") || matches!(value.as_str(), "yes" | "true" | "ds present")
}

/// Parse a WHOIS timestamp using the registry formats in priority order, then
/// generic ISO-8601. Values without an offset are taken as UTC.
pub fn parse_whois_date(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    for format in ["%d-%b-%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    let parsed = parse_iso8601(value);
    if parsed.is_none() {
        debug!("Failed to parse date: {}", value);
    }
    parsed
}

/// Lenient ISO-8601: `Z` is read as `+00:00`, fractional seconds and missing
/// offsets are accepted.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim().replace('Z', "+00:00");
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt.with_timezone(&Utc));
    }

    let offset_formats = [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
    ];
    for format in offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(&value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for format in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    const VERISIGN_RESPONSE: &str = "   Domain Name: EXAMPLE.COM\r\n\
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r\n\
Registrar WHOIS Server: whois.iana.org\r\n\
Registrar URL: http://res-dom.iana.org\r\n\
Updated Date: 2024-08-14T07:01:34Z\r\n\
Creation Date: 1995-08-14T04:00:00Z\r\n\
Registry Expiry Date: 2025-08-13T04:00:00Z\r\n\
Registrar: RESERVED-Internet Assigned Numbers Authority\r\n\
Registrar IANA ID: 376\r\n\
Name Server: A.IANA-SERVERS.NET\r\n\
Name Server: B.IANA-SERVERS.NET\r\n\
Name Server: a.iana-servers.net\r\n\
DNSSEC: signedDelegation\r\n\
>>> Last update of whois database: 2024-09-01T12:00:00Z <<<\r\n";

    const NOMINET_STYLE: &str = "\
    Domain name:\n        example.co.uk\n\n\
Registrar Name: Example Registrar Ltd\n\
Registered on: 26-Aug-1996\n\
Last Updated on: 2023-02-01\n\
Expiry Date: 31-Dec-2030\n\
nserver: ns1.example.co.uk 192.0.2.1\n\
nserver: NS2.EXAMPLE.CO.UK\n\
DNSSEC: Unsigned\n";

    #[test]
    fn test_parse_verisign_response() {
        let record = WhoisParser::new().parse("example.com", VERISIGN_RESPONSE);

        assert_eq!(record.domain, "example.com");
        assert_eq!(record.registrar.as_deref(), Some("RESERVED-Internet Assigned Numbers Authority"));
        assert_eq!(
            record.nameservers,
            Some(vec!["a.iana-servers.net".to_string(), "b.iana-servers.net".to_string()])
        );
        assert_eq!(record.dnssec_signed, Some(true));
        assert_eq!(record.created_at, Some(Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap()));
        assert_eq!(record.updated_at, Some(Utc.with_ymd_and_hms(2024, 8, 14, 7, 1, 34).unwrap()));
        assert_eq!(record.expires_at, Some(Utc.with_ymd_and_hms(2025, 8, 13, 4, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_alternate_labels() {
        let record = WhoisParser::new().parse("example.co.uk", NOMINET_STYLE);

        assert_eq!(record.registrar.as_deref(), Some("Example Registrar Ltd"));
        assert_eq!(
            record.nameservers,
            Some(vec!["ns1.example.co.uk".to_string(), "ns2.example.co.uk".to_string()])
        );
        assert_eq!(record.dnssec_signed, Some(false));
        assert_eq!(record.created_at.map(|d| d.year()), Some(1996));
        assert_eq!(record.updated_at, Some(Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap()));
        assert_eq!(record.expires_at, Some(Utc.with_ymd_and_hms(2030, 12, 31, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_first_pattern_wins() {
        let text = "Registrar Name: Second Choice\nSponsoring Registrar: First Choice\n";
        let record = WhoisParser::new().parse("example.org", text);
        assert_eq!(record.registrar.as_deref(), Some("First Choice"));
    }

    #[test]
    fn test_empty_response_yields_all_absent() {
        let record = WhoisParser::new().parse("example.net", "No match for \"EXAMPLE.NET\".\n");
        assert_eq!(record, DomainWhoisRecord::empty("example.net"));
    }

    #[test]
    fn test_dnssec_values() {
        for (raw, expected) in [
            ("signedDelegation", true),
            ("yes", true),
            ("True", true),
            ("DS present", true),
            ("unsigned", false),
            ("no", false),
        ] {
            assert_eq!(is_signed(raw), expected, "dnssec value {}", raw);
        }
    }

    #[test]
    fn test_date_formats() {
        let midnight = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();

        assert_eq!(parse_whois_date("2020-08-14T04:00:00Z"), Some(Utc.with_ymd_and_hms(2020, 8, 14, 4, 0, 0).unwrap()));
        assert_eq!(parse_whois_date("2020-08-14 04:00:00+0200"), Some(Utc.with_ymd_and_hms(2020, 8, 14, 2, 0, 0).unwrap()));
        assert_eq!(parse_whois_date("2020-08-14 04:00:00"), Some(Utc.with_ymd_and_hms(2020, 8, 14, 4, 0, 0).unwrap()));
        assert_eq!(parse_whois_date("13-aug-1995"), Some(midnight(1995, 8, 13)));
        assert_eq!(parse_whois_date("1995-08-13"), Some(midnight(1995, 8, 13)));
        assert_eq!(parse_whois_date("2020-08-14T04:00:00.123Z").map(|d| d.timestamp()), Some(Utc.with_ymd_and_hms(2020, 8, 14, 4, 0, 0).unwrap().timestamp()));
        assert_eq!(parse_whois_date("2020-08-14T04:00:00+01:00"), Some(Utc.with_ymd_and_hms(2020, 8, 14, 3, 0, 0).unwrap()));
    }

    #[test]
    fn test_unparseable_dates_are_absent() {
        assert_eq!(parse_whois_date(""), None);
        assert_eq!(parse_whois_date("before 1996"), None);
        assert_eq!(parse_whois_date("2020-13-45"), None);

        let record = WhoisParser::new().parse("example.io", "Creation Date: sometime last year\n");
        assert_eq!(record.created_at, None);
    }
}

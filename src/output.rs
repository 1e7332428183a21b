//! Rendering of lookup results as JSON, YAML, Markdown or a plain text table.

use crate::{
    errors::WibError,
    models::{DomainDnsRecord, DomainResult, IpResult, LookupResult},
};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const ABSENT: &str = "-";
const ENTITY_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Md,
}

pub fn render(results: &[LookupResult], format: OutputFormat) -> Result<String, WibError> {
    match format {
        OutputFormat::Json => render_json(results),
        OutputFormat::Yaml => render_yaml(results),
        OutputFormat::Md => Ok(results
            .iter()
            .map(render_markdown)
            .collect::<Vec<_>>()
            .join(ENTITY_SEPARATOR)),
        OutputFormat::Table => Ok(results
            .iter()
            .map(render_table)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// A single entity renders as one object, several as an array.
pub fn render_json(results: &[LookupResult]) -> Result<String, WibError> {
    let text = match results {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    Ok(text)
}

/// Same document shape as [`render_json`], keys in declaration order.
pub fn render_yaml(results: &[LookupResult]) -> Result<String, WibError> {
    let text = match results {
        [single] => serde_yaml::to_string(single)?,
        many => serde_yaml::to_string(many)?,
    };
    Ok(text)
}

fn or_absent(value: Option<&str>) -> &str {
    value.unwrap_or(ABSENT)
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |t| t.to_rfc3339())
}

fn dnssec(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => ABSENT,
    }
}

fn joined(values: Option<&Vec<String>>, separator: &str) -> String {
    values.map_or_else(|| ABSENT.to_string(), |v| v.join(separator))
}

fn coordinates(latitude: Option<f64>, longitude: Option<f64>) -> String {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => format!("{},{}", lat, lon),
        _ => ABSENT.to_string(),
    }
}

fn ip_rows(result: &IpResult) -> Option<Vec<(&'static str, String)>> {
    let geo = result.geo.as_ref()?;
    Some(vec![
        ("IP", geo.ip.clone()),
        ("ASN", or_absent(geo.asn.as_deref()).to_string()),
        ("Org", or_absent(geo.org.as_deref()).to_string()),
        ("ISP", or_absent(geo.isp.as_deref()).to_string()),
        ("Country", or_absent(geo.country.as_deref()).to_string()),
        ("Region", or_absent(geo.region.as_deref()).to_string()),
        ("City", or_absent(geo.city.as_deref()).to_string()),
        ("Lat,Lon", coordinates(geo.latitude, geo.longitude)),
        ("Reverse", or_absent(geo.reverse_domain.as_deref()).to_string()),
    ])
}

fn whois_rows(result: &DomainResult) -> Option<Vec<(&'static str, String)>> {
    let whois = result.whois.as_ref()?;
    Some(vec![
        ("Domain", whois.domain.clone()),
        ("Registrar", or_absent(whois.registrar.as_deref()).to_string()),
        ("Nameservers", joined(whois.nameservers.as_ref(), ", ")),
        ("DNSSEC", dnssec(whois.dnssec_signed).to_string()),
        ("Created", timestamp(whois.created_at)),
        ("Updated", timestamp(whois.updated_at)),
        ("Expires", timestamp(whois.expires_at)),
    ])
}

// Only resolved record types get a row.
fn dns_rows(dns: &DomainDnsRecord) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    let lists = [("A", &dns.a), ("AAAA", &dns.aaaa), ("CNAME", &dns.cname), ("NS", &dns.ns)];
    for (label, values) in lists {
        if let Some(values) = values {
            rows.push((label, values.join(", ")));
        }
    }
    if let Some(mx) = &dns.mx {
        let exchanges: Vec<String> = mx
            .iter()
            .map(|r| format!("{} {}", r.preference, r.exchange))
            .collect();
        rows.push(("MX", exchanges.join(", ")));
    }
    if let Some(txt) = &dns.txt {
        rows.push(("TXT", txt.join(" | ")));
    }
    rows
}

fn render_markdown(result: &LookupResult) -> String {
    let mut lines = Vec::new();
    match result {
        LookupResult::Ip(ip) => {
            lines.push(format!("# IP {}", ip.ip));
            if let Some(rows) = ip_rows(ip) {
                push_section(&mut lines, "Geo", &rows[1..]);
            }
        }
        LookupResult::Domain(domain) => {
            lines.push(format!("# Domain {}", domain.domain));
            if let Some(rows) = whois_rows(domain) {
                push_section(&mut lines, "Whois", &rows[1..]);
            }
            if let Some(dns) = &domain.dns {
                push_section(&mut lines, "DNS", &dns_rows(dns));
            }
        }
    }
    lines.join("\n")
}

fn push_section(lines: &mut Vec<String>, title: &str, rows: &[(&str, String)]) {
    lines.push(format!("## {}", title));
    lines.extend(rows.iter().map(|(field, value)| format!("- {}: {}", field, value)));
}

fn render_table(result: &LookupResult) -> String {
    let mut out = String::new();
    match result {
        LookupResult::Ip(ip) => {
            let rows = ip_rows(ip)
                .unwrap_or_else(|| vec![("Note", "No geolocation data available".to_string())]);
            push_table(&mut out, &format!("IPWhois {}", ip.ip), &rows);
        }
        LookupResult::Domain(domain) => {
            let rows = whois_rows(domain)
                .unwrap_or_else(|| vec![("Note", "No whois available".to_string())]);
            push_table(&mut out, &format!("Whois {}", domain.domain), &rows);
            if let Some(dns) = &domain.dns {
                push_table(&mut out, "DNS", &dns_rows(dns));
            }
        }
    }
    out
}

fn push_table(out: &mut String, title: &str, rows: &[(&str, String)]) {
    let width = rows.iter().map(|(field, _)| field.len()).max().unwrap_or(0);
    let _ = writeln!(out, "{}", title);
    for (field, value) in rows {
        let _ = writeln!(out, "  {:<width$}  {}", field, value, width = width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DomainWhoisRecord, IpGeoRecord, MxRecord};
    use chrono::TimeZone;
    use serde_json::Value;

    fn ip_result() -> LookupResult {
        LookupResult::Ip(IpResult {
            ip: "1.1.1.1".to_string(),
            geo: Some(IpGeoRecord {
                ip: "1.1.1.1".to_string(),
                asn: Some("13335".to_string()),
                org: None,
                isp: Some("Cloudflare, Inc.".to_string()),
                country: Some("Australia".to_string()),
                region: None,
                city: None,
                latitude: Some(-33.5),
                longitude: Some(151.25),
                reverse_domain: None,
            }),
        })
    }

    fn domain_result() -> LookupResult {
        LookupResult::Domain(DomainResult {
            domain: "example.com".to_string(),
            whois: Some(DomainWhoisRecord {
                registrar: Some("Example Registrar".to_string()),
                nameservers: Some(vec!["a.iana-servers.net".to_string(), "b.iana-servers.net".to_string()]),
                dnssec_signed: Some(true),
                created_at: Some(Utc.with_ymd_and_hms(1995, 8, 13, 4, 0, 0).unwrap()),
                ..DomainWhoisRecord::empty("example.com")
            }),
            dns: Some(DomainDnsRecord {
                a: Some(vec!["93.184.215.14".to_string()]),
                mx: Some(vec![MxRecord { preference: 10, exchange: "mx.example.com".to_string() }]),
                txt: Some(vec!["v=spf1 -all".to_string(), "hello".to_string()]),
                ..DomainDnsRecord::default()
            }),
        })
    }

    #[test]
    fn test_json_single_entity_is_an_object() {
        let text = render(&[ip_result()], OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "ip");
        assert_eq!(value["data"]["geo"]["asn"], "13335");
        assert!(value["data"]["geo"]["org"].is_null());
    }

    #[test]
    fn test_json_many_entities_is_an_array() {
        let text = render(&[ip_result(), domain_result()], OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["kind"], "domain");
        assert_eq!(items[1]["data"]["whois"]["dnssec_signed"], true);
        assert!(items[1]["data"]["dns"]["aaaa"].is_null());
    }

    #[test]
    fn test_yaml_matches_json_shape() {
        let text = render(&[domain_result()], OutputFormat::Yaml).unwrap();
        assert!(text.starts_with("kind: domain\ndata:\n"));
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(value["data"]["whois"]["registrar"].as_str(), Some("Example Registrar"));
        assert!(value["data"]["whois"]["updated_at"].is_null());
        assert_eq!(value["data"]["dns"]["mx"][0]["preference"].as_u64(), Some(10));

        let text = render(&[ip_result(), domain_result()], OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        let items = value.as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["kind"].as_str(), Some("ip"));
        assert_eq!(items[0]["data"]["geo"]["asn"].as_str(), Some("13335"));
    }

    #[test]
    fn test_markdown_sections() {
        let text = render(&[ip_result(), domain_result()], OutputFormat::Md).unwrap();
        let chunks: Vec<&str> = text.split(ENTITY_SEPARATOR).collect();
        assert_eq!(chunks.len(), 2);

        assert!(chunks[0].starts_with("# IP 1.1.1.1\n## Geo\n- ASN: 13335"));
        assert!(chunks[0].contains("- Org: -"));
        assert!(chunks[0].contains("- Lat,Lon: -33.5,151.25"));

        assert!(chunks[1].starts_with("# Domain example.com\n## Whois\n- Registrar: Example Registrar"));
        assert!(chunks[1].contains("- Created: 1995-08-13T04:00:00+00:00"));
        assert!(chunks[1].contains("## DNS\n- A: 93.184.215.14\n- MX: 10 mx.example.com\n- TXT: v=spf1 -all | hello"));
    }

    #[test]
    fn test_table_notes_for_missing_data() {
        let results = [
            LookupResult::Ip(IpResult { ip: "10.0.0.1".to_string(), geo: None }),
            LookupResult::Domain(DomainResult { domain: "nothing.example".to_string(), whois: None, dns: None }),
        ];
        let text = render(&results, OutputFormat::Table).unwrap();
        assert!(text.contains("IPWhois 10.0.0.1\n  Note  No geolocation data available\n"));
        assert!(text.contains("Whois nothing.example\n  Note  No whois available\n"));
        assert!(!text.contains("DNS"));
    }

    #[test]
    fn test_table_alignment() {
        let text = render(&[domain_result()], OutputFormat::Table).unwrap();
        assert!(text.contains("  Registrar    Example Registrar\n"));
        assert!(text.contains("  DNSSEC       yes\n"));
        assert!(text.contains("  Updated      -\n"));
        assert!(text.contains("DNS\n  A    93.184.215.14\n"));
    }
}

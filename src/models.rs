//! Normalized records produced by the service clients.
//!
//! Every optional field is `None` when the provider did not report it. Empty
//! collections are never used to mean "absent": list fields are `None` rather
//! than `Some(vec![])`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpGeoRecord {
    pub ip: String,
    pub asn: Option<String>,
    pub org: Option<String>,
    pub isp: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub reverse_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainWhoisRecord {
    pub domain: String,
    pub registrar: Option<String>,
    /// Lowercase, deduplicated. Sorted for RDAP and paid sources, first-seen order for port 43.
    pub nameservers: Option<Vec<String>>,
    pub dnssec_signed: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DomainWhoisRecord {
    pub fn empty(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            registrar: None,
            nameservers: None,
            dnssec_signed: None,
            created_at: None,
            updated_at: None,
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: u32,
    pub exchange: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDnsRecord {
    pub a: Option<Vec<String>>,
    pub aaaa: Option<Vec<String>>,
    pub cname: Option<Vec<String>>,
    pub ns: Option<Vec<String>>,
    pub mx: Option<Vec<MxRecord>>,
    pub txt: Option<Vec<String>>,
}

impl DomainDnsRecord {
    /// True when no record type resolved. Such a record is reported as absent.
    pub fn is_empty(&self) -> bool {
        self.a.is_none()
            && self.aaaa.is_none()
            && self.cname.is_none()
            && self.ns.is_none()
            && self.mx.is_none()
            && self.txt.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpResult {
    pub ip: String,
    pub geo: Option<IpGeoRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    pub domain: String,
    pub whois: Option<DomainWhoisRecord>,
    pub dns: Option<DomainDnsRecord>,
}

/// One resolved entity, serialized as `{"kind": "ip"|"domain", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum LookupResult {
    Ip(IpResult),
    Domain(DomainResult),
}

/// Wrap a list in `Some` unless it is empty.
pub(crate) fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Deduplicate while keeping the first occurrence of each value.
pub(crate) fn dedup_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

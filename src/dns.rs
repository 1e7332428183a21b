//! DNS-over-HTTPS lookups using the Google Public DNS JSON API.
//!
//! Endpoint shape: `GET <doh>/resolve?name=<domain>&type=<RRTYPE>`.

use crate::{
    errors::WibError,
    models::{dedup_preserving_order, non_empty, DomainDnsRecord, MxRecord},
    request::RequestManager,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct DnsClient {
    requests: Arc<RequestManager>,
    doh_url: String,
}

impl DnsClient {
    pub fn new(requests: Arc<RequestManager>, doh_url: &str) -> Self {
        Self {
            requests,
            doh_url: doh_url.to_string(),
        }
    }

    /// One query per record type, issued sequentially. `Ok(None)` when nothing resolved.
    pub async fn fetch(&self, domain: &str) -> Result<Option<DomainDnsRecord>, WibError> {
        let record = DomainDnsRecord {
            a: non_empty(extract_values(self.resolve(domain, "A").await?)),
            aaaa: non_empty(extract_values(self.resolve(domain, "AAAA").await?)),
            cname: non_empty(extract_values(self.resolve(domain, "CNAME").await?)),
            ns: non_empty(extract_values(self.resolve(domain, "NS").await?)),
            mx: non_empty(extract_mx(self.resolve(domain, "MX").await?)),
            txt: non_empty(extract_values(self.resolve(domain, "TXT").await?)),
        };

        if record.is_empty() {
            debug!("No DNS records resolved for {}", domain);
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Raw `data` strings of the answer section; empty when the query failed.
    async fn resolve(&self, name: &str, rrtype: &str) -> Result<Vec<String>, WibError> {
        let response = self
            .requests
            .get(&self.doh_url, &[("name", name), ("type", rrtype)])
            .await?;
        if !response.is_ok() {
            debug!("DoH {} query for {} returned status {}", rrtype, name, response.status);
            return Ok(Vec::new());
        }

        let body: Value = response.json()?;
        let status = body.get("Status").and_then(Value::as_i64).unwrap_or(0);
        if status != 0 {
            debug!("DoH {} query for {} returned DNS status {}", rrtype, name, status);
            return Ok(Vec::new());
        }

        let data = body
            .get("Answer")
            .and_then(Value::as_array)
            .map(|answers| {
                answers
                    .iter()
                    .filter_map(|answer| answer.get("data").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(data)
    }
}

/// Trim whitespace and the trailing root dot, then deduplicate in first-seen order.
pub fn extract_values(raw: Vec<String>) -> Vec<String> {
    dedup_preserving_order(
        raw.into_iter()
            .map(|value| value.trim().trim_end_matches('.').to_string()),
    )
}

/// Parse `"<preference> <exchange>"` values, sorted by preference then exchange.
/// Malformed values are skipped.
pub fn extract_mx(raw: Vec<String>) -> Vec<MxRecord> {
    let mut records: Vec<MxRecord> = raw
        .iter()
        .filter_map(|value| {
            let mut parts = value.split_whitespace();
            let preference = parts.next()?;
            let exchange = parts.next()?;
            if !preference.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(MxRecord {
                preference: preference.parse().ok()?,
                exchange: exchange.trim_end_matches('.').to_string(),
            })
        })
        .collect();

    records.sort_by(|a, b| (a.preference, &a.exchange).cmp(&(b.preference, &b.exchange)));
    records
}

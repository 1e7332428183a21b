//! IP2WHOIS v2 API client. Only wired in when an API key is configured.

use crate::{
    errors::WibError,
    models::{non_empty, DomainWhoisRecord},
    parser::parse_iso8601,
    request::RequestManager,
};
use serde_json::Value;
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

const SIGNED_VALUES: [&str; 5] = ["signed", "yes", "true", "enabled", "enable"];

pub struct Ip2WhoisClient {
    requests: Arc<RequestManager>,
    base_url: String,
    api_key: String,
}

impl Ip2WhoisClient {
    pub fn new(requests: Arc<RequestManager>, base_url: &str, api_key: &str) -> Self {
        Self {
            requests,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// `Ok(None)` on a non-200 status or when the body carries an `error` object.
    pub async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError> {
        let response = self
            .requests
            .get(&self.base_url, &[("key", self.api_key.as_str()), ("domain", domain)])
            .await?;
        if !response.is_ok() {
            debug!("IP2WHOIS lookup for {} returned status {}", domain, response.status);
            return Ok(None);
        }

        let body: Value = response.json()?;
        Ok(parse_ip2whois(domain, &body))
    }
}

fn parse_ip2whois(domain: &str, body: &Value) -> Option<DomainWhoisRecord> {
    if body.get("error").map_or(false, Value::is_object) {
        debug!("IP2WHOIS reported an error for {}: {}", domain, body["error"]);
        return None;
    }

    let registrar = match body.get("registrar") {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Object(fields)) => fields.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
    .filter(|name| !name.is_empty());

    let nameservers: BTreeSet<String> = match body.get("name_servers") {
        Some(Value::Array(servers)) => servers
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_lowercase)
            .collect(),
        Some(Value::String(servers)) => servers
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect(),
        _ => BTreeSet::new(),
    };

    let dnssec_signed = body
        .get("dnssec")
        .and_then(Value::as_str)
        .map(|value| SIGNED_VALUES.contains(&value.trim().to_lowercase().as_str()));

    let date = |key: &str| body.get(key).and_then(Value::as_str).and_then(parse_iso8601);

    Some(DomainWhoisRecord {
        domain: domain.to_string(),
        registrar,
        nameservers: non_empty(nameservers.into_iter().collect()),
        dnssec_signed,
        created_at: date("create_date"),
        updated_at: date("update_date"),
        expires_at: date("expire_date"),
    })
}

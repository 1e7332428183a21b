//! RDAP (Registration Data Access Protocol) client
//!
//! Structured JSON successor to WHOIS (RFC 9083 response shape), queried
//! through a public aggregator that redirects to the authoritative registry.

use crate::{
    errors::WibError,
    geo::is_truthy,
    models::{non_empty, DomainWhoisRecord},
    parser::parse_iso8601,
    request::RequestManager,
};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

pub struct RdapClient {
    requests: Arc<RequestManager>,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RdapDomainResponse {
    #[serde(rename = "nameservers")]
    name_servers: Option<Vec<RdapNameserver>>,
    events: Option<Vec<RdapEvent>>,
    entities: Option<Vec<RdapEntity>>,
    #[serde(rename = "secureDNS")]
    secure_dns: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RdapNameserver {
    #[serde(rename = "ldhName")]
    ldh_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    event_action: Option<String>,
    #[serde(rename = "eventDate")]
    event_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RdapEntity {
    roles: Option<Vec<String>>,
    #[serde(rename = "vcardArray")]
    vcard_array: Option<Value>,
}

impl RdapClient {
    pub fn new(requests: Arc<RequestManager>, base_url: &str) -> Self {
        Self {
            requests,
            base_url: base_url.to_string(),
        }
    }

    /// `Ok(None)` on any non-200 status.
    pub async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError> {
        let url = format!("{}domain/{}", self.base_url, domain);
        let response = self.requests.get(&url, &[]).await?;
        if !response.is_ok() {
            debug!("RDAP lookup for {} returned status {}", domain, response.status);
            return Ok(None);
        }

        let rdap: RdapDomainResponse = response.json()?;
        Ok(Some(parse_rdap_response(domain, &rdap)))
    }
}

fn parse_rdap_response(domain: &str, rdap: &RdapDomainResponse) -> DomainWhoisRecord {
    let mut record = DomainWhoisRecord::empty(domain);

    // A later event with the same action replaces an earlier one.
    for event in rdap.events.iter().flatten() {
        let when = event.event_date.as_deref().and_then(parse_iso8601);
        match event.event_action.as_deref() {
            Some("registration") => record.created_at = when,
            Some("last changed") => record.updated_at = when,
            Some("expiration") => record.expires_at = when,
            _ => {}
        }
    }

    record.registrar = rdap
        .entities
        .iter()
        .flatten()
        .filter(|entity| {
            entity
                .roles
                .as_ref()
                .map_or(false, |roles| roles.iter().any(|r| r == "registrar"))
        })
        .find_map(|entity| entity.vcard_array.as_ref().and_then(formatted_name));

    let nameservers: BTreeSet<String> = rdap
        .name_servers
        .iter()
        .flatten()
        .filter_map(|ns| ns.ldh_name.as_deref())
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase)
        .collect();
    record.nameservers = non_empty(nameservers.into_iter().collect());

    record.dnssec_signed = rdap
        .secure_dns
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|sec| sec.get("zoneSigned"))
        .map(is_truthy);

    record
}

/// The `fn` property of a jCard: `["vcard", [["fn", {}, "text", "Name"], ...]]`.
fn formatted_name(vcard: &Value) -> Option<String> {
    let parts = vcard.as_array().filter(|parts| parts.len() == 2)?;
    let properties = parts[1].as_array()?;

    properties.iter().find_map(|property| {
        let property = property.as_array().filter(|p| !p.is_empty())?;
        if property[0].as_str() != Some("fn") {
            return None;
        }
        match property.last()? {
            Value::String(name) => Some(name.clone()),
            Value::Array(values) => values.last().and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    })
}

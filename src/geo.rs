//! IP geolocation and ASN lookups against the ipwho.is API.

use crate::{errors::WibError, models::IpGeoRecord, request::RequestManager};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct GeoClient {
    requests: Arc<RequestManager>,
    base_url: String,
}

impl GeoClient {
    pub fn new(requests: Arc<RequestManager>, base_url: &str) -> Self {
        Self {
            requests,
            base_url: base_url.to_string(),
        }
    }

    /// `Ok(None)` on a non-200 status, an unsuccessful body or a malformed body.
    /// Transport failures are returned as errors.
    pub async fn fetch(&self, ip: &str) -> Result<Option<IpGeoRecord>, WibError> {
        let url = format!("{}{}", self.base_url, ip);
        let response = self.requests.get(&url, &[]).await?;
        if !response.is_ok() {
            debug!("Geolocation lookup for {} returned status {}", ip, response.status);
            return Ok(None);
        }

        match response.json::<Value>() {
            Ok(body) => Ok(parse_geo(ip, &body)),
            Err(e) => {
                debug!("Malformed geolocation body for {}: {}", ip, e);
                Ok(None)
            }
        }
    }
}

fn parse_geo(ip: &str, body: &Value) -> Option<IpGeoRecord> {
    if let Some(success) = body.get("success") {
        if !is_truthy(success) {
            return None;
        }
    }

    let connection = body.get("connection").and_then(Value::as_object);
    let asn = connection.and_then(|c| c.get("asn")).and_then(scalar_text);
    let isp = connection.and_then(|c| c.get("isp")).and_then(scalar_text);

    Some(IpGeoRecord {
        ip: ip.to_string(),
        asn,
        org: text_field(body, "org"),
        isp,
        country: text_field(body, "country"),
        region: text_field(body, "region"),
        city: text_field(body, "city"),
        latitude: body.get("latitude").and_then(Value::as_f64),
        longitude: body.get("longitude").and_then(Value::as_f64),
        reverse_domain: text_field(body, "domain"),
    })
}

fn text_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(scalar_text)
}

// Numbers and non-empty strings become text; everything else counts as unreported.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

//! Orchestration of the service clients for each kind of entity.

use crate::{
    config::Config,
    dns::DnsClient,
    errors::WibError,
    fallible::best_effort,
    geo::GeoClient,
    ip2whois::Ip2WhoisClient,
    models::{DomainResult, DomainWhoisRecord, IpResult},
    rdap::RdapClient,
    request::RequestManager,
    whois::Port43WhoisClient,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// A source of domain registration data, tried in order by [`DomainHandler`].
#[async_trait]
pub trait WhoisSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError>;
}

#[async_trait]
impl WhoisSource for RdapClient {
    fn name(&self) -> &'static str {
        "rdap"
    }

    async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError> {
        RdapClient::fetch(self, domain).await
    }
}

#[async_trait]
impl WhoisSource for Port43WhoisClient {
    fn name(&self) -> &'static str {
        "port43"
    }

    async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError> {
        Port43WhoisClient::fetch(self, domain).await
    }
}

#[async_trait]
impl WhoisSource for Ip2WhoisClient {
    fn name(&self) -> &'static str {
        "ip2whois"
    }

    async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError> {
        Ip2WhoisClient::fetch(self, domain).await
    }
}

pub struct IpAddressHandler {
    geo: GeoClient,
}

impl IpAddressHandler {
    pub fn new(config: &Config, requests: Arc<RequestManager>) -> Self {
        Self {
            geo: GeoClient::new(requests, &config.geo_base_url),
        }
    }

    /// Geolocation is the primary lookup for an IP, so transport failures propagate.
    pub async fn fetch(&self, ip: &str) -> Result<IpResult, WibError> {
        let geo = self.geo.fetch(ip).await?;
        Ok(IpResult {
            ip: ip.to_string(),
            geo,
        })
    }
}

pub struct DomainHandler {
    sources: Vec<Arc<dyn WhoisSource>>,
    dns: DnsClient,
}

impl DomainHandler {
    /// RDAP, then port 43, then IP2WHOIS when an API key is configured.
    pub fn new(config: &Config, requests: Arc<RequestManager>) -> Self {
        let mut sources: Vec<Arc<dyn WhoisSource>> = vec![
            Arc::new(RdapClient::new(requests.clone(), &config.rdap_base_url)),
            Arc::new(Port43WhoisClient::new(config)),
        ];
        if let Some(key) = config.ip2whois_api_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Arc::new(Ip2WhoisClient::new(
                requests.clone(),
                &config.ip2whois_url,
                key,
            )));
        }

        Self::with_sources(sources, DnsClient::new(requests, &config.doh_url))
    }

    pub fn with_sources(sources: Vec<Arc<dyn WhoisSource>>, dns: DnsClient) -> Self {
        Self { sources, dns }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Never fails: a domain no source knows about simply has no whois record.
    pub async fn fetch(&self, domain: &str, include_dns: bool) -> DomainResult {
        let whois = self.resolve_whois(domain).await;

        let dns = if include_dns {
            best_effort("dns", self.dns.fetch(domain)).await
        } else {
            None
        };

        DomainResult {
            domain: domain.to_string(),
            whois,
            dns,
        }
    }

    async fn resolve_whois(&self, domain: &str) -> Option<DomainWhoisRecord> {
        for source in &self.sources {
            if let Some(record) = best_effort(source.name(), source.fetch(domain)).await {
                info!("Whois data for {} from {}", domain, source.name());
                return Some(record);
            }
        }
        debug!("No whois source had data for {}", domain);
        None
    }
}

//! # wib
//!
//! Passive reconnaissance lookups for IP addresses and domain names.
//!
//! ## Features
//!
//! - Input normalization for defanged indicators, URLs and bracketed IPv6 literals
//! - IP geolocation and ASN data
//! - Domain registration data: RDAP first, port 43 WHOIS second, IP2WHOIS last
//! - Optional DNS records over HTTPS
//! - Shared HTTP layer with per-host limits, an in-process cache and retries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wib::{Config, LookupResult, WibClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WibClient::new(Arc::new(Config::load()?))?;
//!
//!     if let LookupResult::Domain(result) = client.lookup("example[.]com").await? {
//!         println!("Registrar: {:?}", result.whois.and_then(|w| w.registrar));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dns;
pub mod errors;
pub mod fallible;
pub mod geo;
pub mod handlers;
pub mod host;
pub mod ip2whois;
pub mod models;
pub mod output;
pub mod parser;
pub mod rdap;
pub mod request;
pub mod whois;

// Re-export main types for easy access
pub use config::Config;
pub use errors::WibError;
pub use host::{normalize, HostInput, HostKind};
pub use models::{DomainResult, IpResult, LookupResult};
pub use output::{render, OutputFormat};

use futures::stream::{self, StreamExt};
use handlers::{DomainHandler, IpAddressHandler};
use request::{RequestManager, RequestSettings};
use std::sync::Arc;
use tracing::{info, warn};

/// One client per run. Every lookup shares the same Request Manager, so the
/// response cache and per-host limits span all entities.
pub struct WibClient {
    config: Arc<Config>,
    ip: IpAddressHandler,
    domain: DomainHandler,
}

impl WibClient {
    pub fn new(config: Arc<Config>) -> Result<Self, WibError> {
        let requests = Arc::new(RequestManager::new(RequestSettings::from_config(&config))?);
        Ok(Self {
            ip: IpAddressHandler::new(&config, requests.clone()),
            domain: DomainHandler::new(&config, requests),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Normalize one raw entity and resolve it.
    pub async fn lookup(&self, raw: &str) -> Result<LookupResult, WibError> {
        let host = normalize(raw)?;
        self.resolve(&host).await
    }

    pub async fn resolve(&self, host: &HostInput) -> Result<LookupResult, WibError> {
        info!("Looking up {} {}", host.kind, host.normalized);

        match host.kind {
            HostKind::Ip => Ok(LookupResult::Ip(self.ip.fetch(&host.normalized).await?)),
            HostKind::Domain => Ok(LookupResult::Domain(
                self.domain
                    .fetch(&host.normalized, self.config.include_dns)
                    .await,
            )),
        }
    }

    /// Resolve every entity, keeping input order.
    ///
    /// Every input is normalized before any network call, so one malformed
    /// entity fails the whole batch. After that each entity gets its own
    /// outcome: a failed lookup does not discard the others. At most
    /// `max_concurrent_lookups` entities are in flight.
    pub async fn lookup_all<S: AsRef<str>>(
        &self,
        entities: &[S],
    ) -> Result<Vec<EntityOutcome>, WibError> {
        let hosts = entities
            .iter()
            .map(|entity| normalize(entity.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let fan_out = self.config.max_concurrent_lookups.max(1);
        let outcomes = stream::iter(hosts)
            .map(|host| async move {
                let result = self.resolve(&host).await;
                if let Err(e) = &result {
                    warn!("Lookup of {} failed: {}", host.normalized, e);
                }
                EntityOutcome { host, result }
            })
            .buffered(fan_out)
            .collect()
            .await;
        Ok(outcomes)
    }
}

/// The result of resolving one normalized entity.
#[derive(Debug)]
pub struct EntityOutcome {
    pub host: HostInput,
    pub result: Result<LookupResult, WibError>,
}

impl EntityOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

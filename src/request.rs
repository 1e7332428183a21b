//! Shared HTTP transport for every HTTP-based service client.
//!
//! One [`RequestManager`] lives for the whole run. It bounds concurrent
//! requests per remote host, caches successful responses, and retries
//! transport failures with exponential backoff and jitter.

use crate::{
    cache::{RequestKey, ResponseCache},
    config::Config,
    errors::WibError,
};
use serde::de::DeserializeOwned;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};

const BACKOFF_BASE_SECONDS: f64 = 0.2;
const BACKOFF_CAP_SECONDS: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct RequestSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
    pub per_host_limit: usize,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RequestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            user_agent: config.user_agent.clone(),
            per_host_limit: config.per_host_limit.max(1),
        }
    }
}

/// A fully-read HTTP response. Cheap enough to clone out of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, WibError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// `min(cap, base * 2^attempt) * jitter`, jitter uniform in `[0.5, 1.0)`.
pub fn compute_backoff(attempt: u32) -> Duration {
    let exp = (BACKOFF_BASE_SECONDS * 2f64.powi(attempt.min(30) as i32)).min(BACKOFF_CAP_SECONDS);
    let jitter = 0.5 + rand::random::<f64>() * 0.5;
    Duration::from_secs_f64(exp * jitter)
}

pub struct RequestManager {
    settings: RequestSettings,
    client: reqwest::Client,
    host_limits: Arc<RwLock<HashMap<String, Arc<Semaphore>>>>,
    cache: ResponseCache,
}

impl RequestManager {
    pub fn new(settings: RequestSettings) -> Result<Self, WibError> {
        // Redirects are followed by reqwest's default policy.
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .gzip(true)
            .build()?;

        Ok(Self {
            settings,
            client,
            host_limits: Arc::new(RwLock::new(HashMap::new())),
            cache: ResponseCache::new(),
        })
    }

    pub fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// GET `url` with optional query parameters.
    ///
    /// Non-200 statuses are returned as-is. Transport failures are retried up to
    /// `max_retries` extra times; the last one is returned once retries run out.
    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse, WibError> {
        let key = RequestKey::new(url, params);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let host = url::Url::parse(url)
            .map_err(|e| WibError::Internal(format!("Invalid URL '{}': {}", url, e)))?
            .host_str()
            .unwrap_or_default()
            .to_string();

        let semaphore = self.host_semaphore(&host).await;
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| WibError::Internal("Semaphore error".to_string()))?;

        let mut attempt = 0;
        loop {
            match self.send_once(url, params).await {
                Ok(response) => {
                    self.cache.set(key, &response).await;
                    return Ok(response);
                }
                Err(e) if e.is_transport() && attempt < self.settings.max_retries => {
                    let delay = compute_backoff(attempt);
                    warn!("Request to {} failed ({}), retrying in {:?}", host, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse, WibError> {
        let mut request = self.client.get(url).timeout(self.settings.timeout);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        {
            let limits = self.host_limits.read().await;
            if let Some(semaphore) = limits.get(host) {
                return semaphore.clone();
            }
        }

        let mut limits = self.host_limits.write().await;
        limits
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.settings.per_host_limit)))
            .clone()
    }
}

use crate::request::HttpResponse;
use moka::future::Cache;
use tracing::debug;

/// Cache key: the request URL plus its serialized query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub url: String,
    pub params: String,
}

impl RequestKey {
    pub fn new(url: &str, params: &[(&str, &str)]) -> Self {
        let params = if params.is_empty() {
            String::new()
        } else {
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish()
        };

        Self {
            url: url.to_string(),
            params,
        }
    }
}

/// In-process response cache scoped to one request manager.
///
/// Entries have no time-to-live and no capacity bound: a response cached
/// during a run is served for the rest of that run.
pub struct ResponseCache {
    cache: Cache<RequestKey, HttpResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    pub async fn get(&self, key: &RequestKey) -> Option<HttpResponse> {
        match self.cache.get(key).await {
            Some(response) => {
                debug!("Cache hit for {}", key.url);
                Some(response)
            }
            None => {
                debug!("Cache miss for {}", key.url);
                None
            }
        }
    }

    /// Only successful responses are stored.
    pub async fn set(&self, key: RequestKey, response: &HttpResponse) {
        if !response.is_ok() {
            return;
        }
        debug!("Cached response for {}", key.url);
        self.cache.insert(key, response.clone()).await;
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

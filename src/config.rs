use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_TIMEOUT_SECONDS: f64 = 10.0;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_PER_HOST_LIMIT: usize = 5;
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1024 * 1024;

const DEFAULT_GEO_URL: &str = "https://ipwho.is/";
const DEFAULT_RDAP_URL: &str = "https://rdap.org/";
const DEFAULT_DOH_URL: &str = "https://dns.google/resolve";
const DEFAULT_IP2WHOIS_URL: &str = "https://api.ip2whois.com/v2";
const DEFAULT_WHOIS_BOOTSTRAP: &str = "whois.iana.org";
const DEFAULT_WHOIS_PORT: u16 = 43;

/// Environment variable to config key.
const ENV_OVERRIDES: [(&str, &str); 15] = [
    ("WIB_TIMEOUT", "timeout_seconds"),
    ("WIB_TIMEOUT_SECONDS", "timeout_seconds"),
    ("WIB_MAX_RETRIES", "max_retries"),
    ("WIB_PER_HOST_LIMIT", "per_host_limit"),
    ("WIB_DNS", "include_dns"),
    ("WIB_CONCURRENCY", "max_concurrent_lookups"),
    ("WIB_MAX_RESPONSE_SIZE", "max_response_size"),
    ("WIB_USER_AGENT", "user_agent"),
    ("WIB_GEO_URL", "geo_base_url"),
    ("WIB_RDAP_URL", "rdap_base_url"),
    ("WIB_DOH_URL", "doh_url"),
    ("WIB_IP2WHOIS_URL", "ip2whois_url"),
    ("WIB_WHOIS_BOOTSTRAP", "whois_bootstrap_server"),
    ("WIB_WHOIS_PORT", "whois_port"),
    ("IP2WHOIS_API_KEY", "ip2whois_api_key"),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub timeout_seconds: f64,
    pub max_retries: u32,
    pub per_host_limit: usize,
    pub include_dns: bool,
    pub max_concurrent_lookups: usize,
    pub max_response_size: usize,
    pub user_agent: String,
    pub geo_base_url: String,
    pub rdap_base_url: String,
    pub doh_url: String,
    pub ip2whois_url: String,
    pub whois_bootstrap_server: String,
    pub whois_port: u16,
    pub ip2whois_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub timeout_seconds: f64,
    pub max_retries: u32,
    pub per_host_limit: usize,
    pub include_dns: bool,
    pub max_concurrent_lookups: usize,
    pub max_response_size: usize,
    pub user_agent: String,
    pub geo_base_url: String,
    pub rdap_base_url: String,
    pub doh_url: String,
    pub ip2whois_url: String,
    pub whois_bootstrap_server: String,
    pub whois_port: u16,
    #[serde(default)]
    pub ip2whois_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            per_host_limit: DEFAULT_PER_HOST_LIMIT,
            include_dns: false,
            max_concurrent_lookups: 1,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            user_agent: default_user_agent(),
            geo_base_url: DEFAULT_GEO_URL.to_string(),
            rdap_base_url: DEFAULT_RDAP_URL.to_string(),
            doh_url: DEFAULT_DOH_URL.to_string(),
            ip2whois_url: DEFAULT_IP2WHOIS_URL.to_string(),
            whois_bootstrap_server: DEFAULT_WHOIS_BOOTSTRAP.to_string(),
            whois_port: DEFAULT_WHOIS_PORT,
            ip2whois_api_key: None,
        }
    }
}

impl Config {
    /// Load defaults, the env file and environment overrides, in that order of precedence (lowest first).
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_env_file();

        let defaults = Config::default();
        let mut settings = config::Config::builder()
            .set_default("timeout_seconds", defaults.timeout_seconds)?
            .set_default("max_retries", defaults.max_retries as i64)?
            .set_default("per_host_limit", defaults.per_host_limit as i64)?
            .set_default("include_dns", defaults.include_dns)?
            .set_default("max_concurrent_lookups", defaults.max_concurrent_lookups as i64)?
            .set_default("max_response_size", defaults.max_response_size as i64)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("geo_base_url", defaults.geo_base_url)?
            .set_default("rdap_base_url", defaults.rdap_base_url)?
            .set_default("doh_url", defaults.doh_url)?
            .set_default("ip2whois_url", defaults.ip2whois_url)?
            .set_default("whois_bootstrap_server", defaults.whois_bootstrap_server)?
            .set_default("whois_port", defaults.whois_port as i64)?;

        settings = Self::apply_env_overrides(settings)?;

        let data: ConfigData = settings.build()?.try_deserialize()?;

        let config = Config {
            timeout_seconds: data.timeout_seconds,
            max_retries: data.max_retries,
            per_host_limit: data.per_host_limit.max(1),
            include_dns: data.include_dns,
            max_concurrent_lookups: data.max_concurrent_lookups.max(1),
            max_response_size: data.max_response_size,
            user_agent: data.user_agent,
            geo_base_url: data.geo_base_url,
            rdap_base_url: data.rdap_base_url,
            doh_url: data.doh_url,
            ip2whois_url: data.ip2whois_url,
            whois_bootstrap_server: data.whois_bootstrap_server,
            whois_port: data.whois_port,
            ip2whois_api_key: data.ip2whois_api_key.filter(|k| !k.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot be turned into runtime values.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let seconds = self.timeout_seconds;
        if !(seconds > 0.0) || Duration::try_from_secs_f64(seconds).is_err() {
            return Err(config::ConfigError::Message(format!(
                "timeout must be a positive number of seconds, got {}",
                seconds
            )));
        }
        Ok(())
    }

    /// Values rejected by [`Config::validate`] fall back to the default timeout.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS))
    }

    fn env_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("WIB_ENV_FILE") {
            return Some(PathBuf::from(path));
        }
        std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".env.wib"))
    }

    // dotenvy never overwrites variables already present in the process environment.
    fn load_env_file() {
        if let Some(path) = Self::env_file_path() {
            match dotenvy::from_path(&path) {
                Ok(()) => debug!("Loaded env file {}", path.display()),
                Err(e) => debug!("No env file loaded from {}: {}", path.display(), e),
            }
        }
    }

    fn apply_env_overrides(mut settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        for (env_var, config_key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}

fn default_user_agent() -> String {
    format!("wib/{}", env!("CARGO_PKG_VERSION"))
}

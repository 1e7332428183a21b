use thiserror::Error;

#[derive(Error, Debug)]
pub enum WibError {
    #[error("Input does not look like an IP or domain: {0}")]
    InvalidHost(String),

    #[error("Network timeout")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] tokio::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WibError {
    /// Timeouts and connection-level failures, the only errors worth retrying.
    pub fn is_transport(&self) -> bool {
        match self {
            WibError::Timeout | WibError::IoError(_) => true,
            WibError::HttpError(e) => !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }

    /// Errors the binary reports as a one-line message rather than a failure trace.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, WibError::InvalidHost(_) | WibError::ConfigError(_)) || self.is_transport()
    }
}

impl From<tokio::time::error::Elapsed> for WibError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        WibError::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(WibError::Timeout.is_transport());
        assert!(WibError::IoError(std::io::ErrorKind::ConnectionRefused.into()).is_transport());
        assert!(!WibError::InvalidHost("nope".to_string()).is_transport());
        assert!(!WibError::Internal("boom".to_string()).is_transport());
    }

    #[test]
    fn test_invalid_host_message() {
        let err = WibError::InvalidHost("not a host".to_string());
        assert_eq!(err.to_string(), "Input does not look like an IP or domain: not a host");
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_config_error_is_user_visible() {
        let err = WibError::from(config::ConfigError::Message("timeout must be positive".to_string()));
        assert!(err.is_user_visible());
        assert!(!err.is_transport());
        assert!(!WibError::Internal("boom".to_string()).is_user_visible());
    }
}

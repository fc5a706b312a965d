//! HTTP client configuration.

use std::time::Duration;

/// Configuration for the default [`ReqwestTransport`](crate::transport::ReqwestTransport).
///
/// Timeouts live here and not in the connection controller: the controller
/// has no timers of its own.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Time allowed to establish the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Total request timeout. `None` keeps long-lived streams open.
    pub request_timeout: Option<Duration>,
    /// `User-Agent` header value.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: Some(concat!("hpx-eventsource/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the total request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("Request timeout must be > 0".to_string());
        }
        if self.user_agent.as_deref().is_some_and(str::is_empty) {
            return Err("User agent cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.request_timeout.is_none());
        assert!(
            config
                .user_agent
                .as_deref()
                .is_some_and(|ua| ua.starts_with("hpx-eventsource/"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::new()
            .connect_timeout(Duration::from_secs(3))
            .request_timeout(Some(Duration::from_secs(60)))
            .user_agent(None);

        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(60)));
        assert!(config.user_agent.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_connect_timeout() {
        let result = ClientConfig::new().connect_timeout(Duration::ZERO).validate();
        assert_eq!(result.expect_err("should fail"), "Connect timeout must be > 0");
    }

    #[test]
    fn test_validation_zero_request_timeout() {
        let result = ClientConfig::new()
            .request_timeout(Some(Duration::ZERO))
            .validate();
        assert_eq!(result.expect_err("should fail"), "Request timeout must be > 0");
    }

    #[test]
    fn test_validation_empty_user_agent() {
        let result = ClientConfig::new()
            .user_agent(Some(String::new()))
            .validate();
        assert_eq!(result.expect_err("should fail"), "User agent cannot be empty");
    }
}

//! Session configuration and start options.

use std::time::Duration;

use nls_protocol::StartParams;
use nls_transport::{DEFAULT_URL, TransportConfig};
use secrecy::{ExposeSecret, SecretString};

use crate::error::TranscriberError;

/// Default period of the liveness probe.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_millis(6000);

/// Connection parameters for a [`Transcriber`](crate::Transcriber).
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Gateway WebSocket URL
    pub url: String,
    /// Application key placed in every request header
    pub app_key: String,
    /// Access token, obtained out of band
    pub token: SecretString,
    /// Upper bound on connection establishment
    pub connect_timeout: Duration,
    /// Buffered events per subscriber before slow subscribers start lagging
    pub event_capacity: usize,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            app_key: String::new(),
            token: SecretString::from(String::new()),
            connect_timeout: Duration::from_secs(10),
            event_capacity: 256,
        }
    }
}

impl TranscriberConfig {
    pub fn new(app_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            token: SecretString::from(token.into()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Build from `NLS_URL`, `NLS_APP_KEY` and `NLS_TOKEN`. A missing URL
    /// falls back to the public gateway; missing credentials are left empty
    /// and rejected by [`validate`](Self::validate).
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("NLS_APP_KEY").unwrap_or_default(),
            std::env::var("NLS_TOKEN").unwrap_or_default(),
        );
        if let Ok(url) = std::env::var("NLS_URL") {
            config.url = url;
        }
        config
    }

    /// Reject configurations that cannot possibly open a session.
    pub fn validate(&self) -> Result<(), TranscriberError> {
        if self.url.trim().is_empty() {
            return Err(TranscriberError::InvalidConfig("url must not be empty".into()));
        }
        if self.app_key.trim().is_empty() {
            return Err(TranscriberError::InvalidConfig("app key must not be empty".into()));
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(TranscriberError::InvalidConfig(
                "token must not be empty; obtain one from the token service first".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(TranscriberError::InvalidConfig("event capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            url: self.url.clone(),
            token: self.token.clone(),
            connect_timeout: self.connect_timeout,
        }
    }
}

/// Options for a single [`start`](crate::Transcriber::start) call.
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    pub params: StartParams,
    /// Liveness probe period, or `None` to disable the probe
    pub liveness: Option<Duration>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            params: StartParams::default(),
            liveness: Some(DEFAULT_LIVENESS_INTERVAL),
        }
    }
}

impl StartOptions {
    pub fn new(params: StartParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn without_liveness(mut self) -> Self {
        self.liveness = None;
        self
    }

    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness = Some(interval);
        self
    }
}

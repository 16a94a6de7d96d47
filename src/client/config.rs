use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TERMINATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Login and shutdown policy, fixed at client construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    lazy_login: bool,
    #[serde(rename = "termination_timeout_ms", with = "duration_ms")]
    termination_timeout: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            lazy_login: false,
            termination_timeout: DEFAULT_TERMINATION_TIMEOUT,
        }
    }
}

impl LoginConfig {
    /// Eager login, 10 second termination timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer login to first use when the session has no token at start.
    pub fn with_lazy_login(mut self, lazy: bool) -> Self {
        self.lazy_login = lazy;
        self
    }

    /// Upper bound `stop()` waits for in-flight requests.
    pub fn with_termination_timeout(mut self, timeout: Duration) -> Self {
        self.termination_timeout = timeout;
        self
    }

    pub fn lazy_login(&self) -> bool {
        self.lazy_login
    }

    pub fn termination_timeout(&self) -> Duration {
        self.termination_timeout
    }

    /// Apply `REST_CLIENT_LAZY_LOGIN` and `REST_CLIENT_TERMINATION_TIMEOUT_MS` on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("REST_CLIENT_LAZY_LOGIN") {
            self.lazy_login = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(ms) = std::env::var("REST_CLIENT_TERMINATION_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.termination_timeout = Duration::from_millis(ms);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.termination_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "termination timeout must be positive",
                ErrorContext::new()
                    .with_field_path("login.termination_timeout")
                    .with_source("login_config"),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

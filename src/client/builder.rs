use crate::client::config::LoginConfig;
use crate::client::core::RestClient;
use crate::client::hooks::{BearerHooks, ClientHooks};
use crate::session::Session;
use crate::transport::{HttpTransport, Transport};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Builder for creating clients with custom configuration.
///
/// Only the session is mandatory. Unset login options fall back to
/// `REST_CLIENT_LAZY_LOGIN` / `REST_CLIENT_TERMINATION_TIMEOUT_MS`, then to
/// [`LoginConfig::default`]; the transport defaults to [`HttpTransport::from_env`].
pub struct RestClientBuilder {
    session: Option<Arc<dyn Session>>,
    transport: Option<Arc<dyn Transport>>,
    hooks: Arc<dyn ClientHooks>,
    login_config: Option<LoginConfig>,
    lazy_login: Option<bool>,
    termination_timeout: Option<Duration>,
    worker_runtime: Option<Handle>,
}

impl RestClientBuilder {
    pub fn new() -> Self {
        Self {
            session: None,
            transport: None,
            hooks: Arc::new(BearerHooks),
            login_config: None,
            lazy_login: None,
            termination_timeout: None,
            worker_runtime: None,
        }
    }

    pub fn session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the default [`BearerHooks`].
    pub fn hooks(mut self, hooks: Arc<dyn ClientHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Start from a complete login config; environment overrides are skipped.
    pub fn login_config(mut self, config: LoginConfig) -> Self {
        self.login_config = Some(config);
        self
    }

    pub fn lazy_login(mut self, lazy: bool) -> Self {
        self.lazy_login = Some(lazy);
        self
    }

    pub fn termination_timeout(mut self, timeout: Duration) -> Self {
        self.termination_timeout = Some(timeout);
        self
    }

    /// Run request completions on `handle` instead of the runtime calling `start()`.
    pub fn worker_runtime(mut self, handle: Handle) -> Self {
        self.worker_runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<RestClient> {
        let session = self.session.ok_or_else(|| {
            Error::configuration_with_context(
                "a session is required",
                ErrorContext::new()
                    .with_field_path("session")
                    .with_source("client_builder"),
            )
        })?;

        let mut config = match self.login_config {
            Some(cfg) => cfg,
            None => LoginConfig::default().with_env_overrides(),
        };
        if let Some(lazy) = self.lazy_login {
            config = config.with_lazy_login(lazy);
        }
        if let Some(timeout) = self.termination_timeout {
            config = config.with_termination_timeout(timeout);
        }

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::from_env()));

        RestClient::with_parts(session, transport, self.hooks, config, self.worker_runtime)
    }
}

impl Default for RestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

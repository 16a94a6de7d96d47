use super::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::headers::HeaderFields;
use async_trait::async_trait;
use reqwest::Proxy;
use std::env;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Connection pool tunables for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
        }
    }
}

impl HttpTransportConfig {
    /// Defaults, overridden by `REST_HTTP_*` / `REST_PROXY_URL` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env::var("REST_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            pool_max_idle_per_host: env::var("REST_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: env::var("REST_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
            proxy_url: env::var("REST_PROXY_URL").ok(),
        }
    }
}

/// reqwest-backed transport. The connection pool exists between `open` and `close`.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: RwLock<Option<reqwest::Client>>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self::new(HttpTransportConfig::from_env())
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(self.config.pool_idle_timeout));

        if let Some(proxy_url) = &self.config.proxy_url {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| TransportError::Other(format!("invalid proxy url: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(TransportError::Http)
    }

    fn current_client(&self) -> Result<reqwest::Client, TransportError> {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(TransportError::Closed)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(HttpTransportConfig::default())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn open(&self) -> Result<(), TransportError> {
        let client = self.build_client()?;
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = Some(client);
        debug!(
            timeout_ms = self.config.timeout.as_millis() as u64,
            pool_max_idle_per_host = self.config.pool_max_idle_per_host,
            "http transport opened"
        );
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.current_client()?;

        let mut req = client.request(request.method, request.url);
        for (name, value) in request.headers.iter() {
            req = req.header(name, value);
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = HeaderFields::from(resp.headers());
        let body = resp.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&self) -> Result<(), TransportError> {
        // Dropping the last handle tears the pool down; in-flight sends keep their clone.
        let previous = self.client.write().unwrap_or_else(|e| e.into_inner()).take();
        if previous.is_some() {
            debug!("http transport closed");
        }
        Ok(())
    }
}

//! Transport boundary between the lifecycle manager and the network.
//!
//! The client only needs to hand a request over, await its outcome and read the
//! response headers as an ordered multimap. [`HttpTransport`] is the reqwest
//! implementation; tests inject their own [`Transport`].

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig};

use crate::headers::HeaderFields;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// Outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderFields,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderFields::new(),
            body: None,
        }
    }

    /// Parse `url` and build a request.
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| {
            crate::Error::configuration_with_context(
                format!("invalid request url: {}", e),
                crate::ErrorContext::new()
                    .with_details(url.to_string())
                    .with_source("http_request"),
            )
        })?;
        Ok(Self::new(method, url))
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::parse(Method::GET, url)
    }

    pub fn post(url: &str) -> Result<Self> {
        Self::parse(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Append every value of the forwarded headers (see [`crate::headers::determine_headers`]).
    pub fn forwarded_headers(mut self, headers: &HashMap<String, Vec<String>>) -> Self {
        for (name, values) in headers {
            for value in values {
                self.headers.add(name.clone(), value.clone());
            }
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)?;
        self.headers.add("Content-Type", "application/json");
        self.body = Some(Bytes::from(body));
        Ok(self)
    }
}

/// Response as seen by the client, fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderFields,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderFields::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Underlying HTTP transport.
///
/// `open` and `close` bracket one started period of the client and are called at
/// most once each per period; `send` is only called between them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Allocate connection resources.
    fn open(&self) -> std::result::Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;

    /// Release connection resources. Requests still running may fail afterwards.
    fn close(&self) -> std::result::Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_collects_headers() {
        let forwarded: HashMap<String, Vec<String>> = [(
            "Sforce-Call-Options".to_string(),
            vec!["client=a".to_string(), "defaultNamespace=b".to_string()],
        )]
        .into_iter()
        .collect();

        let req = HttpRequest::get("https://example.my.salesforce.com/services/data/v58.0/limits")
            .unwrap()
            .header("Accept", "application/json")
            .forwarded_headers(&forwarded);

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.headers.len(), 3);
        assert_eq!(
            req.headers.get_all("sforce-call-options").collect::<Vec<_>>(),
            vec!["client=a", "defaultNamespace=b"]
        );
    }

    #[test]
    fn test_request_json_body() {
        let req = HttpRequest::post("https://example.com/sobjects/Account")
            .unwrap()
            .json(&serde_json::json!({"Name": "Acme"}))
            .unwrap();
        assert_eq!(req.headers.get("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&br#"{"Name":"Acme"}"#[..]));
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let err = HttpRequest::get("not a url").unwrap_err();
        assert!(matches!(err, crate::Error::Configuration { .. }));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(204).is_success());
        assert!(!HttpResponse::new(301).is_success());
        assert!(!HttpResponse::new(401).is_success());
    }
}

//! # rest-client-base
//!
//! Lifecycle-managed client for authenticated REST APIs.
//!
//! ## Overview
//!
//! [`RestClient`] owns the parts of an API client that are independent of any
//! particular endpoint: when to log in, how outstanding requests are tracked, and
//! how shutdown waits for them.
//!
//! - **Login policy**: on `start()` an unauthenticated [`Session`] is logged in
//!   eagerly, or left alone when `lazy_login` is set.
//! - **In-flight tracking**: every dispatched request is registered before it is
//!   sent and deregistered as the first thing its completion does.
//! - **Bounded shutdown**: `stop()` waits for in-flight requests until they drain
//!   or the termination timeout elapses, then releases the transport once.
//! - **Header extraction**: [`headers`] forwards the vendor header families on the
//!   way out and flattens every response header on the way back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rest_client_base::{HttpRequest, RestClientBuilder, StaticTokenSession};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> rest_client_base::Result<()> {
//!     let client = RestClientBuilder::new()
//!         .session(Arc::new(StaticTokenSession::new("00D...token")))
//!         .termination_timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     client.start().await?;
//!     let completion = client
//!         .send(HttpRequest::get("https://example.my.salesforce.com/services/data/")?)
//!         .await?;
//!     println!("{:?} {:?}", completion.status, completion.headers);
//!     client.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Lifecycle manager, in-flight tracker, hooks and builder |
//! | [`headers`] | Outbound/inbound header extraction |
//! | [`session`] | Session capability and token type |
//! | [`transport`] | Transport boundary and the reqwest implementation |

pub mod client;
pub mod headers;
pub mod session;
pub mod transport;

pub use client::{
    BearerHooks, ClientHooks, ClientState, Completion, LoginConfig, RequestId, RestClient,
    RestClientBuilder, ShutdownReport, SignalsSnapshot,
};
pub use headers::{determine_headers, determine_headers_from, HeaderFields, HeaderValue, MessageHeaders};
pub use session::{AuthError, Session, StaticTokenSession, Token};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

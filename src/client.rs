//! Lifecycle-managed REST client.
//!
//! Keep the public surface small: build a [`RestClient`], `start()` it, dispatch
//! with `do_http_request` / `send`, and `stop()` it. Implementation details are
//! split into submodules under `src/client/`.

pub mod builder;
pub mod config;
pub mod core;
pub mod hooks;
pub mod inflight;
pub mod signals;
mod worker;

pub use builder::RestClientBuilder;
pub use config::LoginConfig;
pub use self::core::{ClientState, Completion, RestClient, ShutdownReport};
pub use hooks::{BearerHooks, ClientHooks};
pub use inflight::{InFlightGuard, InFlightTracker, InflightSnapshot, PendingRequest, RequestId};
pub use signals::SignalsSnapshot;

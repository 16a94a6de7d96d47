use crate::client::config::LoginConfig;
use crate::client::hooks::{BearerHooks, ClientHooks};
use crate::client::inflight::{InFlightTracker, RequestId};
use crate::client::signals::SignalsSnapshot;
use crate::client::worker::WorkerPool;
use crate::headers::determine_headers_from;
use crate::session::Session;
use crate::transport::{HttpRequest, Transport};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`RestClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Created,
    Started,
    Stopping,
    Stopped,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClientState::Created => "created",
            ClientState::Started => "started",
            ClientState::Stopping => "stopping",
            ClientState::Stopped => "stopped",
        })
    }
}

/// Outcome of one request, handed to its completion handler.
#[derive(Debug)]
pub struct Completion {
    pub request_id: RequestId,
    /// `None` when no response was received.
    pub status: Option<u16>,
    /// Every response header, flattened (see [`determine_headers_from`]).
    pub headers: HashMap<String, String>,
    pub result: Result<Bytes>,
}

/// What `stop()` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReport {
    /// The client was not running; nothing to release.
    NotRunning,
    /// Every in-flight request completed before the timeout.
    Drained { elapsed: Duration },
    /// The termination timeout elapsed; `abandoned` requests were left running.
    TimedOut { elapsed: Duration, abandoned: usize },
}

/// Resources that exist only while the client is started.
struct Active {
    tracker: Arc<InFlightTracker>,
    workers: WorkerPool,
}

struct Inner {
    state: ClientState,
    active: Option<Active>,
}

/// Authenticated REST client with a start/stop lifecycle.
///
/// Requests are only accepted while started. `stop()` waits for outstanding
/// requests up to the configured termination timeout, then releases the
/// transport and worker pool exactly once. A stopped client can be started again.
pub struct RestClient {
    session: Arc<dyn Session>,
    transport: Arc<dyn Transport>,
    hooks: Arc<dyn ClientHooks>,
    config: LoginConfig,
    worker_runtime: Option<Handle>,
    lifecycle: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
}

impl RestClient {
    /// Client with [`BearerHooks`] running completions on the caller's runtime.
    pub fn new(
        session: Arc<dyn Session>,
        transport: Arc<dyn Transport>,
        config: LoginConfig,
    ) -> Result<Self> {
        Self::with_parts(session, transport, Arc::new(BearerHooks), config, None)
    }

    pub(crate) fn with_parts(
        session: Arc<dyn Session>,
        transport: Arc<dyn Transport>,
        hooks: Arc<dyn ClientHooks>,
        config: LoginConfig,
        worker_runtime: Option<Handle>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session,
            transport,
            hooks,
            config,
            worker_runtime,
            lifecycle: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                state: ClientState::Created,
                active: None,
            }),
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ClientState {
        self.lock_inner().state
    }

    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    pub fn signals(&self) -> SignalsSnapshot {
        let inner = self.lock_inner();
        SignalsSnapshot {
            state: inner.state,
            inflight: inner.active.as_ref().map(|a| a.tracker.snapshot()),
        }
    }

    /// Authenticate per the login policy and allocate transport resources.
    ///
    /// Fails with [`Error::InvalidState`] when a `stop()` is draining. A failed
    /// start leaves the state unchanged, so it can be retried.
    pub async fn start(&self) -> Result<()> {
        if self.state() == ClientState::Stopping {
            return Err(Error::InvalidState {
                operation: "start",
                state: ClientState::Stopping,
            });
        }
        // stop() holds the lifecycle lock until it reaches Stopped, so the
        // state seen below is never Stopping.
        let _lifecycle = self.lifecycle.lock().await;

        if self.state() == ClientState::Started {
            debug!("client already started");
            return Ok(());
        }

        if self.session.access_token().is_some() {
            debug!("session already authenticated");
        } else if self.config.lazy_login() {
            debug!("no access token, login deferred to first use");
        } else {
            // Startup login never passes the current token.
            self.session.login(None).await?;
            info!("logged in during start");
        }

        let workers = WorkerPool::new(self.worker_runtime.clone())?;
        self.transport.open()?;

        let mut inner = self.lock_inner();
        inner.active = Some(Active {
            tracker: Arc::new(InFlightTracker::new()),
            workers,
        });
        inner.state = ClientState::Started;
        info!(
            lazy_login = self.config.lazy_login(),
            termination_timeout_ms = self.config.termination_timeout().as_millis() as u64,
            "rest client started"
        );
        Ok(())
    }

    /// Dispatch `request`; `handler` runs on the worker pool once the transport answers.
    ///
    /// Fails synchronously only when the client is not started. Transport and
    /// remote failures are delivered through `handler`.
    pub fn do_http_request<F>(&self, mut request: HttpRequest, handler: F) -> Result<RequestId>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        // Session and hooks run outside the state lock; they may call back into the client.
        let token = self.session.access_token();
        self.hooks.attach_credential(&mut request, token.as_ref());

        let (guard, workers) = {
            let inner = self.lock_inner();
            let active = match (&inner.active, inner.state) {
                (Some(active), ClientState::Started) => active,
                (_, state) => return Err(Error::ClientClosed { state }),
            };

            // Registered under the state lock: a concurrent stop() either rejects
            // this request or waits for it.
            let guard = active
                .tracker
                .register(request.method.as_str(), request.url.as_str());
            (guard, active.workers.clone())
        };

        let request_id = guard.id();
        let transport = Arc::clone(&self.transport);
        let hooks = Arc::clone(&self.hooks);
        debug!(
            request_id = %request_id,
            method = request.method.as_str(),
            url = request.url.as_str(),
            "dispatching request"
        );

        workers.spawn(async move {
            let start = Instant::now();
            let outcome = transport.send(request).await;
            if !guard.complete() {
                debug!(request_id = %request_id, "completion after shutdown gave up on request");
            }

            let completion = match outcome {
                Ok(response) => {
                    let headers = determine_headers_from(&response.headers);
                    let result = if response.is_success() {
                        Ok(response.body.clone())
                    } else {
                        Err(hooks.translate_error(&response))
                    };
                    debug!(
                        request_id = %request_id,
                        http_status = response.status,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "request completed"
                    );
                    Completion {
                        request_id,
                        status: Some(response.status),
                        headers,
                        result,
                    }
                }
                Err(e) => {
                    debug!(
                        request_id = %request_id,
                        error = %e,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "request failed in transport"
                    );
                    Completion {
                        request_id,
                        status: None,
                        headers: HashMap::new(),
                        result: Err(Error::Transport(e)),
                    }
                }
            };

            handler(completion);
        });

        Ok(request_id)
    }

    /// Dispatch `request` and await its completion.
    pub async fn send(&self, request: HttpRequest) -> Result<Completion> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let request_id = self.do_http_request(request, move |completion| {
            let _ = tx.send(completion);
        })?;
        rx.await.map_err(|_| {
            Error::runtime_with_context(
                "request task ended without completing",
                ErrorContext::new()
                    .with_details(request_id.to_string())
                    .with_source("rest_client"),
            )
        })
    }

    /// Stop accepting requests, wait for in-flight ones up to the termination
    /// timeout, then release resources. Calling it again is a no-op.
    ///
    /// Dropping the returned future while it drains abandons the remaining
    /// requests and still releases resources, leaving the client Stopped.
    pub async fn stop(&self) -> ShutdownReport {
        let _lifecycle = self.lifecycle.lock().await;

        let active = {
            let mut inner = self.lock_inner();
            if inner.state != ClientState::Started {
                debug!(state = %inner.state, "stop ignored, client not running");
                return ShutdownReport::NotRunning;
            }
            inner.state = ClientState::Stopping;
            inner.active.take()
        };

        let start = Instant::now();
        let tracker = active.as_ref().map(|a| Arc::clone(&a.tracker));
        let mut teardown = Teardown {
            client: self,
            active,
            released: false,
        };

        let drained = match tracker {
            Some(tracker) => {
                tracker
                    .await_drain(self.config.termination_timeout())
                    .await
            }
            None => true,
        };

        let abandoned = teardown.release();
        let report = if drained {
            ShutdownReport::Drained {
                elapsed: start.elapsed(),
            }
        } else {
            ShutdownReport::TimedOut {
                elapsed: start.elapsed(),
                abandoned,
            }
        };
        info!(report = ?report, "rest client stopped");
        report
    }
}

/// Releases a stopping client's resources exactly once, on completion or on drop.
struct Teardown<'a> {
    client: &'a RestClient,
    active: Option<Active>,
    released: bool,
}

impl Teardown<'_> {
    /// Abandon what is still in flight, close the transport and the worker pool,
    /// and mark the client Stopped. Returns the number of abandoned requests.
    fn release(&mut self) -> usize {
        self.released = true;
        let mut abandoned = 0;
        if let Some(active) = self.active.take() {
            let pending = active.tracker.abandon_all();
            for p in &pending {
                warn!(
                    request_id = %p.id,
                    method = p.method.as_str(),
                    url = p.url.as_str(),
                    age_ms = p.age().as_millis() as u64,
                    "abandoning in-flight request at shutdown"
                );
            }
            abandoned = pending.len();

            if let Err(e) = self.client.transport.close() {
                warn!(error = %e, "failed to close transport");
            }
            let running = active.workers.shutdown();
            if running > 0 {
                debug!(running, "worker pool closed with tasks still running");
            }
        }
        self.client.lock_inner().state = ClientState::Stopped;
        abandoned
    }
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!("stop cancelled while draining, releasing resources now");
            self.release();
        }
    }
}

//! Test doubles for the session and transport boundaries.

#![allow(dead_code)]

use async_trait::async_trait;
use rest_client_base::{
    AuthError, HttpRequest, HttpResponse, LoginConfig, RestClient, Session, Token, Transport,
    TransportError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Session whose token and login outcome are set by the test.
#[derive(Default)]
pub struct MockSession {
    token: Mutex<Option<Token>>,
    login_result: Mutex<Option<Result<Token, AuthError>>>,
    login_args: Mutex<Vec<Option<Token>>>,
}

impl MockSession {
    pub fn with_token(token: &str) -> Arc<Self> {
        let session = Self::default();
        session.set_token(Some(token));
        Arc::new(session)
    }

    pub fn without_token() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(Token::new);
    }

    pub fn fail_login_with(&self, err: AuthError) {
        *self.login_result.lock().unwrap() = Some(Err(err));
    }

    pub fn login_calls(&self) -> Vec<Option<Token>> {
        self.login_args.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for MockSession {
    fn access_token(&self) -> Option<Token> {
        self.token.lock().unwrap().clone()
    }

    async fn login(&self, current: Option<Token>) -> Result<Token, AuthError> {
        self.login_args.lock().unwrap().push(current);
        match self.login_result.lock().unwrap().clone() {
            Some(result) => result,
            None => Ok(Token::new("fresh-token")),
        }
    }
}

/// A request the transport has received and is waiting to answer.
pub struct PendingCall {
    pub request: HttpRequest,
    reply: oneshot::Sender<Result<HttpResponse, TransportError>>,
}

impl PendingCall {
    pub fn respond(self, response: HttpResponse) {
        let _ = self.reply.send(Ok(response));
    }

    pub fn fail(self, err: TransportError) {
        let _ = self.reply.send(Err(err));
    }
}

/// Transport that hands every request to the test and waits for its answer.
///
/// A request whose [`PendingCall`] is dropped never completes.
pub struct ScriptedTransport {
    calls: mpsc::UnboundedSender<PendingCall>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls,
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn open(&self) -> Result<(), TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.calls.send(PendingCall { request, reply });
        match rx.await {
            Ok(result) => result,
            Err(_) => std::future::pending().await,
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn config(lazy_login: bool) -> LoginConfig {
    LoginConfig::new()
        .with_lazy_login(lazy_login)
        .with_termination_timeout(Duration::from_secs(1))
}

pub fn client(session: Arc<MockSession>, transport: Arc<ScriptedTransport>) -> RestClient {
    RestClient::new(session, transport, config(false)).unwrap()
}

pub fn request() -> HttpRequest {
    HttpRequest::get("https://example.my.salesforce.com/services/data/v58.0/limits").unwrap()
}

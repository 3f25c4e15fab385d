//! Connection lifecycle for a single backend.
//!
//! A [`BackendClient`] owns one connection handle and moves through
//! `Uninitialized -> Connecting -> Ready -> (Failed -> Connecting)* -> Exhausted`.
//! Nothing is dialled until the first [`BackendClient::call`].
//!
//! Reconnects are serialized by a mutex taken with `try_lock`: a caller that
//! finds another reconnect in flight fails fast with
//! [`BackendError::Unavailable`] instead of queueing behind it. Calls against a
//! `Ready` handle run concurrently.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::RetryPolicy;
use crate::errors::BackendError;

/// Establishes connections to one kind of backend.
///
/// Implementations report missing inputs as [`BackendError::Configuration`]
/// and handshake failures as [`BackendError::Connection`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The live connection handed to operations.
    type Handle: Send + Sync + 'static;

    /// Backend name used in errors and logs.
    fn backend(&self) -> &'static str;

    /// Open a connection and verify it with a handshake.
    async fn connect(&self) -> Result<Self::Handle, BackendError>;
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Uninitialized,
    Connecting,
    Ready,
    Failed,
    Exhausted,
}

enum State<H> {
    Uninitialized,
    Connecting,
    Ready(Arc<H>),
    Failed,
    Exhausted,
}

struct Inner<H> {
    state: State<H>,
    attempts: u32,
    last_error: Option<String>,
}

/// Holds one lazily-established connection and bounds retries against it.
pub struct BackendClient<C: Connector> {
    connector: C,
    policy: RetryPolicy,
    inner: RwLock<Inner<C::Handle>>,
    reconnect: Mutex<()>,
}

impl<C: Connector> BackendClient<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            inner: RwLock::new(Inner {
                state: State::Uninitialized,
                attempts: 0,
                last_error: None,
            }),
            reconnect: Mutex::new(()),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn status(&self) -> ConnectionStatus {
        match self.inner.read().await.state {
            State::Uninitialized => ConnectionStatus::Uninitialized,
            State::Connecting => ConnectionStatus::Connecting,
            State::Ready(_) => ConnectionStatus::Ready,
            State::Failed => ConnectionStatus::Failed,
            State::Exhausted => ConnectionStatus::Exhausted,
        }
    }

    /// Consecutive failed attempts since the last success.
    pub async fn attempts(&self) -> u32 {
        self.inner.read().await.attempts
    }

    /// Drop the connection and the attempt count, leaving an exhausted client
    /// usable again.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.state = State::Uninitialized;
        inner.attempts = 0;
        inner.last_error = None;
        info!(backend = self.connector.backend(), "Backend client reset");
    }

    /// Run `operation` against a live connection.
    ///
    /// Retryable failures of either the handshake or the operation mark the
    /// connection failed, sleep for the backoff and reconnect. Once the retry
    /// budget is spent the client is exhausted and every call returns
    /// [`BackendError::Unavailable`] until [`reset`](Self::reset).
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, BackendError>
    where
        F: Fn(Arc<C::Handle>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, BackendError>> + Send,
        T: Send,
    {
        loop {
            let handle = self.acquire().await?;
            match operation(handle.clone()).await {
                Ok(value) => {
                    self.record_success().await;
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => self.record_failure(&e, Some(&handle)).await?,
                Err(e) => return Err(e),
            }
        }
    }

    async fn ready_handle(&self) -> Result<Option<Arc<C::Handle>>, BackendError> {
        let inner = self.inner.read().await;
        match &inner.state {
            State::Ready(handle) => Ok(Some(handle.clone())),
            State::Exhausted => Err(self.unavailable(&inner, None)),
            _ => Ok(None),
        }
    }

    async fn acquire(&self) -> Result<Arc<C::Handle>, BackendError> {
        if let Some(handle) = self.ready_handle().await? {
            return Ok(handle);
        }

        let _guard = match self.reconnect.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let inner = self.inner.read().await;
                return Err(self.unavailable(&inner, Some("reconnect in progress")));
            }
        };

        loop {
            if let Some(handle) = self.ready_handle().await? {
                return Ok(handle);
            }

            self.inner.write().await.state = State::Connecting;

            match self.connector.connect().await {
                Ok(handle) => {
                    let handle = Arc::new(handle);
                    self.inner.write().await.state = State::Ready(handle.clone());
                    info!(backend = self.connector.backend(), "Backend connection established");
                    return Ok(handle);
                }
                Err(e) if e.is_retryable() => self.record_failure(&e, None).await?,
                Err(e) => {
                    self.inner.write().await.state = State::Uninitialized;
                    error!(
                        backend = self.connector.backend(),
                        error = %e,
                        "Backend connection cannot be configured"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn record_success(&self) {
        if self.inner.read().await.attempts == 0 {
            return;
        }
        let mut inner = self.inner.write().await;
        inner.attempts = 0;
        inner.last_error = None;
    }

    /// Count a failed attempt. Sleeps for the backoff unless the budget is
    /// spent, in which case the client becomes exhausted.
    ///
    /// A call failure carries the handle it ran on. Only the first failure
    /// on the current handle counts; failures on a handle that has already
    /// been marked failed or replaced go straight back to `acquire`.
    async fn record_failure(
        &self,
        failure: &BackendError,
        used: Option<&Arc<C::Handle>>,
    ) -> Result<(), BackendError> {
        let attempts = {
            let mut inner = self.inner.write().await;
            if let Some(used) = used {
                let current = matches!(&inner.state, State::Ready(handle) if Arc::ptr_eq(handle, used));
                if !current {
                    debug!(
                        backend = self.connector.backend(),
                        error = %failure,
                        "Call failed on a stale connection"
                    );
                    return Ok(());
                }
            }
            inner.attempts += 1;
            inner.last_error = Some(failure.to_string());
            if inner.attempts >= self.policy.max_attempts {
                inner.state = State::Exhausted;
                error!(
                    backend = self.connector.backend(),
                    attempts = inner.attempts,
                    error = %failure,
                    "Backend retry budget exhausted"
                );
                return Err(self.unavailable(&inner, None));
            }
            inner.state = State::Failed;
            inner.attempts
        };

        warn!(
            backend = self.connector.backend(),
            attempt = attempts,
            max_attempts = self.policy.max_attempts,
            backoff_ms = self.policy.backoff.as_millis() as u64,
            error = %failure,
            "Backend call failed, retrying"
        );
        tokio::time::sleep(self.policy.backoff).await;
        Ok(())
    }

    fn unavailable(&self, inner: &Inner<C::Handle>, reason: Option<&str>) -> BackendError {
        let last_error = reason
            .map(str::to_string)
            .or_else(|| inner.last_error.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        BackendError::Unavailable {
            backend: self.connector.backend(),
            attempts: inner.attempts,
            last_error,
        }
    }
}

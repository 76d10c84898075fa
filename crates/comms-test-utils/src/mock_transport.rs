//! Scripted HTTP client transport.
//!
//! `MockTransport` is a tower service standing in for a real HTTP client
//! at the bottom of a `RecordingLayer` stack. Each instance answers every
//! call the same way and counts the calls it saw.
//!
//! ```rust,ignore
//! let transport = MockTransport::responding(200).with_delay(Duration::from_millis(250));
//! let client = ServiceBuilder::new()
//!     .layer(RecordingLayer::new(telemetry))
//!     .service(transport.clone());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tower::Service;

/// Transport-level failure produced by [`MockTransport::failing`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockTransportError {
    #[error("connection refused")]
    ConnectionRefused,
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
enum Outcome {
    Status(u16),
    Fail(MockTransportError),
}

/// Tower service with a fixed outcome and optional latency.
#[derive(Debug, Clone)]
pub struct MockTransport {
    outcome: Outcome,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Every call returns a response with `status`.
    #[must_use]
    pub fn responding(status: u16) -> Self {
        Self {
            outcome: Outcome::Status(status),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call fails without a response.
    #[must_use]
    pub fn failing(error: MockTransportError) -> Self {
        Self {
            outcome: Outcome::Fail(error),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Settle each call only after `delay` (use with paused tokio time).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls seen by this transport and its clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<B> Service<http::Request<B>> for MockTransport {
    type Response = http::Response<()>;
    type Error = MockTransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: http::Request<B>) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match outcome {
                Outcome::Status(status) => {
                    let mut response = http::Response::new(());
                    *response.status_mut() = http::StatusCode::from_u16(status)
                        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
                    Ok(response)
                }
                Outcome::Fail(error) => Err(error),
            }
        })
    }
}

/// GET request for `uri` with an empty body.
#[must_use]
pub fn get_request(uri: &str) -> http::Request<()> {
    http::Request::builder()
        .uri(uri)
        .body(())
        .expect("test URI should be valid")
}

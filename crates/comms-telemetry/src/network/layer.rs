//! Tower layer that records outbound HTTP calls.
//!
//! Wrap any client service with [`RecordingLayer`] at composition time:
//!
//! ```rust,ignore
//! let client = tower::ServiceBuilder::new()
//!     .layer(RecordingLayer::new(telemetry.clone()))
//!     .service(transport);
//! ```
//!
//! The policy is evaluated before the inner call; the outcome is recorded
//! when the inner future settles, so concurrent calls land in the buffer in
//! completion order. The inner response or error is passed through
//! unchanged.

use super::recorder::NetworkRequestReport;
use crate::collector::CommsTelemetry;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::{Layer, Service};

/// Requests whose target URL can be resolved before sending.
pub trait RequestTarget {
    fn target_url(&self) -> String;
}

impl<B> RequestTarget for http::Request<B> {
    fn target_url(&self) -> String {
        self.uri().to_string()
    }
}

impl RequestTarget for reqwest::Request {
    fn target_url(&self) -> String {
        self.url().to_string()
    }
}

impl RequestTarget for String {
    fn target_url(&self) -> String {
        self.clone()
    }
}

/// Responses that carry an HTTP status.
pub trait ResponseStatus {
    fn status_code(&self) -> u16;
}

impl<B> ResponseStatus for http::Response<B> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl ResponseStatus for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Layer producing [`RecordingService`].
#[derive(Clone)]
pub struct RecordingLayer {
    telemetry: Arc<dyn CommsTelemetry>,
}

impl RecordingLayer {
    pub fn new(telemetry: Arc<dyn CommsTelemetry>) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for RecordingLayer {
    type Service = RecordingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecordingService {
            inner,
            telemetry: Arc::clone(&self.telemetry),
        }
    }
}

/// Service wrapper measuring and recording each call.
#[derive(Clone)]
pub struct RecordingService<S> {
    inner: S,
    telemetry: Arc<dyn CommsTelemetry>,
}

impl<S, Req> Service<Req> for RecordingService<S>
where
    Req: RequestTarget,
    S: Service<Req>,
    S::Response: ResponseStatus + Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let start = Instant::now();
        let url = req.target_url();
        let telemetry = self
            .telemetry
            .should_record_request(&url)
            .then(|| Arc::clone(&self.telemetry));

        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;

            if let Some(telemetry) = telemetry {
                let duration_ms = elapsed_ms(start);
                let report = match &result {
                    Ok(response) => {
                        NetworkRequestReport::completed(url, response.status_code(), duration_ms)
                    }
                    Err(e) => {
                        NetworkRequestReport::transport_failure(url, e.to_string(), duration_ms)
                    }
                };
                telemetry.record_network_request(report);
            }

            result
        })
    }
}

/// Whole milliseconds since `start`, saturating.
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl<S: fmt::Debug> fmt::Debug for RecordingService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RecordingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingLayer")
            .field("noop", &self.telemetry.is_noop())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::config::Config;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    fn telemetry() -> Arc<Collector> {
        Collector::shared(&Config::default())
    }

    #[tokio::test]
    async fn test_records_critical_call() {
        let collector = telemetry();
        let service = ServiceBuilder::new()
            .layer(RecordingLayer::new(collector.clone()))
            .service(service_fn(|_req: http::Request<()>| async {
                Ok::<_, Infallible>(
                    http::Response::builder().status(503).body(()).unwrap(),
                )
            }));

        let request = http::Request::builder()
            .uri("https://fn.example.com/getLiveKitRoomStatus?room=ops&token=abc")
            .body(())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), 503);

        let records = collector.network().all();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].sanitized_url,
            "https://fn.example.com/getLiveKitRoomStatus"
        );
        assert_eq!(records[0].status_code, 503);
    }

    #[tokio::test]
    async fn test_skips_non_critical_call_unless_verbose() {
        let collector = telemetry();
        let service = ServiceBuilder::new()
            .layer(RecordingLayer::new(collector.clone()))
            .service(service_fn(|_url: String| async {
                Ok::<_, Infallible>(http::Response::new(()))
            }));

        service
            .clone()
            .oneshot("https://api.example.com/members".to_string())
            .await
            .unwrap();
        assert!(collector.network().all().is_empty());

        collector.set_verbose_requests(true);
        service
            .oneshot("https://api.example.com/members".to_string())
            .await
            .unwrap();
        assert_eq!(collector.network().all().len(), 1);
    }

    #[tokio::test]
    async fn test_error_passes_through_and_records_status_zero() {
        let collector = telemetry();
        let service = RecordingLayer::new(collector.clone()).layer(service_fn(
            |_req: http::Request<()>| async {
                Err::<http::Response<()>, _>("connection refused".to_string())
            },
        ));

        let request = http::Request::builder()
            .uri("https://fn.example.com/generateLiveKitToken")
            .body(())
            .unwrap();
        let err = service.oneshot(request).await.unwrap_err();
        assert_eq!(err, "connection refused");

        let records = collector.network().all();
        assert_eq!(records[0].status_code, 0);
        assert_eq!(records[0].error_message.as_deref(), Some("connection refused"));
    }
}

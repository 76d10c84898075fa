//! Recording wrapper around `reqwest::Client`.
//!
//! For call sites that use reqwest directly rather than a tower stack. The
//! wrapped client keeps its own timeouts; the recorded duration is the
//! wall-clock time until `execute` settles.

use super::layer::elapsed_ms;
use super::recorder::NetworkRequestReport;
use crate::collector::CommsTelemetry;
use reqwest::{Client, Request, Response};
use std::sync::Arc;
use tokio::time::Instant;

/// `reqwest::Client` that reports each call to the collector.
#[derive(Clone, Debug)]
pub struct RecordingClient {
    client: Client,
    telemetry: Arc<dyn CommsTelemetry>,
}

impl RecordingClient {
    pub fn new(client: Client, telemetry: Arc<dyn CommsTelemetry>) -> Self {
        Self { client, telemetry }
    }

    /// The wrapped client, for building requests.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send a built request, recording the outcome when the policy allows.
    ///
    /// # Errors
    ///
    /// Returns the client's own error unchanged.
    pub async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        let url = request.url().to_string();
        let record = self.telemetry.should_record_request(&url);
        let start = Instant::now();

        let result = self.client.execute(request).await;

        if record {
            let duration_ms = elapsed_ms(start);
            let report = match &result {
                Ok(response) => {
                    NetworkRequestReport::completed(url, response.status().as_u16(), duration_ms)
                }
                Err(e) => NetworkRequestReport::transport_failure(url, e.to_string(), duration_ms),
            };
            self.telemetry.record_network_request(report);
        }

        result
    }

    /// Convenience `GET`.
    ///
    /// # Errors
    ///
    /// Returns the client's error if the request cannot be built or sent.
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        let request = self.client.get(url).build()?;
        self.execute(request).await
    }
}

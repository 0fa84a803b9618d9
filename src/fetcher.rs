use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;

#[derive(Clone, Default)]
pub struct TelemetryFetcher {
    client: reqwest::Client,
}

impl TelemetryFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch one day of measurements as raw JSON.
    ///
    /// Non-2xx responses become `FetchError::HttpStatus`. A body that is not
    /// JSON is logged here and returned as `FetchError::Decode`.
    #[instrument(skip(self, url))]
    pub async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        debug!("Sending HTTP request to telemetry endpoint");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        debug!("Retrieved response body, size: {} bytes", body.len());

        parse_body(&body).inspect_err(|e| {
            warn!("Invalid JSON format at {}: {}", url, e);
        })
    }
}

fn parse_body(body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
}

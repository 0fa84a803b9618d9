#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Telemetry endpoint returned HTTP {0}")]
    HttpStatus(u16),
    #[error("Failed to decode JSON body: {0}")]
    Decode(String),
}

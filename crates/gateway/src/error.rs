use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scan tooling unavailable: {0}")]
    ScanUnavailable(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

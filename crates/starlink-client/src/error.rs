/// Errors surfaced by the Starlink API client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to authenticate with Starlink API: {0}")]
    Authentication(String),

    #[error("Starlink API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Credentials missing or unusable; detected before any network I/O.
    pub fn not_configured() -> Self {
        ClientError::Config(
            "Starlink Enterprise API credentials not configured".to_string(),
        )
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ClientError::Config(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

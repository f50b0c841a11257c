//! Error types for the sitewatch dashboard

/// Errors that can occur in the sitewatch dashboard
#[derive(Debug, thiserror::Error)]
pub enum SitewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("No developer found")]
    NoDeveloper,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Map error: {0}")]
    Map(String),
}

impl SitewatchError {
    /// HTTP status code carried by this error, if it came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            SitewatchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for sitewatch operations
pub type Result<T> = std::result::Result<T, SitewatchError>;

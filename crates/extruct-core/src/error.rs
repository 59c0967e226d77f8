use thiserror::Error;

/// Application-wide error types for extruct.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (building the client, sending, or reading the body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A syntax extractor failed while running in strict mode.
    #[error("Failed to extract {syntax}: {message}")]
    ExtractionError { syntax: String, message: String },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true if this error came from the transport layer
    /// (the page could not be fetched at all).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors() {
        assert!(AppError::NetworkError("reset".into()).is_transport());
        assert!(AppError::Timeout(30).is_transport());
        assert!(AppError::HttpError("builder".into()).is_transport());
        assert!(
            !AppError::ExtractionError {
                syntax: "json-ld".into(),
                message: "bad json".into(),
            }
            .is_transport()
        );
        assert!(!AppError::ConfigError("zero timeout".into()).is_transport());
    }

    #[test]
    fn test_extraction_error_message() {
        let err = AppError::ExtractionError {
            syntax: "json-ld".into(),
            message: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to extract json-ld: expected value at line 1 column 1"
        );
    }
}

//! Error types for the APISIX provider

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for the APISIX provider
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value rejected at plan time
    #[error("Validation error: {0}")]
    Validation(String),

    /// A field could not be converted between state and API representation
    #[error("Failed to convert field '{field}': {message}")]
    Conversion {
        /// Field name (state attribute or API key)
        field: String,
        /// Error message
        message: String,
    },

    /// Plugin error
    #[error("Plugin error in '{plugin}': {message}")]
    Plugin {
        /// Plugin name
        plugin: String,
        /// Error message
        message: String,
    },

    /// The Admin API answered with a non-success status
    #[error("Admin API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message reported by APISIX
        message: String,
    },

    /// Remote object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Connection level failure talking to the Admin API
    #[error("Transport error: {0}")]
    Transport(String),

    /// Admin API request timed out
    #[error("Admin API request timed out")]
    Timeout,

    /// Certificate or private key could not be parsed
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// State file error
    #[error("State error: {0}")]
    State(String),

    /// Provider was used before it was configured with an endpoint
    #[error("Provider is not configured: no APISIX endpoint available")]
    NotConfigured,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a conversion error
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Conversion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a plugin error
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create an API error from a status code
    pub fn api(status: http::StatusCode, message: impl Into<String>) -> Self {
        Error::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Whether the remote object is gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short summary used as a diagnostic headline
    pub fn summary(&self) -> &'static str {
        match self {
            Error::Config(_) => "Invalid provider configuration",
            Error::Validation(_) => "Invalid attribute value",
            Error::Conversion { .. } => "Unexpected value in API response",
            Error::Plugin { .. } => "Invalid plugin configuration",
            Error::Api { .. } => "Admin API request failed",
            Error::NotFound(_) => "Object not found",
            Error::Transport(_) | Error::Timeout => "Unable to reach the Admin API",
            Error::Certificate(_) => "Invalid certificate",
            Error::State(_) => "State error",
            Error::NotConfigured => "Provider not configured",
            Error::Serialization(_) => "Serialization error",
            Error::Io(_) => "I/O error",
            Error::Internal(_) => "Internal error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_retryable_errors() {
        assert!(Error::Transport("connection refused".to_string()).is_retryable());
        assert!(Error::Timeout.is_retryable());
        assert!(Error::api(StatusCode::BAD_GATEWAY, "bad gateway").is_retryable());
        assert!(!Error::api(StatusCode::BAD_REQUEST, "invalid").is_retryable());
        assert!(!Error::NotFound("routes/1".to_string()).is_retryable());
    }

    #[test]
    fn test_plugin_error() {
        let err = Error::plugin("http-logger", "uri is required");
        assert!(matches!(err, Error::Plugin { .. }));
        assert!(err.to_string().contains("http-logger"));
    }

    #[test]
    fn test_api_error_message() {
        let err = Error::api(StatusCode::BAD_REQUEST, "invalid configuration: property \"uri\" is required");
        assert_eq!(
            err.to_string(),
            "Admin API returned 400: invalid configuration: property \"uri\" is required"
        );
        assert_eq!(err.summary(), "Admin API request failed");
    }

    #[test]
    fn test_not_found() {
        assert!(Error::NotFound("routes/42".to_string()).is_not_found());
        assert!(!Error::NotConfigured.is_not_found());
    }
}

//! Error types for octoauth

use thiserror::Error;

/// Result type alias for octoauth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in octoauth
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Incomplete configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Authorization failed: {}", describe_provider(.error, .description))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("State mismatch: expected {expected}, got {}", .received.as_deref().unwrap_or("nothing"))]
    StateMismatch {
        expected: String,
        received: Option<String>,
    },

    #[error("Profile exchange failed: {0}")]
    Exchange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

fn describe_provider(error: &str, description: &Option<String>) -> String {
    match description {
        Some(d) => format!("{} - {}", error, d),
        None => error.to_string(),
    }
}

impl Error {
    /// Whether the error is meant to be shown to the user rather than absorbed
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Error::ConfigurationMissing(_) | Error::Provider { .. } | Error::StateMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_message() {
        let err = Error::Provider {
            error: "access_denied".to_string(),
            description: Some("User denied".to_string()),
        };
        assert_eq!(err.to_string(), "Authorization failed: access_denied - User denied");

        let bare = Error::Provider {
            error: "access_denied".to_string(),
            description: None,
        };
        assert_eq!(bare.to_string(), "Authorization failed: access_denied");
    }

    #[test]
    fn test_visibility() {
        assert!(Error::ConfigurationMissing("client id".to_string()).is_user_visible());
        assert!(!Error::Exchange("timeout".to_string()).is_user_visible());
    }
}

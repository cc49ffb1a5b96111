use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Resource not found")]
    NotFound,

    #[error("Authentication failed")]
    Auth,

    #[error("Token exchange failed (HTTP {status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Transient failures worth retrying; everything else is terminal.
    /// Poll loops and the client retry layer share this classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited | ApiError::ServiceUnavailable | ApiError::Timeout(_) => true,
            ApiError::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::ServiceUnavailable.is_retryable());
        assert!(ApiError::Timeout(30).is_retryable());

        assert!(!ApiError::NotFound.is_retryable());
        assert!(!ApiError::Auth.is_retryable());
        assert!(!ApiError::Api {
            status: 400,
            message: "bad request".to_string()
        }
        .is_retryable());
        assert!(!ApiError::Config("missing endpoint".to_string()).is_retryable());
    }

    #[test]
    fn api_error_formatting_includes_status_and_body() {
        let err = ApiError::Api {
            status: 409,
            message: r#"{"message":"cluster already exists"}"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("HTTP 409"));
        assert!(text.contains("cluster already exists"));
    }
}

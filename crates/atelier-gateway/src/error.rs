//! # Gateway Error Types
//!
//! Error types for generation, persistence and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Gateway Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Payload             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RequestFailed  │  │  DeserializationFailed  │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  HttpStatus (4xx)       │ │
//! │  │  ConfigLoad/Save│  │  HttpStatus(5xx)│  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │     Domain      │  │   Lifecycle     │                              │
//! │  │                 │  │                 │                              │
//! │  │  Specification  │  │  Cancelled      │                              │
//! │  │  Pricing        │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use atelier_core::{PricingError, SpecificationError};
use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error type covering every boundary failure.
///
/// ## Design Principles
/// - Each variant carries enough context for debugging
/// - Errors are categorized for retry decisions ([`GatewayError::is_retryable`])
/// - `Clone`, so one in-flight generation result can be handed to every
///   caller that joined it
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid gateway configuration.
    #[error("Invalid gateway configuration: {0}")]
    InvalidConfig(String),

    /// Invalid service URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request could not be sent or the connection dropped.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// A single attempt exceeded its deadline.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// The service answered with a non-success status.
    #[error("Service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Response body did not match the expected shape.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// The code failed to parse or validate.
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    /// Tier or supplement selection was rejected.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// The request was aborted before it completed.
    #[error("Request cancelled")]
    Cancelled,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return GatewayError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        if err.is_decode() {
            return GatewayError::DeserializationFailed(err.to_string());
        }
        if err.is_builder() {
            return GatewayError::InvalidUrl(err.to_string());
        }
        GatewayError::RequestFailed(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::DeserializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        GatewayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for GatewayError {
    fn from(err: toml::ser::Error) -> Self {
        GatewayError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl GatewayError {
    /// Returns true if the operation can be retried.
    ///
    /// ## Retryable Errors
    /// - Connection failures (network issues)
    /// - Timeouts
    /// - Server-side statuses (5xx) and 429
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Client statuses (4xx other than 429)
    /// - Malformed responses
    /// - Invalid specifications and pricing inputs
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::RequestFailed(_) | GatewayError::Timeout(_) => true,
            GatewayError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidConfig(_)
                | GatewayError::InvalidUrl(_)
                | GatewayError::ConfigLoadFailed(_)
                | GatewayError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(GatewayError::RequestFailed("connection reset".into()).is_retryable());
        assert!(GatewayError::Timeout(30).is_retryable());
        assert!(GatewayError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(GatewayError::HttpStatus {
            status: 429,
            body: String::new()
        }
        .is_retryable());

        assert!(!GatewayError::HttpStatus {
            status: 422,
            body: String::new()
        }
        .is_retryable());
        assert!(!GatewayError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!GatewayError::DeserializationFailed("eof".into()).is_retryable());
        assert!(!GatewayError::Cancelled.is_retryable());
    }

    #[test]
    fn test_specification_errors_pass_through() {
        let err: GatewayError = atelier_core::check("M1(1000,400,1000)E").unwrap_err().into();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("required flag 'b' is missing"));
    }

    #[test]
    fn test_config_errors() {
        assert!(GatewayError::InvalidUrl("nope".into()).is_config_error());
        assert!(!GatewayError::Timeout(1).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::HttpStatus {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Service returned HTTP 502: bad gateway");
    }
}

use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum HodlError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Brokerage error: {error} ({message})")]
    Brokerage { error: String, message: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Input errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    // Lookup errors
    #[error("Portfolio not found: {0}")]
    PortfolioNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Order execution errors
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: f64, requested: f64 },

    // Crypto/signing errors
    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // Persistence errors
    #[error("State not found: {0}")]
    StateNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    // Execution tracking
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl HodlError {
    /// Errors caused by the caller's input; never retried.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HodlError::Validation(_)
                | HodlError::UnsupportedStrategy(_)
                | HodlError::InsufficientFunds { .. }
        )
    }

    /// Errors raised because something the request refers to does not exist.
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            HodlError::PortfolioNotFound(_)
                | HodlError::ProductNotFound(_)
                | HodlError::MarketDataUnavailable(_)
                | HodlError::ExecutionNotFound(_)
        )
    }

    /// Errors returned by, or while talking to, the brokerage.
    pub fn is_external_error(&self) -> bool {
        matches!(
            self,
            HodlError::Http(_)
                | HodlError::Brokerage { .. }
                | HodlError::InvalidMarketData(_)
                | HodlError::OrderRejected(_)
                | HodlError::OrderSubmission(_)
        )
    }
}

/// Result type alias for HodlError
pub type Result<T> = std::result::Result<T, HodlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_is_disjoint_for_common_variants() {
        let input = HodlError::Validation("bad body".into());
        assert!(input.is_input_error());
        assert!(!input.is_lookup_error());
        assert!(!input.is_external_error());

        let lookup = HodlError::PortfolioNotFound("test".into());
        assert!(lookup.is_lookup_error());
        assert!(!lookup.is_input_error());

        let external = HodlError::Brokerage {
            error: "INVALID_ARGUMENT".into(),
            message: "bad product".into(),
        };
        assert!(external.is_external_error());
        assert!(!external.is_lookup_error());
    }

    #[test]
    fn brokerage_error_display_includes_message() {
        let err = HodlError::Brokerage {
            error: "PERMISSION_DENIED".into(),
            message: "key lacks trade scope".into(),
        };
        assert_eq!(
            err.to_string(),
            "Brokerage error: PERMISSION_DENIED (key lacks trade scope)"
        );
    }
}

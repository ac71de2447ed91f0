//! Error types for the Razorpay client

use boxoffice_core::error::GatewayError;
use thiserror::Error;

/// Errors that can occur when talking to Razorpay
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// A credential environment variable is missing
    #[error("Missing {0} environment variable")]
    MissingCredentials(&'static str),

    /// HTTP client could not be built
    #[error("Client setup failed: {0}")]
    ClientSetup(String),

    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - invalid key id or secret
    #[error("Unauthorized - invalid key id or secret")]
    Unauthorized,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
}

impl From<RazorpayError> for GatewayError {
    fn from(err: RazorpayError) -> Self {
        match err {
            RazorpayError::RequestFailed(_) | RazorpayError::RateLimited => {
                Self::Unavailable(err.to_string())
            }
            RazorpayError::ApiError { status, message } if status >= 500 => {
                Self::Unavailable(format!("status {status}: {message}"))
            }
            RazorpayError::ApiError { status, message } => Self::Rejected { status, message },
            RazorpayError::MissingCredentials(_)
            | RazorpayError::ClientSetup(_)
            | RazorpayError::Unauthorized => Self::Misconfigured(err.to_string()),
            RazorpayError::ResponseParseFailed(_) => Self::Rejected {
                status: 200,
                message: err.to_string(),
            },
        }
    }
}

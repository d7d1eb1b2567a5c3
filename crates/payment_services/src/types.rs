use std::time::Duration;

use campground::BookingError;
use serde::Deserialize;

/// Errors talking to the payment processor.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The request never got a response.
    #[error("Payment processor unreachable: {0}")]
    Transport(String),

    /// The request timed out; the charge may or may not exist.
    #[error("Payment processor timed out")]
    Timeout,

    /// The processor rejected the request.
    #[error("Payment processor returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Processor's error message
        message: String,
    },

    /// The processor answered with something we could not read.
    #[error("Unexpected payment processor response: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    /// Whether a confirm that failed this way may still have captured funds
    pub fn leaves_charge_unknown(&self) -> bool {
        match self {
            PaymentError::Transport(_) | PaymentError::Timeout => true,
            PaymentError::Api { status, .. } => *status >= 500,
            PaymentError::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            PaymentError::Timeout
        } else if error.is_decode() {
            PaymentError::InvalidResponse(error.to_string())
        } else {
            PaymentError::Transport(error.to_string())
        }
    }
}

impl From<PaymentError> for BookingError {
    fn from(error: PaymentError) -> Self {
        match error {
            PaymentError::Transport(_) | PaymentError::Timeout => {
                BookingError::Unavailable(error.to_string())
            }
            PaymentError::Api { status, .. } if status == 429 || status >= 500 => {
                BookingError::Unavailable(error.to_string())
            }
            PaymentError::Api { .. } | PaymentError::InvalidResponse(_) => {
                BookingError::PaymentFailed(error.to_string())
            }
        }
    }
}

/// Stripe error envelope: `{"error": {"message": ..., "code": ...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<StripeIntentRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeIntentRef {
    pub id: String,
}

/// Stripe connection settings
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` or `sk_test_...`)
    pub secret_key: String,
    /// API root (default: `https://api.stripe.com/v1`)
    pub api_base: String,
    /// Per-request timeout (default: 30 seconds)
    pub timeout: Duration,
}

impl StripeConfig {
    /// Reads `STRIPE_SECRET_KEY`, `STRIPE_API_BASE` and `PAYMENT_TIMEOUT_SECS`.
    /// Returns `None` when no secret key is configured.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())?;

        let api_base = std::env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());

        let timeout_secs = std::env::var("PAYMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Some(Self {
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

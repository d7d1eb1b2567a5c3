use serde::Serialize;

/// Custom error type for booking operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Unknown site type, site, extra service or reservation
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that did not match
        id: String,
    },

    /// Input rejected before any side effect took place
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Reservation data or a collaborator could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Payment was declined or errored before any funds moved
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Payment was captured but the booking could not be recorded
    #[error("Payment {payment_reference} was captured but the booking was not recorded: {reason}")]
    Reconciliation {
        /// Reference of the captured payment
        payment_reference: String,
        /// Why recording the booking failed
        reason: String,
    },

    /// Storage rejected a write because of an overlapping reservation
    #[error("Reservation conflict: {0}")]
    Conflict(String),
}

/// Fieldless view of [`BookingError`], used in session state and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`BookingError::NotFound`]
    NotFound,
    /// See [`BookingError::InvalidArgument`]
    InvalidArgument,
    /// See [`BookingError::Unavailable`]
    Unavailable,
    /// See [`BookingError::PaymentFailed`]
    PaymentFailed,
    /// See [`BookingError::Reconciliation`]
    Reconciliation,
    /// See [`BookingError::Conflict`]
    Conflict,
}

impl ErrorKind {
    /// Stable code used in JSON error bodies
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::PaymentFailed => "payment_failed",
            ErrorKind::Reconciliation => "reconciliation_required",
            ErrorKind::Conflict => "conflict",
        }
    }
}

impl BookingError {
    /// Shorthand for [`BookingError::NotFound`]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`BookingError::InvalidArgument`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        BookingError::InvalidArgument(msg.into())
    }

    /// The kind of this error without its payload
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::NotFound { .. } => ErrorKind::NotFound,
            BookingError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BookingError::Unavailable(_) => ErrorKind::Unavailable,
            BookingError::PaymentFailed(_) => ErrorKind::PaymentFailed,
            BookingError::Reconciliation { .. } => ErrorKind::Reconciliation,
            BookingError::Conflict(_) => ErrorKind::Conflict,
        }
    }

    /// Whether the user may simply try the same action again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::Unavailable(_) | BookingError::PaymentFailed(_)
        )
    }

    /// Whether the error ends the session and must be handed to staff
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingError::Reconciliation { .. } | BookingError::Conflict(_)
        )
    }
}

impl actix_web::ResponseError for BookingError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            BookingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            BookingError::Reconciliation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        use actix_web::HttpResponse;

        let code = self.kind().code();
        let retryable = self.is_retryable();

        match self {
            BookingError::Reconciliation {
                payment_reference, ..
            } => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": code,
                "message": "Your payment was received but the booking could not be saved. Please contact the campground office.",
                "payment_reference": payment_reference,
                "retryable": false
            })),
            BookingError::Conflict(_) => {
                HttpResponse::build(self.status_code()).json(serde_json::json!({
                    "error": code,
                    "message": "Those dates were just taken. Please contact the campground office.",
                    "retryable": false
                }))
            }
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": code,
                "message": self.to_string(),
                "retryable": retryable
            })),
        }
    }
}

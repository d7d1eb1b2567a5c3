//! Seams to the outside world. The core never talks to Stripe, Postgres or AWS
//! directly; it calls these traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;
use crate::reservation::{DateRange, NewReservation, Reservation, ReservationStatus};

/// A payment intent created with the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Secret used to confirm the intent
    pub client_secret: String,
}

/// Result of confirming a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    /// Funds captured
    Succeeded,
    /// Declined, nothing captured
    Failed,
}

/// Outcome of [`PaymentGateway::confirm_capture`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    /// Whether funds were captured
    pub status: CaptureStatus,
    /// Processor reference for the payment
    pub reference: String,
}

/// Payment collaborator
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an intent for `amount_minor_units` of `currency`.
    /// `idempotency_key` lets the processor collapse resubmissions.
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, BookingError>;

    /// Confirms the intent with the card reader's payment method
    async fn confirm_capture(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<CaptureOutcome, BookingError>;
}

/// Persistence collaborator holding the reservation ledger
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Stores a reservation and returns its id
    async fn insert_reservation(&self, reservation: &NewReservation) -> Result<i64, BookingError>;

    /// Reservations of the site type whose stay overlaps `dates`
    async fn query_reservations_overlapping(
        &self,
        site_type_id: &str,
        dates: &DateRange,
    ) -> Result<Vec<Reservation>, BookingError>;

    /// Reservations matching `term` by id, name, email or phone
    async fn search_reservations(&self, term: &str) -> Result<Vec<Reservation>, BookingError>;

    /// Looks up one reservation
    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>, BookingError>;

    /// Moves a reservation to new dates
    async fn update_reservation_dates(
        &self,
        id: i64,
        new_start: NaiveDate,
        new_end: NaiveDate,
    ) -> Result<Reservation, BookingError>;

    /// Changes a reservation's lifecycle status
    async fn update_reservation_status(
        &self,
        id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, BookingError>;

    /// Removes a reservation
    async fn delete_reservation(&self, id: i64) -> Result<(), BookingError>;
}

/// Sends messages to guests
#[async_trait]
pub trait GuestNotifier: Send + Sync {
    /// Delivers a desk verification code to the reservation's contact details
    async fn send_verification_code(
        &self,
        reservation: &Reservation,
        code: &str,
    ) -> Result<(), BookingError>;

    /// Sends the booking confirmation
    async fn send_booking_confirmation(&self, reservation: &Reservation) -> Result<(), BookingError>;
}

/// Creates an intent for `amount` and confirms it, returning the payment
/// reference on capture.
///
/// A decline, or any gateway error other than [`BookingError::Unavailable`],
/// is reported as [`BookingError::PaymentFailed`]. Nothing is retried here.
pub async fn capture_payment(
    gateway: &dyn PaymentGateway,
    amount: rust_decimal::Decimal,
    currency: &str,
    idempotency_key: &str,
    payment_method: &str,
) -> Result<String, BookingError> {
    let amount_minor_units = crate::pricing::to_minor_units(amount)?;
    if amount_minor_units <= 0 {
        return Err(BookingError::invalid("payment amount must be positive"));
    }

    let intent = gateway
        .create_payment_intent(amount_minor_units, currency, Some(idempotency_key))
        .await
        .map_err(as_payment_failure)?;

    let outcome = gateway
        .confirm_capture(&intent.client_secret, payment_method)
        .await
        .map_err(as_payment_failure)?;

    match outcome.status {
        CaptureStatus::Succeeded => {
            tracing::info!(
                "Captured {} {} as payment {}",
                amount,
                currency,
                outcome.reference
            );
            Ok(outcome.reference)
        }
        CaptureStatus::Failed => {
            tracing::warn!("Payment {} was declined", outcome.reference);
            Err(BookingError::PaymentFailed(format!(
                "payment {} was declined",
                outcome.reference
            )))
        }
    }
}

fn as_payment_failure(error: BookingError) -> BookingError {
    match error {
        BookingError::Unavailable(_) | BookingError::PaymentFailed(_) => error,
        other => BookingError::PaymentFailed(other.to_string()),
    }
}

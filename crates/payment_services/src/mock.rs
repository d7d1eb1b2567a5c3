use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use campground::{BookingError, CaptureOutcome, CaptureStatus, PaymentGateway, PaymentIntent};
use uuid::Uuid;

/// Payment method that is always declined, matching Stripe's test card
pub const DECLINED_PAYMENT_METHOD: &str = "pm_card_chargeDeclined";

/// In-process gateway for development and kiosk demos.
///
/// Every intent is approved unless confirmed with [`DECLINED_PAYMENT_METHOD`].
/// Reusing an idempotency key returns the intent created for it the first time.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    intents: Mutex<HashMap<String, String>>,
}

impl MockPaymentGateway {
    /// Creates an empty gateway
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, BookingError> {
        if amount_minor_units <= 0 {
            return Err(BookingError::invalid("amount must be positive"));
        }

        let fresh = || format!("pi_mock_{}", Uuid::new_v4().simple());
        let id = match idempotency_key {
            Some(key) => {
                let mut intents = self.intents.lock().unwrap_or_else(|e| e.into_inner());
                intents.entry(key.to_string()).or_insert_with(fresh).clone()
            }
            None => fresh(),
        };

        log::info!(
            "🧪 Mock intent {} for {} {}",
            id,
            amount_minor_units,
            currency
        );
        Ok(PaymentIntent {
            client_secret: format!("{}_secret_mock", id),
        })
    }

    async fn confirm_capture(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<CaptureOutcome, BookingError> {
        let reference = client_secret
            .split_once("_secret_")
            .map(|(id, _)| id.to_string())
            .ok_or_else(|| BookingError::invalid("malformed client secret"))?;

        let status = if payment_method == DECLINED_PAYMENT_METHOD {
            CaptureStatus::Failed
        } else {
            CaptureStatus::Succeeded
        };
        Ok(CaptureOutcome { status, reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_approves_and_declines() {
        let gateway = MockPaymentGateway::new();
        let intent = gateway
            .create_payment_intent(4000, "NZD", Some("booking-1"))
            .await
            .unwrap();

        let approved = gateway
            .confirm_capture(&intent.client_secret, "pm_card_visa")
            .await
            .unwrap();
        assert_eq!(approved.status, CaptureStatus::Succeeded);
        assert!(approved.reference.starts_with("pi_mock_"));

        let declined = gateway
            .confirm_capture(&intent.client_secret, DECLINED_PAYMENT_METHOD)
            .await
            .unwrap();
        assert_eq!(declined.status, CaptureStatus::Failed);
    }

    #[tokio::test]
    async fn test_mock_reuses_intent_for_same_key() {
        let gateway = MockPaymentGateway::new();
        let first = gateway
            .create_payment_intent(4000, "NZD", Some("booking-1"))
            .await
            .unwrap();
        let again = gateway
            .create_payment_intent(4000, "NZD", Some("booking-1"))
            .await
            .unwrap();
        let other = gateway
            .create_payment_intent(4000, "NZD", None)
            .await
            .unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
    }
}

use async_trait::async_trait;
use campground::{BookingError, CaptureOutcome, CaptureStatus, PaymentGateway, PaymentIntent};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::types::{PaymentError, StripeConfig, StripeErrorBody, StripeErrorDetail};

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
}

/// Payment gateway backed by Stripe payment intents.
///
/// Intents are created with `card` as the only payment method type and confirmed
/// immediately with the method the card reader hands over.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
}

impl StripeGateway {
    /// Builds the HTTP client with the configured timeout
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        log::info!("💳 Stripe gateway configured against {}", config.api_base);
        Ok(Self { client, config })
    }

    /// Intent id embedded in a client secret (`pi_123_secret_abc` -> `pi_123`)
    pub fn intent_id(client_secret: &str) -> Result<&str, PaymentError> {
        client_secret
            .split_once("_secret_")
            .map(|(id, _)| id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::InvalidResponse("malformed client secret".to_string()))
    }

    async fn create_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<StripePaymentIntent, PaymentError> {
        let params = [
            ("amount", amount_minor_units.to_string()),
            ("currency", currency.to_lowercase()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let mut request = self
            .client
            .post(format!("{}/payment_intents", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.secret_key))
            .form(&params);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method: &str,
    ) -> Result<CaptureOutcome, PaymentError> {
        let response = self
            .client
            .post(format!(
                "{}/payment_intents/{}/confirm",
                self.config.api_base, intent_id
            ))
            .header("Authorization", format!("Bearer {}", self.config.secret_key))
            .form(&[("payment_method", payment_method)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let intent: StripePaymentIntent = response.json().await?;
            return Ok(outcome_of(intent));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .map(|parsed| parsed.error);

        if let Some(detail) = &detail {
            // Card declines come back as 402 with a card_error body
            if status == StatusCode::PAYMENT_REQUIRED && detail.kind.as_deref() == Some("card_error")
            {
                log::warn!(
                    "⚠️ Card declined for {}: {}",
                    intent_id,
                    detail.code.as_deref().unwrap_or("unknown")
                );
                let reference = detail
                    .payment_intent
                    .as_ref()
                    .map(|intent| intent.id.clone())
                    .unwrap_or_else(|| intent_id.to_string());
                return Ok(CaptureOutcome {
                    status: CaptureStatus::Failed,
                    reference,
                });
            }

            // A replayed confirm on an intent that has already moved on
            if detail.code.as_deref() == Some("payment_intent_unexpected_state") {
                log::warn!("⚠️ Intent {} is no longer confirmable, reading it back", intent_id);
                let error = error_from_body(status.as_u16(), Some(detail), &body);
                return self.settle(intent_id, error).await;
            }
        }

        let error = error_from_body(status.as_u16(), detail.as_ref(), &body);
        log::error!("❌ Stripe error: {}", error);
        Err(error)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<StripePaymentIntent, PaymentError> {
        let response = self
            .client
            .get(format!("{}/payment_intents/{}", self.config.api_base, intent_id))
            .header("Authorization", format!("Bearer {}", self.config.secret_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Reads back an intent whose confirm gave no usable answer.
    ///
    /// A captured intent is reported as captured and a declined one as failed.
    /// Anything else keeps `error`, so the caller retries with the same intent.
    async fn settle(
        &self,
        intent_id: &str,
        error: PaymentError,
    ) -> Result<CaptureOutcome, PaymentError> {
        let intent = match self.retrieve_intent(intent_id).await {
            Ok(intent) => intent,
            Err(lookup) => {
                log::error!("❌ Could not read back intent {}: {}", intent_id, lookup);
                return Err(error);
            }
        };

        match intent.status.as_str() {
            "succeeded" => {
                log::warn!("⚠️ Intent {} had already been captured", intent.id);
                Ok(outcome_of(intent))
            }
            "requires_payment_method" | "canceled" => Ok(outcome_of(intent)),
            other => {
                log::warn!("⚠️ Intent {} is still {}", intent.id, other);
                Err(error)
            }
        }
    }
}

fn outcome_of(intent: StripePaymentIntent) -> CaptureOutcome {
    let captured = intent.status == "succeeded";
    if !captured {
        log::warn!("⚠️ Payment intent {} ended as {}", intent.id, intent.status);
    }
    CaptureOutcome {
        status: if captured {
            CaptureStatus::Succeeded
        } else {
            CaptureStatus::Failed
        },
        reference: intent.id,
    }
}

fn error_from_body(status: u16, detail: Option<&StripeErrorDetail>, body: &str) -> PaymentError {
    let message = detail
        .and_then(|detail| detail.message.clone())
        .unwrap_or_else(|| body.to_string());
    PaymentError::Api { status, message }
}

async fn api_error(response: Response) -> PaymentError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<StripeErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.error);

    let error = error_from_body(status, detail.as_ref(), &body);
    log::error!("❌ Stripe error: {}", error);
    error
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, BookingError> {
        let intent = self
            .create_intent(amount_minor_units, currency, idempotency_key)
            .await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::InvalidResponse(format!("intent {} has no client secret", intent.id))
        })?;

        log::info!(
            "💳 Created payment intent {} for {} {}",
            intent.id,
            amount_minor_units,
            currency
        );
        Ok(PaymentIntent { client_secret })
    }

    async fn confirm_capture(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<CaptureOutcome, BookingError> {
        let intent_id = Self::intent_id(client_secret)?;
        match self.confirm_intent(intent_id, payment_method).await {
            // The confirm may have reached Stripe even though no answer came back
            Err(error) if error.leaves_charge_unknown() => {
                Ok(self.settle(intent_id, error).await?)
            }
            result => Ok(result?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_id_from_client_secret() {
        assert_eq!(
            StripeGateway::intent_id("pi_3Nabc_secret_xyz").unwrap(),
            "pi_3Nabc"
        );
        assert!(StripeGateway::intent_id("pi_3Nabc").is_err());
        assert!(StripeGateway::intent_id("_secret_xyz").is_err());
    }
}

use crate::types::*;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ses::Client as SesClient;
use aws_sdk_sns::Client as SnsClient;
use campground::{BookingError, GuestNotifier, Reservation};

/// Notification service for sending emails and SMS messages.
#[derive(Debug, Clone)]
pub struct NotificationService {
    ses_client: SesClient,
    sns_client: SnsClient,
    settings: NotificationSettings,
}

impl NotificationService {
    /// Creates a new instance of the NotificationService with AWS clients initialized.
    pub async fn new(settings: NotificationSettings) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        Self {
            ses_client: SesClient::new(&config),
            sns_client: SnsClient::new(&config),
            settings,
        }
    }

    /// Sends a multipart (HTML and text) email through SES.
    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: String,
        text_body: String,
    ) -> Result<(), NotificationError> {
        if !to.contains('@') {
            return Err(NotificationError::InvalidEmail);
        }

        let subject_content = aws_sdk_ses::types::Content::builder()
            .data(subject)
            .build()
            .map_err(|e| {
                log::error!("❌ Failed to build subject content: {}", e);
                NotificationError::SesError(format!("Failed to build subject: {}", e))
            })?;

        let html_content = aws_sdk_ses::types::Content::builder()
            .data(html_body)
            .build()
            .map_err(|e| {
                log::error!("❌ Failed to build HTML content: {}", e);
                NotificationError::SesError(format!("Failed to build HTML body: {}", e))
            })?;

        let text_content = aws_sdk_ses::types::Content::builder()
            .data(text_body)
            .build()
            .map_err(|e| {
                log::error!("❌ Failed to build text content: {}", e);
                NotificationError::SesError(format!("Failed to build text body: {}", e))
            })?;

        let body = aws_sdk_ses::types::Body::builder()
            .html(html_content)
            .text(text_content)
            .build();

        let message = aws_sdk_ses::types::Message::builder()
            .subject(subject_content)
            .body(body)
            .build();

        let destination = aws_sdk_ses::types::Destination::builder()
            .to_addresses(to)
            .build();

        let result = self
            .ses_client
            .send_email()
            .source(&self.settings.from_email)
            .destination(destination)
            .message(message)
            .send()
            .await;

        match result {
            Ok(output) => {
                log::info!("📧 Email sent (SES id {})", output.message_id());
                log::debug!("SES message {} went to {}", output.message_id(), to);
                Ok(())
            }
            Err(e) => {
                log::error!("❌ AWS SES error: {:#?}", e);
                let error_msg = if let Some(service_error) = e.as_service_error() {
                    format!("AWS SES service error: {:?}", service_error)
                } else {
                    format!("AWS SES error: {}", e)
                };
                Err(NotificationError::SesError(error_msg))
            }
        }
    }

    /// Sends an SMS through SNS.
    pub async fn send_sms(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        let formatted_phone = format_phone_e164(phone)?;

        self.sns_client
            .publish()
            .phone_number(&formatted_phone)
            .message(message)
            .send()
            .await
            .map_err(|e| NotificationError::SnsError(e.to_string()))?;

        log::info!("📱 SMS sent");
        log::debug!("SMS went to {}", formatted_phone);
        Ok(())
    }
}

#[async_trait]
impl GuestNotifier for NotificationService {
    /// Texts and emails the code. Succeeds when either channel delivers.
    async fn send_verification_code(
        &self,
        reservation: &Reservation,
        code: &str,
    ) -> Result<(), BookingError> {
        let sms = self
            .send_sms(&reservation.phone, &verification_sms(&self.settings, code))
            .await;

        let (subject, html, text) = verification_email(&self.settings, reservation, code);
        let email = self.send_email(&reservation.email, &subject, html, text).await;

        match (sms, email) {
            (Err(sms_error), Err(email_error)) => {
                log::error!(
                    "❌ Could not deliver a code for reservation {}: {} / {}",
                    reservation.id,
                    sms_error,
                    email_error
                );
                Err(email_error.into())
            }
            (sms, email) => {
                if let Err(e) = sms.as_ref().and(email.as_ref()) {
                    log::warn!(
                        "⚠️ Code for reservation {} delivered on one channel only: {}",
                        reservation.id,
                        e
                    );
                }
                Ok(())
            }
        }
    }

    async fn send_booking_confirmation(&self, reservation: &Reservation) -> Result<(), BookingError> {
        let (subject, html, text) = confirmation_email(&self.settings, reservation);
        self.send_email(&reservation.email, &subject, html, text)
            .await?;
        log::info!("✅ Confirmation sent for reservation {}", reservation.id);
        Ok(())
    }
}

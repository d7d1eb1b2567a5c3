use async_trait::async_trait;
use campground::{BookingError, GuestNotifier, Reservation};

use crate::types::{NotificationSettings, confirmation_email, verification_sms};

/// Writes guest messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    settings: NotificationSettings,
}

impl LogNotifier {
    /// Creates a notifier using `settings` for message wording
    pub fn new(settings: NotificationSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl GuestNotifier for LogNotifier {
    async fn send_verification_code(
        &self,
        reservation: &Reservation,
        code: &str,
    ) -> Result<(), BookingError> {
        log::info!(
            "📱 [dev] Code for reservation {}: {}",
            reservation.id,
            verification_sms(&self.settings, code)
        );
        log::debug!("Would text {} and email {}", reservation.phone, reservation.email);
        Ok(())
    }

    async fn send_booking_confirmation(&self, reservation: &Reservation) -> Result<(), BookingError> {
        let (subject, _, text) = confirmation_email(&self.settings, reservation);
        log::info!("📧 [dev] {}\n{}", subject, text);
        log::debug!("Would email {}", reservation.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campground::ReservationStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_log_notifier_always_delivers() {
        let reservation = Reservation {
            id: 7,
            site_id: None,
            site_type_id: "unpowered".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            guest_name: "Sam Park".to_string(),
            email: "sam@example.com".to_string(),
            phone: "+64 21 000 0000".to_string(),
            adult_count: 1,
            child_count: 0,
            extras: vec![],
            total_price: Decimal::from(10),
            status: ReservationStatus::Booked,
        };

        let notifier = LogNotifier::default();
        assert!(notifier.send_verification_code(&reservation, "123456").await.is_ok());
        assert!(notifier.send_booking_confirmation(&reservation).await.is_ok());
    }
}

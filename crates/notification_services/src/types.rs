use campground::{BookingError, Reservation};

/// Types for notifications (email and SMS).
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Simple email service (SES) errors.
    #[error("AWS SES error: {0}")]
    SesError(String),

    /// Simple notification service (SNS) errors.
    #[error("AWS SNS error: {0}")]
    SnsError(String),

    /// Invalid phone number format.
    #[error("Invalid phone number format")]
    InvalidPhoneNumber,

    /// Invalid email format.
    #[error("Invalid email format")]
    InvalidEmail,
}

impl From<NotificationError> for BookingError {
    fn from(error: NotificationError) -> Self {
        BookingError::Unavailable(error.to_string())
    }
}

/// Sender identity and wording used in guest messages
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    /// SES source address
    pub from_email: String,
    /// Campground name shown in subjects and SMS
    pub park_name: String,
    /// Minutes a verification code stays valid, quoted in the message
    pub code_ttl_minutes: i64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            from_email: "bookings@campground.example".to_string(),
            park_name: "Campground".to_string(),
            code_ttl_minutes: 10,
        }
    }
}

impl NotificationSettings {
    /// Reads `FROM_EMAIL` and `PARK_NAME`, keeping defaults for anything unset.
    pub fn from_env(code_ttl_minutes: i64) -> Self {
        let defaults = Self::default();
        Self {
            from_email: std::env::var("FROM_EMAIL").unwrap_or(defaults.from_email),
            park_name: std::env::var("PARK_NAME").unwrap_or(defaults.park_name),
            code_ttl_minutes,
        }
    }
}

/// Normalizes a phone number to E.164 (`+` followed by digits)
pub fn format_phone_e164(phone: &str) -> Result<String, NotificationError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 7 || digits.len() > 15 {
        return Err(NotificationError::InvalidPhoneNumber);
    }
    Ok(format!("+{}", digits))
}

pub(crate) fn verification_sms(settings: &NotificationSettings, code: &str) -> String {
    format!(
        "Your {} verification code is: {}\n\nThis code expires in {} minutes.\n\nIf you didn't request this, ignore this message.",
        settings.park_name, code, settings.code_ttl_minutes
    )
}

pub(crate) fn verification_email(
    settings: &NotificationSettings,
    reservation: &Reservation,
    code: &str,
) -> (String, String, String) {
    let subject = format!("Your {} verification code", settings.park_name);
    let html = format!(
        r#"
        <html>
        <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <div style="background: linear-gradient(135deg, #2c3e50 0%, #4a6741 100%); padding: 20px; text-align: center;">
                <h1 style="color: white; margin: 0;">🏕️ {park}</h1>
            </div>
            <div style="padding: 30px; background: white;">
                <h2 style="color: #2c3e50;">Hi {name}!</h2>
                <p style="font-size: 16px; line-height: 1.6; color: #374151;">
                    Enter this code at the kiosk to continue with reservation #{id}:
                </p>
                <p style="text-align: center; font-size: 32px; letter-spacing: 8px; font-weight: bold; color: #4a6741;">{code}</p>
                <p style="font-size: 14px; color: #6b7280;">
                    This code expires in {ttl} minutes. If you're not at the kiosk, you can safely ignore this email.
                </p>
            </div>
        </body>
        </html>
        "#,
        park = settings.park_name,
        name = reservation.guest_name,
        id = reservation.id,
        code = code,
        ttl = settings.code_ttl_minutes,
    );
    let text = format!(
        "Hi {}!\n\nEnter this code at the kiosk to continue with reservation #{}: {}\n\nThis code expires in {} minutes.",
        reservation.guest_name, reservation.id, code, settings.code_ttl_minutes
    );
    (subject, html, text)
}

pub(crate) fn confirmation_email(
    settings: &NotificationSettings,
    reservation: &Reservation,
) -> (String, String, String) {
    let subject = format!(
        "{} booking confirmed: reservation #{}",
        settings.park_name, reservation.id
    );
    let arrive = reservation.start_date.format("%a %-d %b %Y");
    let depart = reservation.end_date.format("%a %-d %b %Y");
    let site = reservation
        .site_id
        .as_deref()
        .map(|site| format!("Site {}", site))
        .unwrap_or_else(|| "Site assigned on arrival".to_string());

    let html = format!(
        r#"
        <html>
        <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <div style="background: linear-gradient(135deg, #2c3e50 0%, #4a6741 100%); padding: 20px; text-align: center;">
                <h1 style="color: white; margin: 0;">🏕️ {park}</h1>
            </div>
            <div style="padding: 30px; background: white;">
                <h2 style="color: #2c3e50;">See you soon, {name}!</h2>
                <table style="font-size: 16px; color: #374151;">
                    <tr><td>Reservation</td><td>#{id}</td></tr>
                    <tr><td>Arrive</td><td>{arrive}</td></tr>
                    <tr><td>Depart</td><td>{depart}</td></tr>
                    <tr><td>Where</td><td>{site}</td></tr>
                    <tr><td>Guests</td><td>{adults} adults, {children} children</td></tr>
                    <tr><td>Total paid</td><td>${total}</td></tr>
                </table>
                <p style="font-size: 14px; color: #6b7280;">
                    Check in at the kiosk with your reservation number.
                </p>
            </div>
        </body>
        </html>
        "#,
        park = settings.park_name,
        name = reservation.guest_name,
        id = reservation.id,
        arrive = arrive,
        depart = depart,
        site = site,
        adults = reservation.adult_count,
        children = reservation.child_count,
        total = reservation.total_price,
    );
    let text = format!(
        "See you soon, {}!\n\nReservation #{}\nArrive: {}\nDepart: {}\n{}\nTotal paid: ${}\n\nCheck in at the kiosk with your reservation number.",
        reservation.guest_name, reservation.id, arrive, depart, site, reservation.total_price
    );
    (subject, html, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campground::ReservationStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn reservation() -> Reservation {
        Reservation {
            id: 42,
            site_id: Some("P1".to_string()),
            site_type_id: "powered".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            guest_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "021 555 0101".to_string(),
            adult_count: 2,
            child_count: 1,
            extras: vec![],
            total_price: Decimal::new(4000, 2),
            status: ReservationStatus::Booked,
        }
    }

    #[test]
    fn test_phone_formatting() {
        assert_eq!(format_phone_e164("+64 21 555 0101").unwrap(), "+64215550101");
        assert_eq!(format_phone_e164("(021) 555-0101").unwrap(), "+0215550101");
        assert!(matches!(
            format_phone_e164("12"),
            Err(NotificationError::InvalidPhoneNumber)
        ));
    }

    #[test]
    fn test_templates_carry_details() {
        let settings = NotificationSettings::default();
        let (subject, html, text) = verification_email(&settings, &reservation(), "123456");
        assert!(subject.contains("verification code"));
        assert!(html.contains("123456"));
        assert!(text.contains("#42"));

        let (subject, _, text) = confirmation_email(&settings, &reservation());
        assert!(subject.contains("#42"));
        assert!(text.contains("Fri 10 Jan 2025"));
        assert!(text.contains("Site P1"));
        assert!(text.contains("$40.00"));

        assert!(verification_sms(&settings, "654321").contains("10 minutes"));
    }

    #[test]
    fn test_errors_are_unavailable() {
        assert!(matches!(
            BookingError::from(NotificationError::SesError("throttled".into())),
            BookingError::Unavailable(_)
        ));
    }
}

use std::env;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BookingError;

/// Settings the kiosk consumes as constants
#[derive(Debug, Clone, Serialize)]
pub struct KioskConfig {
    /// ISO 4217 currency code sent to the payment processor (default: NZD)
    pub currency: String,

    /// Number of days covered by an availability window (default: 30)
    pub booking_horizon_days: u32,

    /// Adult count pre-filled on the guest details screen (default: 2)
    pub default_adult_count: u32,

    /// Child count pre-filled on the guest details screen (default: 0)
    pub default_child_count: u32,

    /// How long a desk verification code stays valid (default: 10 minutes)
    pub verification_code_ttl_minutes: i64,

    /// Wrong guesses allowed before a verification code is discarded (default: 3)
    pub max_verification_attempts: u32,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            currency: "NZD".to_string(),
            booking_horizon_days: 30,
            default_adult_count: 2,
            default_child_count: 0,
            verification_code_ttl_minutes: 10,
            max_verification_attempts: 3,
        }
    }
}

impl KioskConfig {
    /// Builds the configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, BookingError> {
        let defaults = Self::default();

        let config = Self {
            currency: env::var("KIOSK_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.currency),
            booking_horizon_days: parse_var("BOOKING_HORIZON_DAYS", defaults.booking_horizon_days)?,
            default_adult_count: parse_var("DEFAULT_ADULT_COUNT", defaults.default_adult_count)?,
            default_child_count: parse_var("DEFAULT_CHILD_COUNT", defaults.default_child_count)?,
            verification_code_ttl_minutes: parse_var(
                "VERIFICATION_CODE_TTL_MINUTES",
                defaults.verification_code_ttl_minutes,
            )?,
            max_verification_attempts: parse_var(
                "MAX_VERIFICATION_ATTEMPTS",
                defaults.max_verification_attempts,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BookingError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(BookingError::invalid(format!(
                "KIOSK_CURRENCY must be a 3-letter ISO code, got {:?}",
                self.currency
            )));
        }
        if self.booking_horizon_days == 0 {
            return Err(BookingError::invalid("BOOKING_HORIZON_DAYS must be at least 1"));
        }
        if self.default_adult_count == 0 {
            return Err(BookingError::invalid("DEFAULT_ADULT_COUNT must be at least 1"));
        }
        if self.verification_code_ttl_minutes <= 0 || self.max_verification_attempts == 0 {
            return Err(BookingError::invalid(
                "verification code TTL and attempt limit must be positive",
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, BookingError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BookingError::invalid(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KioskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.currency, "NZD");
        assert_eq!(config.booking_horizon_days, 30);
        assert_eq!(config.default_adult_count, 2);
    }

    #[test]
    fn test_rejects_bad_currency() {
        let config = KioskConfig {
            currency: "DOLLARS".to_string(),
            ..KioskConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BookingError::InvalidArgument(_))
        ));
    }
}

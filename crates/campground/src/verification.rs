use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::KioskConfig;
use crate::error::BookingError;

/// A code sent to a guest to prove they own a reservation
#[derive(Debug, Clone)]
pub struct VerificationCode {
    /// The verification code itself, a 6-digit number.
    pub code: String,
    /// The expiration time of the verification code.
    pub expires_at: DateTime<Utc>,
    /// The number of attempts made to verify this code.
    pub attempts: u32,
}

/// Thread-safe store of outstanding verification codes, keyed by desk session
#[derive(Debug)]
pub struct VerificationCodes {
    codes: Mutex<HashMap<String, VerificationCode>>,
    ttl: Duration,
    max_attempts: u32,
}

impl VerificationCodes {
    /// Creates an empty store
    pub fn new(ttl_minutes: i64, max_attempts: u32) -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
            max_attempts,
        }
    }

    /// Creates an empty store with the kiosk's TTL and attempt limit
    pub fn from_config(config: &KioskConfig) -> Self {
        Self::new(
            config.verification_code_ttl_minutes,
            config.max_verification_attempts,
        )
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VerificationCode>> {
        self.codes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generates a fresh code for `key`, replacing any earlier one
    pub fn issue(&self, key: &str) -> String {
        let code = generate_verification_code();
        self.store(key, &code, Utc::now() + self.ttl);
        code
    }

    /// Stores `code` for `key` until `expires_at`, dropping codes that have
    /// expired unused
    pub fn store(&self, key: &str, code: &str, expires_at: DateTime<Utc>) {
        let verification = VerificationCode {
            code: code.to_string(),
            expires_at,
            attempts: 0,
        };
        let now = Utc::now();
        let mut codes = self.lock();
        let before = codes.len();
        codes.retain(|_, code| code.expires_at >= now);
        if codes.len() < before {
            debug!("Dropped {} expired verification codes", before - codes.len());
        }
        codes.insert(key.to_string(), verification);
    }

    /// Number of outstanding codes
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no codes are outstanding
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks `provided_code` against the code issued for `key`.
    ///
    /// A correct code is consumed. Expired codes and codes guessed wrong too
    /// often are discarded and reported as errors; a plain wrong guess is
    /// `Ok(false)`.
    pub fn verify(&self, key: &str, provided_code: &str) -> Result<bool, BookingError> {
        let mut codes = self.lock();

        let verification = codes.get_mut(key).ok_or_else(|| {
            BookingError::invalid("No verification code is outstanding; request a new code")
        })?;

        if verification.expires_at < Utc::now() {
            codes.remove(key);
            return Err(BookingError::invalid(
                "Verification code has expired; request a new code",
            ));
        }

        verification.attempts += 1;

        if verification.attempts > self.max_attempts {
            codes.remove(key);
            warn!("Verification code for {} discarded after too many attempts", key);
            return Err(BookingError::invalid(
                "Too many verification attempts; request a new code",
            ));
        }

        if verification.code == provided_code.trim() {
            codes.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Drops any code issued for `key`
    pub fn revoke(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Whether a code is outstanding for `key`
    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}

/// Generates a random 6-digit verification code.
pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(100000..=999999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_six_digits() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_code_is_single_use() {
        let codes = VerificationCodes::new(10, 3);
        let code = codes.issue("session-1");

        assert!(codes.verify("session-1", &code).unwrap());
        assert!(codes.verify("session-1", &code).is_err());
    }

    #[test]
    fn test_wrong_guesses_exhaust_code() {
        let codes = VerificationCodes::new(10, 3);
        codes.store("session-1", "123456", Utc::now() + Duration::minutes(5));

        for _ in 0..3 {
            assert!(!codes.verify("session-1", "000000").unwrap());
        }
        assert!(codes.verify("session-1", "123456").is_err());
        assert!(!codes.is_pending("session-1"));
    }

    #[test]
    fn test_expired_code_is_rejected() {
        let codes = VerificationCodes::new(10, 3);
        codes.store("session-1", "123456", Utc::now() - Duration::minutes(1));

        assert!(matches!(
            codes.verify("session-1", "123456"),
            Err(BookingError::InvalidArgument(_))
        ));
        assert!(!codes.is_pending("session-1"));
    }

    #[test]
    fn test_abandoned_codes_are_dropped_on_issue() {
        let codes = VerificationCodes::new(10, 3);
        codes.store("waiting", "654321", Utc::now() + Duration::minutes(5));
        codes.store("abandoned", "123456", Utc::now() - Duration::minutes(1));
        assert_eq!(codes.len(), 2);

        codes.issue("session-1");

        assert!(!codes.is_pending("abandoned"));
        assert!(codes.is_pending("waiting"));
        assert!(codes.is_pending("session-1"));
        assert_eq!(codes.len(), 2);
    }
}

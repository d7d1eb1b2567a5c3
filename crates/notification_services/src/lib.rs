//! # Notification Services
//!
//! Guest messaging for the campground kiosk. [`NotificationService`] delivers desk
//! verification codes and booking confirmations through AWS SES (email) and
//! SNS (SMS); [`LogNotifier`] writes the same messages to the log for
//! development setups without AWS credentials.

/// Notifier that only logs
pub mod log_notifier;
/// AWS-backed notification service
pub mod service;
/// Errors, settings and message templates
pub mod types;

pub use log_notifier::LogNotifier;
pub use service::NotificationService;
pub use types::{NotificationError, NotificationSettings};

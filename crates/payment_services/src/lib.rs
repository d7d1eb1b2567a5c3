//! # Payment Services
//!
//! Payment collaborators for the campground kiosk. [`StripeGateway`] talks to the
//! Stripe REST API over `reqwest`; [`MockPaymentGateway`] approves everything
//! (except Stripe's decline test method) for development without an account.

/// Development gateway that never leaves the process.
pub mod mock;
/// Stripe payment intents over the REST API.
pub mod stripe;
/// Configuration and error types shared by the gateways.
pub mod types;

pub use mock::{DECLINED_PAYMENT_METHOD, MockPaymentGateway};
pub use stripe::StripeGateway;
pub use types::{PaymentError, StripeConfig};

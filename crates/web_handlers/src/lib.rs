//! # Web Handlers for the Campground Kiosk
//!
//! actix-web handlers exposing the booking wizard, the desk flows, walk-up
//! payments and the read-only projections the kiosk screens render from.
//! Wizard and desk sessions live server-side in [`SessionStore`]s.

/// Server-side session maps
mod sessions;
pub use sessions::*;

/// Request bodies, query strings and response views
mod types;
pub use types::*;

/// Inventory, availability, occupancy and quotes
mod reference_handlers;
pub use reference_handlers::*;

/// Booking wizard steps
mod booking_handlers;
pub use booking_handlers::*;

/// Check-in, check-out and reservation management
mod desk_handlers;
pub use desk_handlers::*;

/// Payments for past stays and extras-only purchases
mod walk_up_handlers;
pub use walk_up_handlers::*;

/// `/api` route table
mod routes;
pub use routes::*;

//! # Campground
//!
//! Core booking logic for the campground kiosk: site inventory, availability and
//! pricing calculations, the multi-step booking workflow, and the desk flows used
//! for check-in, check-out and reservation management.
//!
//! Storage, payments and guest notifications are reached only through the
//! collaborator traits in [`collaborators`], so every workflow can run against
//! the in-memory ledger in tests.

/// Domain error kinds shared by every operation
mod error;
pub use error::*;

/// Kiosk settings loaded from the environment
mod config;
pub use config::*;

/// Site types, sites, extras and campground rules
mod inventory;
pub use inventory::*;

/// Reservations, stay dates and guest details
mod reservation;
pub use reservation::*;

/// Per-day remaining capacity and bookable run lengths
mod availability;
pub use availability::*;

/// Stay and extras pricing
mod pricing;
pub use pricing::*;

/// Traits for the payment, persistence and notification collaborators
pub mod collaborators;
pub use collaborators::*;

/// In-memory reservation ledger
mod memory_store;
pub use memory_store::*;

/// Single-use verification codes for desk lookups
mod verification;
pub use verification::*;

/// Booking workflow coordinator
mod workflow;
pub use workflow::*;

/// Lookup and verification flows for existing reservations
mod desk;
pub use desk::*;

/// Walk-up payments that do not touch the reservation ledger
mod walk_up;
pub use walk_up::*;

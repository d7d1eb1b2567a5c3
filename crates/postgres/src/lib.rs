//! # Postgres
//!
//! PostgreSQL storage for the campground kiosk: the connection pool and schema
//! migrations, the reservation ledger behind [`campground::ReservationStore`],
//! and the loader for the site inventory tables.

/// Connection pool and migrations.
pub mod database;
/// Mapping of database errors onto booking errors.
pub mod error;
/// Site types, sites, extras and rules loaded from their tables.
pub mod inventory_repo;
/// Reservation ledger backed by the `reservations` table.
pub mod reservation_store;

pub use database::{
    DatabaseSettings, create_connection_pool, run_migrations, test_connection,
};
pub use error::map_sqlx_error;
pub use inventory_repo::load_inventory;
pub use reservation_store::PgReservationStore;
pub use sqlx::PgPool;

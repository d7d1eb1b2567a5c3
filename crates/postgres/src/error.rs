use campground::BookingError;

const EXCLUSION_VIOLATION: &str = "23P01";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps a database error onto the booking error the core understands.
///
/// Overlap and uniqueness violations become [`BookingError::Conflict`];
/// connectivity problems and anything unrecognised become
/// [`BookingError::Unavailable`].
pub fn map_sqlx_error(error: sqlx::Error) -> BookingError {
    match &error {
        sqlx::Error::RowNotFound => BookingError::not_found("row", "query returned no rows"),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(EXCLUSION_VIOLATION) | Some(UNIQUE_VIOLATION) => {
                log::warn!("⚠️ Storage rejected a conflicting write: {}", db.message());
                BookingError::Conflict(db.message().to_string())
            }
            Some(CHECK_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
                BookingError::invalid(db.message().to_string())
            }
            _ => {
                log::error!("❌ Database error: {}", db.message());
                BookingError::Unavailable(format!("database error: {}", db.message()))
            }
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => {
            log::error!("❌ Database unreachable: {}", error);
            BookingError::Unavailable(format!("database unreachable: {}", error))
        }
        _ => {
            log::error!("❌ Database error: {}", error);
            BookingError::Unavailable(error.to_string())
        }
    }
}

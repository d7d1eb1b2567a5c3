use std::collections::HashMap;

use async_trait::async_trait;
use campground::{
    BookingError, DateRange, ExtraSelection, NewReservation, Reservation, ReservationStatus,
    ReservationStore,
};
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::map_sqlx_error;

const RESERVATION_COLUMNS: &str = r#"
    id, site_id, site_type_id, start_date, end_date,
    guest_name, guest_email, guest_phone, adult_count, child_count,
    total_price, status
"#;

/// Reservation ledger stored in PostgreSQL.
///
/// Overlapping stays on one site are rejected by the table's exclusion
/// constraint and surface as [`BookingError::Conflict`].
#[derive(Debug, Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    /// Creates a new instance of `PgReservationStore` with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_extras(&self, rows: Vec<PgRow>) -> Result<Vec<Reservation>, BookingError> {
        let mut reservations = rows
            .iter()
            .map(reservation_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        if reservations.is_empty() {
            return Ok(reservations);
        }

        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
        let extra_rows = sqlx::query(
            r#"
            SELECT reservation_id, service_id, quantity
            FROM reservation_services
            WHERE reservation_id = ANY($1)
            ORDER BY reservation_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut extras: HashMap<i64, Vec<ExtraSelection>> = HashMap::new();
        for row in &extra_rows {
            let quantity: i32 = row.get("quantity");
            extras
                .entry(row.get("reservation_id"))
                .or_default()
                .push(ExtraSelection {
                    extra_service_id: row.get("service_id"),
                    quantity: quantity.max(0) as u32,
                });
        }

        for reservation in &mut reservations {
            reservation.extras = extras.remove(&reservation.id).unwrap_or_default();
        }
        Ok(reservations)
    }

    async fn single(&self, row: Option<PgRow>, id: i64) -> Result<Reservation, BookingError> {
        let row = row.ok_or_else(|| BookingError::not_found("reservation", id))?;
        self.with_extras(vec![row])
            .await?
            .pop()
            .ok_or_else(|| BookingError::not_found("reservation", id))
    }
}

fn reservation_from_row(row: &PgRow) -> Result<Reservation, BookingError> {
    let status: String = row.get("status");
    let adult_count: i32 = row.get("adult_count");
    let child_count: i32 = row.get("child_count");

    Ok(Reservation {
        id: row.get("id"),
        site_id: row.get("site_id"),
        site_type_id: row.get("site_type_id"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        guest_name: row.get("guest_name"),
        email: row.get("guest_email"),
        phone: row.get("guest_phone"),
        adult_count: adult_count.max(0) as u32,
        child_count: child_count.max(0) as u32,
        extras: Vec::new(),
        total_price: row.get("total_price"),
        status: status.parse()?,
    })
}

/// Id to match exactly when the search term is a reservation number
fn exact_id(term: &str) -> Option<i64> {
    term.parse::<i64>()
        .ok()
        .filter(|id| id.to_string() == term)
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn insert_reservation(&self, reservation: &NewReservation) -> Result<i64, BookingError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(
            r#"
            INSERT INTO reservations (
                site_id, site_type_id, start_date, end_date,
                guest_name, guest_email, guest_phone, adult_count, child_count,
                total_price, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'booked')
            RETURNING id
            "#,
        )
        .bind(&reservation.site_id)
        .bind(&reservation.site_type_id)
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(&reservation.guest_name)
        .bind(&reservation.email)
        .bind(&reservation.phone)
        .bind(reservation.adult_count as i32)
        .bind(reservation.child_count as i32)
        .bind(reservation.total_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let id: i64 = row.get("id");

        for (position, extra) in reservation.extras.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO reservation_services (reservation_id, position, service_id, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(position as i32)
            .bind(extra.extra_service_id)
            .bind(extra.quantity as i32)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        log::info!(
            "🏕️ Reservation {} stored for {} {}",
            id,
            reservation.site_type_id,
            reservation.dates()
        );
        Ok(id)
    }

    async fn query_reservations_overlapping(
        &self,
        site_type_id: &str,
        dates: &DateRange,
    ) -> Result<Vec<Reservation>, BookingError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE site_type_id = $1 AND start_date < $3 AND end_date > $2
            ORDER BY start_date, id
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(site_type_id)
        .bind(dates.start)
        .bind(dates.end)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.with_extras(rows).await
    }

    async fn search_reservations(&self, term: &str) -> Result<Vec<Reservation>, BookingError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE ($2::BIGINT IS NOT NULL AND id = $2)
               OR POSITION(LOWER($1) IN LOWER(guest_name)) > 0
               OR LOWER(guest_email) = LOWER($1)
               OR guest_phone = $1
            ORDER BY start_date, id
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(term)
        .bind(exact_id(term))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.with_extras(rows).await
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>, BookingError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => self.single(Some(row), id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn update_reservation_dates(
        &self,
        id: i64,
        new_start: NaiveDate,
        new_end: NaiveDate,
    ) -> Result<Reservation, BookingError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE reservations SET start_date = $2, end_date = $3
            WHERE id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .bind(new_start)
        .bind(new_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.single(row, id).await
    }

    async fn update_reservation_status(
        &self,
        id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, BookingError> {
        let row = sqlx::query(&format!(
            "UPDATE reservations SET status = $2 WHERE id = $1 RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.single(row, id).await
    }

    async fn delete_reservation(&self, id: i64) -> Result<(), BookingError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("reservation", id));
        }
        log::info!("🗑️ Reservation {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_id_requires_verbatim_number() {
        assert_eq!(exact_id("42"), Some(42));
        assert_eq!(exact_id("042"), None);
        assert_eq!(exact_id("+42"), None);
        assert_eq!(exact_id("jane"), None);
    }
}

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::collaborators::ReservationStore;
use crate::error::BookingError;
use crate::reservation::{DateRange, NewReservation, Reservation, ReservationStatus};

/// Reservation ledger kept in memory.
///
/// Rejects overlapping stays on the same site with [`BookingError::Conflict`],
/// the same rule the Postgres exclusion constraint enforces.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    inner: RwLock<Ledger>,
}

#[derive(Debug)]
struct Ledger {
    next_id: i64,
    reservations: BTreeMap<i64, Reservation>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            next_id: 1,
            reservations: BTreeMap::new(),
        }
    }
}

impl Ledger {
    fn check_site_overlap(
        &self,
        site_id: Option<&str>,
        dates: &DateRange,
        ignore: Option<i64>,
    ) -> Result<(), BookingError> {
        let Some(site_id) = site_id else {
            return Ok(());
        };
        let clash = self.reservations.values().find(|r| {
            Some(r.id) != ignore && r.site_id.as_deref() == Some(site_id) && r.dates().overlaps(dates)
        });
        match clash {
            Some(existing) => Err(BookingError::Conflict(format!(
                "site {} is already booked for {} by reservation {}",
                site_id,
                existing.dates(),
                existing.id
            ))),
            None => Ok(()),
        }
    }
}

impl InMemoryReservationStore {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger holding `reservations`; ids are kept and the next id
    /// continues after the largest one
    pub fn with_reservations(reservations: Vec<Reservation>) -> Self {
        let next_id = reservations.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            inner: RwLock::new(Ledger {
                next_id,
                reservations: reservations.into_iter().map(|r| (r.id, r)).collect(),
            }),
        }
    }

    /// Every reservation, ordered by id
    pub async fn all(&self) -> Vec<Reservation> {
        self.inner.read().await.reservations.values().cloned().collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert_reservation(&self, reservation: &NewReservation) -> Result<i64, BookingError> {
        let dates = DateRange::new(reservation.start_date, reservation.end_date)?;
        let mut ledger = self.inner.write().await;
        ledger.check_site_overlap(reservation.site_id.as_deref(), &dates, None)?;

        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger
            .reservations
            .insert(id, Reservation::from_new(id, reservation.clone()));
        Ok(id)
    }

    async fn query_reservations_overlapping(
        &self,
        site_type_id: &str,
        dates: &DateRange,
    ) -> Result<Vec<Reservation>, BookingError> {
        let ledger = self.inner.read().await;
        Ok(ledger
            .reservations
            .values()
            .filter(|r| r.site_type_id == site_type_id && r.dates().overlaps(dates))
            .cloned()
            .collect())
    }

    async fn search_reservations(&self, term: &str) -> Result<Vec<Reservation>, BookingError> {
        let ledger = self.inner.read().await;
        Ok(ledger
            .reservations
            .values()
            .filter(|r| r.matches_search(term))
            .cloned()
            .collect())
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>, BookingError> {
        Ok(self.inner.read().await.reservations.get(&id).cloned())
    }

    async fn update_reservation_dates(
        &self,
        id: i64,
        new_start: NaiveDate,
        new_end: NaiveDate,
    ) -> Result<Reservation, BookingError> {
        let dates = DateRange::new(new_start, new_end)?;
        let mut ledger = self.inner.write().await;
        let site_id = ledger
            .reservations
            .get(&id)
            .ok_or_else(|| BookingError::not_found("reservation", id))?
            .site_id
            .clone();
        ledger.check_site_overlap(site_id.as_deref(), &dates, Some(id))?;

        let reservation = ledger
            .reservations
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("reservation", id))?;
        reservation.start_date = new_start;
        reservation.end_date = new_end;
        Ok(reservation.clone())
    }

    async fn update_reservation_status(
        &self,
        id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, BookingError> {
        let mut ledger = self.inner.write().await;
        let reservation = ledger
            .reservations
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("reservation", id))?;
        reservation.status = status;
        Ok(reservation.clone())
    }

    async fn delete_reservation(&self, id: i64) -> Result<(), BookingError> {
        self.inner
            .write()
            .await
            .reservations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found("reservation", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn new_reservation(site: Option<&str>, start: u32, end: u32, name: &str) -> NewReservation {
        NewReservation {
            site_id: site.map(str::to_string),
            site_type_id: if site.is_some() { "powered" } else { "unpowered" }.to_string(),
            start_date: date(start),
            end_date: date(end),
            guest_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: "021 555 0100".to_string(),
            adult_count: 2,
            child_count: 0,
            extras: vec![],
            total_price: Decimal::from(40),
        }
    }

    #[tokio::test]
    async fn test_insert_then_search_by_id_returns_one_match() {
        let store = InMemoryReservationStore::new();
        let id = store
            .insert_reservation(&new_reservation(Some("P1"), 10, 12, "Jane Doe"))
            .await
            .unwrap();
        store
            .insert_reservation(&new_reservation(Some("P2"), 10, 12, "John Doe"))
            .await
            .unwrap();

        let matches = store.search_reservations(&id.to_string()).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, id);
        assert_eq!(matches[0].status, ReservationStatus::Booked);

        assert_eq!(store.search_reservations("doe").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_site_overlap() {
        let store = InMemoryReservationStore::new();
        store
            .insert_reservation(&new_reservation(Some("P1"), 10, 12, "Jane Doe"))
            .await
            .unwrap();

        let clash = store
            .insert_reservation(&new_reservation(Some("P1"), 11, 13, "John Doe"))
            .await;
        assert!(matches!(clash, Err(BookingError::Conflict(_))));

        // Checkout-day arrival is allowed
        assert!(
            store
                .insert_reservation(&new_reservation(Some("P1"), 12, 14, "John Doe"))
                .await
                .is_ok()
        );

        // Pooled stays have no site and never clash
        for _ in 0..3 {
            store
                .insert_reservation(&new_reservation(None, 10, 12, "Pool Guest"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_update_dates_ignores_own_booking() {
        let store = InMemoryReservationStore::new();
        let id = store
            .insert_reservation(&new_reservation(Some("P1"), 10, 12, "Jane Doe"))
            .await
            .unwrap();

        let moved = store
            .update_reservation_dates(id, date(11), date(14))
            .await
            .unwrap();
        assert_eq!(moved.dates().nights(), 3);
        assert_eq!(moved.total_price, Decimal::from(40));

        assert!(matches!(
            store.update_reservation_dates(99, date(11), date(14)).await,
            Err(BookingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_overlap_query_is_half_open() {
        let store = InMemoryReservationStore::new();
        store
            .insert_reservation(&new_reservation(Some("P1"), 10, 12, "Jane Doe"))
            .await
            .unwrap();

        let window = DateRange::new(date(12), date(15)).unwrap();
        assert!(
            store
                .query_reservations_overlapping("powered", &window)
                .await
                .unwrap()
                .is_empty()
        );

        let window = DateRange::new(date(11), date(15)).unwrap();
        assert_eq!(
            store
                .query_reservations_overlapping("powered", &window)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_and_status() {
        let store = InMemoryReservationStore::new();
        let id = store
            .insert_reservation(&new_reservation(Some("P1"), 10, 12, "Jane Doe"))
            .await
            .unwrap();

        let updated = store
            .update_reservation_status(id, ReservationStatus::CheckedIn)
            .await
            .unwrap();
        assert_eq!(updated.status, ReservationStatus::CheckedIn);

        store.delete_reservation(id).await.unwrap();
        assert!(store.find_reservation(id).await.unwrap().is_none());
        assert!(store.delete_reservation(id).await.is_err());
    }
}

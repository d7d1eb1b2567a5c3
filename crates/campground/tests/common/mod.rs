#![allow(dead_code, missing_docs)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use campground::*;
use chrono::{Days, Local, NaiveDate};

pub const INVENTORY: &str = r#"{
    "site_types": [
        {
            "id": "powered", "name": "Powered Site", "icon": "Zap",
            "requires_site_selection": true, "limited_availability": true,
            "pricing": { "base_price": 20, "extra_guest_price": 5, "base_guests": 2, "max_guests": 6 }
        },
        {
            "id": "unpowered", "name": "Unpowered Site", "icon": "Tent",
            "requires_site_selection": false, "limited_availability": false, "pool_size": 20,
            "pricing": { "base_price": 10, "extra_guest_price": 5, "base_guests": 2, "max_guests": 6 }
        }
    ],
    "sites": [
        { "id": "P1", "site_type_id": "powered", "number": "A1" },
        { "id": "P2", "site_type_id": "powered", "number": "A2" }
    ],
    "extra_services": [
        { "id": 1, "name": "Dump Station", "price": "5.00", "allow_multiple": true },
        { "id": 4, "name": "Rubbish Bag and Disposal", "price": "10.00", "allow_multiple": true }
    ],
    "rules": ["Check-out time is 11 AM.", "Quiet hours are from 10 PM to 9 AM."]
}"#;

pub fn inventory() -> Arc<Inventory> {
    Arc::new(Inventory::from_json(INVENTORY).unwrap())
}

/// A date `offset` days from today, so arrival is never in the past
pub fn day(offset: u64) -> NaiveDate {
    Local::now()
        .date_naive()
        .checked_add_days(Days::new(offset))
        .unwrap()
}

pub fn guest(adults: u32, children: u32) -> GuestDetails {
    GuestDetails {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "021 555 0100".to_string(),
        adult_count: adults,
        child_count: children,
    }
}

pub fn booked(site: &str, start: NaiveDate, nights: u64, name: &str) -> NewReservation {
    NewReservation {
        site_id: Some(site.to_string()),
        site_type_id: "powered".to_string(),
        start_date: start,
        end_date: start.checked_add_days(Days::new(nights)).unwrap(),
        guest_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "021 555 0199".to_string(),
        adult_count: 2,
        child_count: 0,
        extras: vec![],
        total_price: rust_decimal::Decimal::from(40),
    }
}

/// What the scripted gateway should do on confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    Decline,
    Error,
    /// Funds are captured but the answer is lost
    TimeoutAfterCapture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentCall {
    pub amount_minor_units: i64,
    pub currency: String,
    pub idempotency_key: Option<String>,
}

/// Intents are reused per idempotency key and a captured intent reports
/// success on every later confirm, the way Stripe behaves.
pub struct ScriptedGateway {
    script: Mutex<Vec<Script>>,
    pub intents: Mutex<Vec<IntentCall>>,
    pub captures: Mutex<u32>,
    secrets: Mutex<HashMap<String, String>>,
    captured: Mutex<HashSet<String>>,
}

impl ScriptedGateway {
    /// Plays `script` in order, then keeps succeeding
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script),
            intents: Mutex::new(Vec::new()),
            captures: Mutex::new(0),
            secrets: Mutex::new(HashMap::new()),
            captured: Mutex::new(HashSet::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub fn intent_calls(&self) -> Vec<IntentCall> {
        self.intents.lock().unwrap().clone()
    }

    pub fn capture_count(&self) -> u32 {
        *self.captures.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, BookingError> {
        let mut intents = self.intents.lock().unwrap();
        intents.push(IntentCall {
            amount_minor_units,
            currency: currency.to_string(),
            idempotency_key: idempotency_key.map(str::to_string),
        });
        let fresh = format!("pi_test_{}_secret_abc", intents.len());
        let client_secret = match idempotency_key {
            Some(key) => self
                .secrets
                .lock()
                .unwrap()
                .entry(key.to_string())
                .or_insert(fresh)
                .clone(),
            None => fresh,
        };
        Ok(PaymentIntent { client_secret })
    }

    async fn confirm_capture(
        &self,
        client_secret: &str,
        _payment_method: &str,
    ) -> Result<CaptureOutcome, BookingError> {
        let reference = client_secret
            .split("_secret_")
            .next()
            .unwrap_or(client_secret)
            .to_string();
        if self.captured.lock().unwrap().contains(&reference) {
            return Ok(CaptureOutcome {
                status: CaptureStatus::Succeeded,
                reference,
            });
        }

        let next = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Script::Succeed
            } else {
                script.remove(0)
            }
        };
        match next {
            Script::Succeed => {
                *self.captures.lock().unwrap() += 1;
                self.captured.lock().unwrap().insert(reference.clone());
                Ok(CaptureOutcome {
                    status: CaptureStatus::Succeeded,
                    reference,
                })
            }
            Script::Decline => Ok(CaptureOutcome {
                status: CaptureStatus::Failed,
                reference,
            }),
            Script::Error => Err(BookingError::Unavailable("card reader timed out".to_string())),
            Script::TimeoutAfterCapture => {
                *self.captures.lock().unwrap() += 1;
                self.captured.lock().unwrap().insert(reference);
                Err(BookingError::Unavailable("payment processor timed out".to_string()))
            }
        }
    }
}

/// Ledger whose writes can be made to fail
pub struct FlakyStore {
    pub inner: InMemoryReservationStore,
    pub fail_inserts: bool,
    pub fail_status_updates: bool,
}

impl FlakyStore {
    pub fn failing_inserts() -> Self {
        Self {
            inner: InMemoryReservationStore::new(),
            fail_inserts: true,
            fail_status_updates: false,
        }
    }

    pub fn failing_status_updates(inner: InMemoryReservationStore) -> Self {
        Self {
            inner,
            fail_inserts: false,
            fail_status_updates: true,
        }
    }
}

#[async_trait]
impl ReservationStore for FlakyStore {
    async fn insert_reservation(&self, reservation: &NewReservation) -> Result<i64, BookingError> {
        if self.fail_inserts {
            return Err(BookingError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert_reservation(reservation).await
    }

    async fn query_reservations_overlapping(
        &self,
        site_type_id: &str,
        dates: &DateRange,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.inner
            .query_reservations_overlapping(site_type_id, dates)
            .await
    }

    async fn search_reservations(&self, term: &str) -> Result<Vec<Reservation>, BookingError> {
        self.inner.search_reservations(term).await
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>, BookingError> {
        self.inner.find_reservation(id).await
    }

    async fn update_reservation_dates(
        &self,
        id: i64,
        new_start: NaiveDate,
        new_end: NaiveDate,
    ) -> Result<Reservation, BookingError> {
        self.inner
            .update_reservation_dates(id, new_start, new_end)
            .await
    }

    async fn update_reservation_status(
        &self,
        id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, BookingError> {
        if self.fail_status_updates {
            return Err(BookingError::Unavailable("connection reset".to_string()));
        }
        self.inner.update_reservation_status(id, status).await
    }

    async fn delete_reservation(&self, id: i64) -> Result<(), BookingError> {
        self.inner.delete_reservation(id).await
    }
}

/// Ledger that is always unreachable
pub struct DownStore;

#[async_trait]
impl ReservationStore for DownStore {
    async fn insert_reservation(&self, _reservation: &NewReservation) -> Result<i64, BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }

    async fn query_reservations_overlapping(
        &self,
        _site_type_id: &str,
        _dates: &DateRange,
    ) -> Result<Vec<Reservation>, BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }

    async fn search_reservations(&self, _term: &str) -> Result<Vec<Reservation>, BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }

    async fn find_reservation(&self, _id: i64) -> Result<Option<Reservation>, BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }

    async fn update_reservation_dates(
        &self,
        _id: i64,
        _new_start: NaiveDate,
        _new_end: NaiveDate,
    ) -> Result<Reservation, BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }

    async fn update_reservation_status(
        &self,
        _id: i64,
        _status: ReservationStatus,
    ) -> Result<Reservation, BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }

    async fn delete_reservation(&self, _id: i64) -> Result<(), BookingError> {
        Err(BookingError::Unavailable("database unreachable".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub codes: Mutex<Vec<(i64, String)>>,
    pub confirmations: Mutex<Vec<i64>>,
}

impl RecordingNotifier {
    pub fn last_code(&self) -> Option<String> {
        self.codes.lock().unwrap().last().map(|(_, code)| code.clone())
    }

    pub fn code_count(&self) -> usize {
        self.codes.lock().unwrap().len()
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.lock().unwrap().len()
    }
}

#[async_trait]
impl GuestNotifier for RecordingNotifier {
    async fn send_verification_code(
        &self,
        reservation: &Reservation,
        code: &str,
    ) -> Result<(), BookingError> {
        self.codes
            .lock()
            .unwrap()
            .push((reservation.id, code.to_string()));
        Ok(())
    }

    async fn send_booking_confirmation(&self, reservation: &Reservation) -> Result<(), BookingError> {
        self.confirmations.lock().unwrap().push(reservation.id);
        Ok(())
    }
}

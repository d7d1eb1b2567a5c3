use campground::{
    BookingAction, BookingSession, DeskFlow, ExtraSelection, ExtrasPurchase, LookupSession,
    PastStayPayment, Reservation, ReservationSummary,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Query for `GET /api/availability`
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Site type id
    pub site_type: String,
    /// First day of the window (default: today)
    pub start: Option<NaiveDate>,
    /// Window length (default: the booking horizon)
    pub days: Option<u32>,
}

/// Query for `GET /api/available-sites`
#[derive(Debug, Deserialize)]
pub struct AvailableSitesQuery {
    /// Site type id
    pub site_type: String,
    /// Arrival date
    pub start: NaiveDate,
    /// Nights
    pub nights: u32,
}

/// Query for `GET /api/occupancy`
#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    /// Site type id
    pub site_type: String,
    /// Night to show (default: today)
    pub date: Option<NaiveDate>,
}

/// Body of `POST /api/quote`
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    /// Site type id
    pub site_type_id: String,
    /// Nights
    pub nights: u32,
    /// Guests over 13
    pub adult_count: u32,
    /// Guests 13 and under
    #[serde(default)]
    pub child_count: u32,
    /// Extras to include
    #[serde(default)]
    pub extras: Vec<ExtraSelection>,
}

/// Body of `POST /api/bookings/{id}/site-type`
#[derive(Debug, Deserialize)]
pub struct SelectSiteTypeRequest {
    /// Site type id
    pub site_type_id: String,
}

/// Body of the date-changing endpoints
#[derive(Debug, Deserialize)]
pub struct SelectDatesRequest {
    /// Arrival date
    pub start_date: NaiveDate,
    /// Nights
    pub nights: u32,
}

/// Body of `POST /api/bookings/{id}/site`
#[derive(Debug, Deserialize)]
pub struct SelectSiteRequest {
    /// Site id
    pub site_id: String,
}

/// Body of `POST /api/bookings/{id}/extras`
#[derive(Debug, Deserialize)]
pub struct ExtrasRequest {
    /// Extras with quantities; an empty list means none
    #[serde(default)]
    pub extras: Vec<ExtraSelection>,
}

/// Body of the payment endpoints
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    /// Payment method from the card reader
    pub payment_method: String,
}

/// A booking session with what the UI may do next
#[derive(Debug, Serialize)]
pub struct BookingSessionView {
    /// Session state
    #[serde(flatten)]
    pub session: BookingSession,
    /// Actions valid at the current step
    pub available_actions: Vec<BookingAction>,
    /// Whether the pay button should be offered again
    pub can_retry_payment: bool,
}

impl From<BookingSession> for BookingSessionView {
    fn from(session: BookingSession) -> Self {
        Self {
            available_actions: session.available_actions(),
            can_retry_payment: session.can_retry_payment(),
            session,
        }
    }
}

/// Response of `POST /api/bookings/{id}/pay`
#[derive(Debug, Serialize)]
pub struct BookingConfirmation {
    /// Final session state
    pub session: BookingSessionView,
    /// The recorded reservation
    pub reservation: Reservation,
}

/// Body of `POST /api/desk`
#[derive(Debug, Deserialize)]
pub struct StartDeskRequest {
    /// Flow to run
    pub flow: DeskFlow,
}

/// Body of `POST /api/desk/{id}/search`
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Reservation number, name, email or phone
    pub term: String,
}

/// Body of `POST /api/desk/{id}/select`
#[derive(Debug, Deserialize)]
pub struct SelectReservationRequest {
    /// One of the listed matches
    pub reservation_id: i64,
}

/// Body of `POST /api/desk/{id}/verify`
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Code the guest received
    pub code: String,
}

fn depart_by_default() -> bool {
    true
}

/// Body of `POST /api/desk/{id}/check-out`
#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    /// Extras used during the stay
    #[serde(default)]
    pub extras: Vec<ExtraSelection>,
    /// Needed only when extras are charged
    pub payment_method: Option<String>,
    /// Mark the reservation checked out
    #[serde(default = "depart_by_default")]
    pub depart: bool,
}

/// A desk session as the kiosk sees it
#[derive(Debug, Serialize)]
pub struct LookupSessionView {
    /// Session state
    #[serde(flatten)]
    pub session: LookupSession,
    /// Reservation awaiting its verification code
    pub pending: Option<ReservationSummary>,
}

impl From<LookupSession> for LookupSessionView {
    fn from(session: LookupSession) -> Self {
        Self {
            pending: session.pending_summary(),
            session,
        }
    }
}

/// Response of a desk action that produces a result
#[derive(Debug, Serialize)]
pub struct DeskActionResponse<T> {
    /// Session after the action
    pub session: LookupSessionView,
    /// What the action produced
    pub result: T,
}

/// Body of `POST /api/payments/stay`
#[derive(Debug, Deserialize)]
pub struct PayForStayRequest {
    /// What is being paid for
    #[serde(flatten)]
    pub stay: PastStayPayment,
    /// Payment method from the card reader
    pub payment_method: String,
}

/// Body of `POST /api/payments/extras`
#[derive(Debug, Deserialize)]
pub struct PurchaseExtrasRequest {
    /// What is being bought
    #[serde(flatten)]
    pub purchase: ExtrasPurchase,
    /// Payment method from the card reader
    pub payment_method: String,
}

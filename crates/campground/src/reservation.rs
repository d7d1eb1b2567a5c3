use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::BookingError;
use crate::inventory::SiteType;

lazy_static! {
    /// Digits with optional `+`, spaces, dots, dashes and parentheses
    static ref PHONE_NUMBER: Regex = Regex::new(r"^\+?[0-9 ().-]{7,20}$").unwrap();
}

/// Half-open date range `[start, end)`, counted in nights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First night of the stay
    pub start: NaiveDate,
    /// Departure day, not part of the stay
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting empty or inverted ones
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if end <= start {
            return Err(BookingError::invalid(format!(
                "end date {} must be after start date {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// A stay of `nights` nights starting on `start`
    pub fn from_nights(start: NaiveDate, nights: u32) -> Result<Self, BookingError> {
        if nights < 1 {
            return Err(BookingError::invalid("a stay must be at least one night"));
        }
        let end = start
            .checked_add_days(Days::new(u64::from(nights)))
            .ok_or_else(|| BookingError::invalid("stay runs past the supported calendar"))?;
        Ok(Self { start, end })
    }

    /// Number of nights covered
    pub fn nights(&self) -> u32 {
        (self.end - self.start).num_days().max(0) as u32
    }

    /// Whether the night of `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Whether the two ranges share at least one night
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Every night in the range
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One selected extra and how many units of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraSelection {
    /// Extra service id
    pub extra_service_id: i64,
    /// Units requested
    pub quantity: u32,
}

/// Where a reservation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Paid and waiting for arrival
    Booked,
    /// Guest has arrived
    CheckedIn,
    /// Guest has left
    CheckedOut,
}

impl ReservationStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Booked => "booked",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(ReservationStatus::Booked),
            "checked_in" => Ok(ReservationStatus::CheckedIn),
            "checked_out" => Ok(ReservationStatus::CheckedOut),
            other => Err(BookingError::invalid(format!(
                "unknown reservation status {}",
                other
            ))),
        }
    }
}

/// Guest information collected on the guest details screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GuestDetails {
    /// Guest's first name
    #[validate(custom(function = "not_blank"))]
    pub first_name: String,

    /// Guest's last name
    #[validate(custom(function = "not_blank"))]
    pub last_name: String,

    /// Contact email, also used for verification codes
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    /// Contact phone number
    #[validate(regex(path = *PHONE_NUMBER, message = "Please enter a valid phone number"))]
    pub phone: String,

    /// Adults in the party (over 13)
    #[validate(range(min = 1, message = "At least one adult is required"))]
    pub adult_count: u32,

    /// Children in the party
    pub child_count: u32,
}

impl GuestDetails {
    /// Name as stored on the reservation
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Adults plus children
    pub fn party_size(&self) -> u32 {
        self.adult_count + self.child_count
    }

    /// Checks required fields and the party size against the site type
    pub fn check(&self, site_type: &SiteType) -> Result<(), BookingError> {
        self.validate()
            .map_err(|e| BookingError::invalid(format!("Validation error: {}", e)))?;
        check_party_size(site_type, self.adult_count, self.child_count)
    }
}

/// Rejects parties larger than the site type allows; children count toward the limit
pub fn check_party_size(
    site_type: &SiteType,
    adult_count: u32,
    child_count: u32,
) -> Result<(), BookingError> {
    if adult_count < 1 {
        return Err(BookingError::invalid("At least one adult is required"));
    }
    let party = adult_count + child_count;
    if party > site_type.pricing.max_guests {
        return Err(BookingError::invalid(format!(
            "{} allows at most {} guests, got {}",
            site_type.name, site_type.pricing.max_guests, party
        )));
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("required");
        error.message = Some("This field is required".into());
        return Err(error);
    }
    Ok(())
}

/// A reservation ready to be stored; the id is assigned by storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReservation {
    /// Specific site, absent for site types without site selection
    pub site_id: Option<String>,
    /// Site type booked
    pub site_type_id: String,
    /// First night
    pub start_date: NaiveDate,
    /// Departure day (exclusive)
    pub end_date: NaiveDate,
    /// Guest's full name
    pub guest_name: String,
    /// Guest's email
    pub email: String,
    /// Guest's phone
    pub phone: String,
    /// Adults in the party
    pub adult_count: u32,
    /// Children in the party
    pub child_count: u32,
    /// Extras bought with the booking, in selection order
    pub extras: Vec<ExtraSelection>,
    /// Price charged at booking time
    pub total_price: Decimal,
}

impl NewReservation {
    /// The stay as a date range
    pub fn dates(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// A confirmed booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Identifier assigned by storage
    pub id: i64,
    /// Specific site, absent for site types without site selection
    pub site_id: Option<String>,
    /// Site type booked
    pub site_type_id: String,
    /// First night
    pub start_date: NaiveDate,
    /// Departure day (exclusive)
    pub end_date: NaiveDate,
    /// Guest's full name
    pub guest_name: String,
    /// Guest's email
    pub email: String,
    /// Guest's phone
    pub phone: String,
    /// Adults in the party
    pub adult_count: u32,
    /// Children in the party
    pub child_count: u32,
    /// Extras bought with the booking
    pub extras: Vec<ExtraSelection>,
    /// Price charged at booking time, never recomputed
    pub total_price: Decimal,
    /// Lifecycle status
    pub status: ReservationStatus,
}

impl Reservation {
    /// Builds the stored form of a new reservation
    pub fn from_new(id: i64, new: NewReservation) -> Self {
        Self {
            id,
            site_id: new.site_id,
            site_type_id: new.site_type_id,
            start_date: new.start_date,
            end_date: new.end_date,
            guest_name: new.guest_name,
            email: new.email,
            phone: new.phone,
            adult_count: new.adult_count,
            child_count: new.child_count,
            extras: new.extras,
            total_price: new.total_price,
            status: ReservationStatus::Booked,
        }
    }

    /// The stay as a date range
    pub fn dates(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Search rule shared by every ledger: exact id, case-insensitive name
    /// substring, case-insensitive exact email, or exact phone
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        let lowered = term.to_lowercase();

        self.id.to_string() == term
            || self.guest_name.to_lowercase().contains(&lowered)
            || self.email.to_lowercase() == lowered
            || self.phone == term
    }
}

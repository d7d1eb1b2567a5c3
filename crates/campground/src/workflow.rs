use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::availability::{
    AvailabilityWindow, OccupancyBoard, compute_max_run_length, fetch_availability, free_sites,
    site_occupancy, stay_fits,
};
use crate::collaborators::{GuestNotifier, PaymentGateway, ReservationStore, capture_payment};
use crate::config::KioskConfig;
use crate::error::{BookingError, ErrorKind};
use crate::inventory::{Inventory, Site};
use crate::pricing::{Quote, normalize_extras, quote};
use crate::reservation::{
    DateRange, ExtraSelection, GuestDetails, NewReservation, Reservation, check_party_size,
};

/// Screens of the booking wizard, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    /// Choose powered, unpowered, ...
    SiteTypeSelection,
    /// Choose arrival date and nights
    DateSelection,
    /// Choose a specific site, only for site types that require it
    SiteSelection,
    /// Enter guest contact details and party size
    GuestDetails,
    /// Add optional extras
    ExtrasSelection,
    /// Review the frozen total and pay
    ReviewAndPayment,
    /// Booking recorded
    Confirmed,
    /// Stopped after a reconciliation or conflict; staff must follow up
    Halted,
}

impl BookingStep {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStep::Confirmed | BookingStep::Halted)
    }
}

/// Step after `step`, skipping site selection when the site type does not require it
pub fn next_step(step: BookingStep, requires_site_selection: bool) -> Option<BookingStep> {
    match step {
        BookingStep::SiteTypeSelection => Some(BookingStep::DateSelection),
        BookingStep::DateSelection if requires_site_selection => Some(BookingStep::SiteSelection),
        BookingStep::DateSelection | BookingStep::SiteSelection => Some(BookingStep::GuestDetails),
        BookingStep::GuestDetails => Some(BookingStep::ExtrasSelection),
        BookingStep::ExtrasSelection => Some(BookingStep::ReviewAndPayment),
        BookingStep::ReviewAndPayment => Some(BookingStep::Confirmed),
        BookingStep::Confirmed | BookingStep::Halted => None,
    }
}

/// Step before `step`; `None` on the first step and on terminal steps
pub fn previous_step(step: BookingStep, requires_site_selection: bool) -> Option<BookingStep> {
    match step {
        BookingStep::SiteTypeSelection | BookingStep::Confirmed | BookingStep::Halted => None,
        BookingStep::DateSelection => Some(BookingStep::SiteTypeSelection),
        BookingStep::SiteSelection => Some(BookingStep::DateSelection),
        BookingStep::GuestDetails if requires_site_selection => Some(BookingStep::SiteSelection),
        BookingStep::GuestDetails => Some(BookingStep::DateSelection),
        BookingStep::ExtrasSelection => Some(BookingStep::GuestDetails),
        BookingStep::ReviewAndPayment => Some(BookingStep::ExtrasSelection),
    }
}

/// Operations the UI may offer at the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    /// [`BookingCoordinator::select_site_type`]
    SelectSiteType,
    /// [`BookingCoordinator::select_dates`]
    SelectDates,
    /// [`BookingCoordinator::select_site`]
    SelectSite,
    /// [`BookingCoordinator::submit_guest_details`]
    SubmitGuestDetails,
    /// [`BookingCoordinator::set_extras`]
    SetExtras,
    /// [`BookingCoordinator::confirm_and_pay`]
    ConfirmAndPay,
    /// [`BookingCoordinator::go_back`]
    GoBack,
}

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionHalt {
    /// Reconciliation or conflict
    pub kind: ErrorKind,
    /// Payment captured before the halt, if any
    pub payment_reference: Option<String>,
    /// Message for the guest
    pub message: String,
}

/// State of one guest's pass through the booking wizard
#[derive(Debug, Clone, Serialize)]
pub struct BookingSession {
    /// Session id
    pub id: Uuid,
    /// Current step
    pub step: BookingStep,
    /// Chosen site type
    pub site_type_id: Option<String>,
    /// Whether the chosen site type needs a specific site
    pub requires_site_selection: bool,
    /// Arrival date
    pub start_date: Option<NaiveDate>,
    /// Nights requested
    pub nights: Option<u32>,
    /// Longest stay available from `start_date`
    pub max_nights: Option<u32>,
    /// Chosen site
    pub site_id: Option<String>,
    /// Guest details
    pub guest: Option<GuestDetails>,
    /// Extras chosen
    pub extras: Vec<ExtraSelection>,
    /// Price frozen on reaching review and payment
    pub quote: Option<Quote>,
    /// Reference of the captured payment
    pub payment_reference: Option<String>,
    /// Id of the recorded reservation
    pub reservation_id: Option<i64>,
    /// Set when the session was stopped
    pub halt: Option<SessionHalt>,
}

impl BookingSession {
    /// A fresh session on the first step
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: BookingStep::SiteTypeSelection,
            site_type_id: None,
            requires_site_selection: false,
            start_date: None,
            nights: None,
            max_nights: None,
            site_id: None,
            guest: None,
            extras: Vec::new(),
            quote: None,
            payment_reference: None,
            reservation_id: None,
            halt: None,
        }
    }

    /// The chosen stay
    pub fn dates(&self) -> Option<DateRange> {
        match (self.start_date, self.nights) {
            (Some(start), Some(nights)) => DateRange::from_nights(start, nights).ok(),
            _ => None,
        }
    }

    /// Actions valid at the current step
    pub fn available_actions(&self) -> Vec<BookingAction> {
        let mut actions = match self.step {
            BookingStep::SiteTypeSelection => vec![BookingAction::SelectSiteType],
            BookingStep::DateSelection => vec![BookingAction::SelectDates],
            BookingStep::SiteSelection => vec![BookingAction::SelectSite],
            BookingStep::GuestDetails => vec![BookingAction::SubmitGuestDetails],
            BookingStep::ExtrasSelection => vec![BookingAction::SetExtras],
            BookingStep::ReviewAndPayment => vec![BookingAction::ConfirmAndPay],
            BookingStep::Confirmed | BookingStep::Halted => return Vec::new(),
        };
        if previous_step(self.step, self.requires_site_selection).is_some() {
            actions.push(BookingAction::GoBack);
        }
        actions
    }

    /// Whether submitting payment again is allowed
    pub fn can_retry_payment(&self) -> bool {
        self.available_actions()
            .contains(&BookingAction::ConfirmAndPay)
    }

    fn expect_step(&self, expected: BookingStep) -> Result<(), BookingError> {
        if let Some(halt) = &self.halt {
            return Err(BookingError::invalid(format!(
                "Booking was stopped: {}",
                halt.message
            )));
        }
        if self.step != expected {
            return Err(BookingError::invalid(format!(
                "{:?} is not allowed at step {:?}",
                expected, self.step
            )));
        }
        Ok(())
    }

    fn site_type_id(&self) -> Result<&str, BookingError> {
        self.site_type_id
            .as_deref()
            .ok_or_else(|| BookingError::invalid("No site type selected"))
    }

    fn advance(&mut self) {
        if let Some(next) = next_step(self.step, self.requires_site_selection) {
            self.step = next;
        }
    }

    fn halt(&mut self, kind: ErrorKind, payment_reference: Option<String>, message: &str) {
        self.step = BookingStep::Halted;
        self.halt = Some(SessionHalt {
            kind,
            payment_reference,
            message: message.to_string(),
        });
    }
}

/// Kiosk-wide settings the UI needs to render the wizard
#[derive(Debug, Clone, Serialize)]
pub struct KioskSettings {
    /// Currency code
    pub currency: String,
    /// Days covered by an availability window
    pub booking_horizon_days: u32,
    /// Pre-filled adult count
    pub default_adult_count: u32,
    /// Pre-filled child count
    pub default_child_count: u32,
    /// Campground rules
    pub rules: Vec<String>,
}

/// Runs the booking wizard against the collaborators
#[derive(Clone)]
pub struct BookingCoordinator {
    inventory: Arc<Inventory>,
    store: Arc<dyn ReservationStore>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn GuestNotifier>,
    config: KioskConfig,
}

impl BookingCoordinator {
    /// Creates a new coordinator
    pub fn new(
        inventory: Arc<Inventory>,
        store: Arc<dyn ReservationStore>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn GuestNotifier>,
        config: KioskConfig,
    ) -> Self {
        Self {
            inventory,
            store,
            payments,
            notifier,
            config,
        }
    }

    /// Reference data
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Kiosk settings
    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    /// Settings projection for the UI
    pub fn kiosk_settings(&self) -> KioskSettings {
        KioskSettings {
            currency: self.config.currency.clone(),
            booking_horizon_days: self.config.booking_horizon_days,
            default_adult_count: self.config.default_adult_count,
            default_child_count: self.config.default_child_count,
            rules: self.inventory.rules().to_vec(),
        }
    }

    /// Starts a new booking
    pub fn start_session(&self) -> BookingSession {
        let session = BookingSession::new();
        debug!("Started booking session {}", session.id);
        session
    }

    /// Remaining capacity per night
    pub async fn get_availability(
        &self,
        site_type_id: &str,
        window_start: NaiveDate,
        window_length_days: u32,
    ) -> Result<AvailabilityWindow, BookingError> {
        fetch_availability(
            &self.inventory,
            self.store.as_ref(),
            site_type_id,
            window_start,
            window_length_days,
        )
        .await
    }

    /// Itemised price of a stay
    pub fn get_quote(
        &self,
        site_type_id: &str,
        nights: u32,
        adult_count: u32,
        child_count: u32,
        extras: &[ExtraSelection],
    ) -> Result<Quote, BookingError> {
        quote(
            &self.inventory,
            site_type_id,
            nights,
            adult_count,
            child_count,
            extras,
        )
    }

    /// Sites of the type free for the whole stay
    pub async fn list_available_sites(
        &self,
        site_type_id: &str,
        start: NaiveDate,
        nights: u32,
    ) -> Result<Vec<Site>, BookingError> {
        let site_type = self.inventory.site_type(site_type_id)?;
        let stay = DateRange::from_nights(start, nights)?;
        if !site_type.limited_availability {
            return Ok(Vec::new());
        }
        let reservations = self
            .store
            .query_reservations_overlapping(&site_type.id, &stay)
            .await?;
        Ok(
            free_sites(&self.inventory, site_type_id, &stay, &reservations, None)?
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Who is staying where on `date`
    pub async fn site_occupancy(
        &self,
        site_type_id: &str,
        date: NaiveDate,
    ) -> Result<OccupancyBoard, BookingError> {
        site_occupancy(&self.inventory, self.store.as_ref(), site_type_id, date).await
    }

    /// Chooses the site type. Guest details entered earlier are re-checked
    /// against its party limit; a previously chosen site is cleared when the
    /// type changes.
    pub fn select_site_type(
        &self,
        session: &mut BookingSession,
        site_type_id: &str,
    ) -> Result<(), BookingError> {
        session.expect_step(BookingStep::SiteTypeSelection)?;
        let site_type = self.inventory.site_type(site_type_id)?;
        if let Some(guest) = &session.guest {
            check_party_size(site_type, guest.adult_count, guest.child_count)?;
        }

        if session.site_type_id.as_deref() != Some(site_type.id.as_str()) {
            session.site_id = None;
            session.max_nights = None;
            session.quote = None;
        }
        session.site_type_id = Some(site_type.id.clone());
        session.requires_site_selection = site_type.requires_site_selection;
        session.advance();
        Ok(())
    }

    /// Chooses arrival date and length of stay.
    ///
    /// `nights` must not exceed the run of nights with capacity left from
    /// `start_date`. A ledger outage is [`BookingError::Unavailable`].
    pub async fn select_dates(
        &self,
        session: &mut BookingSession,
        start_date: NaiveDate,
        nights: u32,
    ) -> Result<(), BookingError> {
        session.expect_step(BookingStep::DateSelection)?;
        let site_type_id = session.site_type_id()?.to_string();

        if start_date < Local::now().date_naive() {
            return Err(BookingError::invalid(format!(
                "arrival date {} is in the past",
                start_date
            )));
        }
        if nights < 1 {
            return Err(BookingError::invalid("a stay must be at least one night"));
        }

        let window = self
            .get_availability(&site_type_id, start_date, self.config.booking_horizon_days)
            .await?;
        let max_nights = compute_max_run_length(&window, start_date);
        if max_nights == 0 {
            return Err(BookingError::invalid(format!(
                "no {} sites are free on {}",
                site_type_id, start_date
            )));
        }
        if nights > max_nights {
            return Err(BookingError::invalid(format!(
                "only {} nights are available from {}",
                max_nights, start_date
            )));
        }

        session.start_date = Some(start_date);
        session.nights = Some(nights);
        session.max_nights = Some(max_nights);
        session.quote = None;
        session.advance();
        Ok(())
    }

    /// Chooses a specific site free for the whole stay
    pub async fn select_site(
        &self,
        session: &mut BookingSession,
        site_id: &str,
    ) -> Result<(), BookingError> {
        session.expect_step(BookingStep::SiteSelection)?;
        let site_type_id = session.site_type_id()?.to_string();
        let stay = session
            .dates()
            .ok_or_else(|| BookingError::invalid("No dates selected"))?;

        let site = self.inventory.site(site_id)?;
        if site.site_type_id != site_type_id {
            return Err(BookingError::invalid(format!(
                "site {} is not a {} site",
                site.number, site_type_id
            )));
        }
        let available = self
            .list_available_sites(&site_type_id, stay.start, stay.nights())
            .await?;
        if !available.iter().any(|s| s.id == site.id) {
            return Err(BookingError::invalid(format!(
                "site {} is already booked for {}",
                site.number, stay
            )));
        }

        session.site_id = Some(site.id.clone());
        session.advance();
        Ok(())
    }

    /// Records guest contact details and party size
    pub fn submit_guest_details(
        &self,
        session: &mut BookingSession,
        guest: GuestDetails,
    ) -> Result<(), BookingError> {
        session.expect_step(BookingStep::GuestDetails)?;
        let site_type = self.inventory.site_type(session.site_type_id()?)?;
        guest.check(site_type)?;

        session.guest = Some(guest);
        session.advance();
        Ok(())
    }

    /// Records extras and freezes the price for review
    pub fn set_extras(
        &self,
        session: &mut BookingSession,
        extras: &[ExtraSelection],
    ) -> Result<(), BookingError> {
        session.expect_step(BookingStep::ExtrasSelection)?;
        let site_type_id = session.site_type_id()?.to_string();
        let nights = session
            .nights
            .ok_or_else(|| BookingError::invalid("No dates selected"))?;
        let guest = session
            .guest
            .as_ref()
            .ok_or_else(|| BookingError::invalid("No guest details entered"))?;

        let extras = normalize_extras(&self.inventory, extras)?;
        let frozen = self.get_quote(
            &site_type_id,
            nights,
            guest.adult_count,
            guest.child_count,
            &extras,
        )?;

        session.extras = extras;
        session.quote = Some(frozen);
        session.advance();
        Ok(())
    }

    /// Takes payment for the frozen total and records the reservation.
    ///
    /// A decline leaves the session on review and payment so the guest can try
    /// again. If the stay was taken since dates were chosen the session halts
    /// with [`BookingError::Conflict`] before any charge. If the reservation
    /// cannot be recorded after capture the session halts with
    /// [`BookingError::Reconciliation`] carrying the payment reference.
    pub async fn confirm_and_pay(
        &self,
        session: &mut BookingSession,
        payment_method: &str,
    ) -> Result<Reservation, BookingError> {
        session.expect_step(BookingStep::ReviewAndPayment)?;
        let new_reservation = self.build_reservation(session)?;
        let stay = new_reservation.dates();

        let fits = stay_fits(
            &self.inventory,
            self.store.as_ref(),
            &new_reservation.site_type_id,
            new_reservation.site_id.as_deref(),
            &stay,
            None,
        )
        .await?;
        if !fits {
            warn!(
                "Session {}: {} {} no longer fits, halting before payment",
                session.id, new_reservation.site_type_id, stay
            );
            let conflict = BookingError::Conflict(format!(
                "{} is no longer available for {}",
                new_reservation.site_type_id, stay
            ));
            session.halt(
                ErrorKind::Conflict,
                None,
                "Those dates were just taken. Please contact the campground office.",
            );
            return Err(conflict);
        }

        let idempotency_key = format!(
            "booking-{}-{}",
            session.id,
            crate::pricing::to_minor_units(new_reservation.total_price)?
        );
        let payment_reference = capture_payment(
            self.payments.as_ref(),
            new_reservation.total_price,
            &self.config.currency,
            &idempotency_key,
            payment_method,
        )
        .await?;
        session.payment_reference = Some(payment_reference.clone());

        match self.store.insert_reservation(&new_reservation).await {
            Ok(id) => {
                info!(
                    "Session {}: recorded reservation {} for payment {}",
                    session.id, id, payment_reference
                );
                session.reservation_id = Some(id);
                session.step = BookingStep::Confirmed;

                let reservation = Reservation::from_new(id, new_reservation);
                if let Err(e) = self.notifier.send_booking_confirmation(&reservation).await {
                    warn!("Failed to send confirmation for reservation {}: {}", id, e);
                }
                Ok(reservation)
            }
            Err(e) => {
                error!(
                    "Session {}: payment {} captured but reservation insert failed: {}",
                    session.id, payment_reference, e
                );
                session.halt(
                    ErrorKind::Reconciliation,
                    Some(payment_reference.clone()),
                    "Your payment was received but the booking could not be saved. Please contact the campground office.",
                );
                Err(BookingError::Reconciliation {
                    payment_reference,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Returns to the previous step, keeping everything entered
    pub fn go_back(&self, session: &mut BookingSession) -> Result<(), BookingError> {
        let previous = previous_step(session.step, session.requires_site_selection)
            .ok_or_else(|| {
                BookingError::invalid(format!("cannot go back from {:?}", session.step))
            })?;
        session.step = previous;
        Ok(())
    }

    fn build_reservation(&self, session: &BookingSession) -> Result<NewReservation, BookingError> {
        let site_type = self.inventory.site_type(session.site_type_id()?)?;
        let stay = session
            .dates()
            .ok_or_else(|| BookingError::invalid("No dates selected"))?;
        let guest = session
            .guest
            .as_ref()
            .ok_or_else(|| BookingError::invalid("No guest details entered"))?;
        let frozen = session
            .quote
            .as_ref()
            .ok_or_else(|| BookingError::invalid("Price has not been quoted"))?;

        let site_id = if site_type.requires_site_selection {
            Some(
                session
                    .site_id
                    .clone()
                    .ok_or_else(|| BookingError::invalid("No site selected"))?,
            )
        } else {
            None
        };

        Ok(NewReservation {
            site_id,
            site_type_id: site_type.id.clone(),
            start_date: stay.start,
            end_date: stay.end,
            guest_name: guest.full_name(),
            email: guest.email.trim().to_string(),
            phone: guest.phone.trim().to_string(),
            adult_count: guest.adult_count,
            child_count: guest.child_count,
            extras: session.extras.clone(),
            total_price: frozen.total,
        })
    }
}

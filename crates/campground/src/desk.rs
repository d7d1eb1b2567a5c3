use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::availability::stay_fits;
use crate::collaborators::{GuestNotifier, PaymentGateway, ReservationStore, capture_payment};
use crate::config::KioskConfig;
use crate::error::{BookingError, ErrorKind};
use crate::inventory::Inventory;
use crate::pricing::{extras_total, normalize_extras, to_minor_units};
use crate::reservation::{DateRange, ExtraSelection, Reservation, ReservationStatus};
use crate::verification::VerificationCodes;
use crate::workflow::SessionHalt;

/// Which terminal action a desk session leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeskFlow {
    /// Confirm arrival
    CheckIn,
    /// Pay for extras and optionally depart
    CheckOut,
    /// Change dates or cancel
    Manage,
}

/// Lookup state shared by every desk flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStep {
    /// Waiting for a search term
    Search,
    /// Nothing matched; only a new search is possible
    NotFound,
    /// Several matches; the guest must pick one
    Select,
    /// Waiting for the code sent to the reservation's contact details
    Verify,
    /// Reservation unlocked; the flow's action may run
    Action,
    /// Action completed
    Done,
    /// Stopped after a reconciliation or conflict
    Halted,
}

/// What an unverified guest sees of a matching reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationSummary {
    /// Reservation id
    pub id: i64,
    /// Guest's name
    pub guest_name: String,
    /// Site type booked
    pub site_type_id: String,
    /// First night
    pub start_date: NaiveDate,
    /// Departure day
    pub end_date: NaiveDate,
}

impl From<&Reservation> for ReservationSummary {
    fn from(reservation: &Reservation) -> Self {
        Self {
            id: reservation.id,
            guest_name: reservation.guest_name.clone(),
            site_type_id: reservation.site_type_id.clone(),
            start_date: reservation.start_date,
            end_date: reservation.end_date,
        }
    }
}

/// State of one desk lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupSession {
    /// Session id, also the verification code key
    pub id: Uuid,
    /// Flow this lookup gates
    pub flow: DeskFlow,
    /// Current step
    pub step: LookupStep,
    /// Last search term
    pub term: Option<String>,
    /// Matches offered for selection
    pub matches: Vec<ReservationSummary>,
    /// Reservation awaiting a verification code
    #[serde(skip)]
    pending: Option<Reservation>,
    /// Unlocked reservation
    pub reservation: Option<Reservation>,
    /// Reference of a payment taken at the desk
    pub payment_reference: Option<String>,
    /// Set when the session was stopped
    pub halt: Option<SessionHalt>,
}

impl LookupSession {
    /// A fresh lookup for `flow`
    pub fn new(flow: DeskFlow) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow,
            step: LookupStep::Search,
            term: None,
            matches: Vec::new(),
            pending: None,
            reservation: None,
            payment_reference: None,
            halt: None,
        }
    }

    /// Summary of the reservation waiting for verification
    pub fn pending_summary(&self) -> Option<ReservationSummary> {
        self.pending.as_ref().map(ReservationSummary::from)
    }

    fn expect(&self, flow: Option<DeskFlow>, step: LookupStep) -> Result<(), BookingError> {
        if let Some(halt) = &self.halt {
            return Err(BookingError::invalid(format!(
                "Desk session was stopped: {}",
                halt.message
            )));
        }
        if let Some(flow) = flow {
            if self.flow != flow {
                return Err(BookingError::invalid(format!(
                    "{:?} is not part of the {:?} flow",
                    flow, self.flow
                )));
            }
        }
        if self.step != step {
            return Err(BookingError::invalid(format!(
                "not allowed at step {:?}",
                self.step
            )));
        }
        Ok(())
    }

    fn unlocked(&self) -> Result<&Reservation, BookingError> {
        self.reservation
            .as_ref()
            .ok_or_else(|| BookingError::invalid("No reservation unlocked"))
    }

    fn code_key(&self) -> String {
        self.id.to_string()
    }
}

/// Result of a check-in
#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    /// The checked-in reservation
    pub reservation: Reservation,
    /// Label of the assigned site, if any
    pub site_number: Option<String>,
    /// Campground rules to show the guest
    pub rules: Vec<String>,
}

/// Result of a check-out
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutReceipt {
    /// The reservation after check-out
    pub reservation: Reservation,
    /// Extras bought at the desk
    pub extras: Vec<ExtraSelection>,
    /// Amount charged for them
    pub amount_charged: rust_decimal::Decimal,
    /// Reference of the payment, absent when nothing was charged
    pub payment_reference: Option<String>,
}

/// Runs the check-in, check-out and manage-reservation flows
#[derive(Clone)]
pub struct ReservationDesk {
    inventory: Arc<Inventory>,
    store: Arc<dyn ReservationStore>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn GuestNotifier>,
    codes: Arc<VerificationCodes>,
    config: KioskConfig,
}

impl ReservationDesk {
    /// Creates a new desk
    pub fn new(
        inventory: Arc<Inventory>,
        store: Arc<dyn ReservationStore>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn GuestNotifier>,
        codes: Arc<VerificationCodes>,
        config: KioskConfig,
    ) -> Self {
        Self {
            inventory,
            store,
            payments,
            notifier,
            codes,
            config,
        }
    }

    /// Starts a lookup for `flow`
    pub fn start_session(&self, flow: DeskFlow) -> LookupSession {
        LookupSession::new(flow)
    }

    /// Searches by reservation id, name, email or phone.
    ///
    /// No match ends in [`LookupStep::NotFound`]. A single match whose id is
    /// exactly the term is unlocked directly; any other single match needs a
    /// verification code; several matches need a selection first.
    pub async fn search(&self, session: &mut LookupSession, term: &str) -> Result<(), BookingError> {
        if !matches!(
            session.step,
            LookupStep::Search | LookupStep::NotFound | LookupStep::Select | LookupStep::Verify
        ) {
            return Err(BookingError::invalid(format!(
                "not allowed at step {:?}",
                session.step
            )));
        }
        let term = term.trim();
        if term.is_empty() {
            return Err(BookingError::invalid("Please enter a name, email, phone or booking number"));
        }

        let mut found = self.store.search_reservations(term).await?;
        self.codes.revoke(&session.code_key());
        session.term = Some(term.to_string());
        session.matches.clear();
        session.pending = None;

        match found.len() {
            0 => {
                info!("Desk session {}: no reservation matched", session.id);
                session.step = LookupStep::NotFound;
                Ok(())
            }
            1 if found[0].id.to_string() == term => {
                info!(
                    "Desk session {}: reservation {} matched by id",
                    session.id, found[0].id
                );
                session.reservation = found.pop();
                session.step = LookupStep::Action;
                Ok(())
            }
            1 => {
                session.pending = found.pop();
                session.step = LookupStep::Verify;
                self.send_code(session).await
            }
            _ => {
                session.matches = found.iter().map(ReservationSummary::from).collect();
                session.step = LookupStep::Select;
                Ok(())
            }
        }
    }

    /// Picks one of several matches and sends it a verification code
    pub async fn select(
        &self,
        session: &mut LookupSession,
        reservation_id: i64,
    ) -> Result<(), BookingError> {
        session.expect(None, LookupStep::Select)?;
        if !session.matches.iter().any(|m| m.id == reservation_id) {
            return Err(BookingError::not_found("reservation", reservation_id));
        }
        let reservation = self
            .store
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| BookingError::not_found("reservation", reservation_id))?;

        session.pending = Some(reservation);
        session.step = LookupStep::Verify;
        self.send_code(session).await
    }

    /// Checks the code and unlocks the reservation
    pub fn verify(&self, session: &mut LookupSession, code: &str) -> Result<(), BookingError> {
        session.expect(None, LookupStep::Verify)?;
        if !self.codes.verify(&session.code_key(), code)? {
            return Err(BookingError::invalid("Incorrect verification code"));
        }

        session.reservation = session.pending.take();
        session.matches.clear();
        session.step = LookupStep::Action;
        Ok(())
    }

    /// Issues and sends a new code, replacing the old one
    pub async fn resend_code(&self, session: &mut LookupSession) -> Result<(), BookingError> {
        session.expect(None, LookupStep::Verify)?;
        self.send_code(session).await
    }

    async fn send_code(&self, session: &LookupSession) -> Result<(), BookingError> {
        let reservation = session
            .pending
            .as_ref()
            .ok_or_else(|| BookingError::invalid("No reservation awaiting verification"))?;
        let code = self.codes.issue(&session.code_key());
        self.notifier
            .send_verification_code(reservation, &code)
            .await
            .inspect_err(|e| {
                warn!(
                    "Desk session {}: failed to send verification code: {}",
                    session.id, e
                )
            })
    }

    /// Marks the unlocked reservation as arrived
    pub async fn check_in(&self, session: &mut LookupSession) -> Result<CheckInReceipt, BookingError> {
        session.expect(Some(DeskFlow::CheckIn), LookupStep::Action)?;
        let reservation = session.unlocked()?;
        if reservation.status != ReservationStatus::Booked {
            return Err(BookingError::invalid(format!(
                "reservation {} is already {}",
                reservation.id,
                reservation.status.as_str()
            )));
        }

        let updated = self
            .store
            .update_reservation_status(reservation.id, ReservationStatus::CheckedIn)
            .await?;
        info!("Reservation {} checked in", updated.id);

        let site_number = match &updated.site_id {
            Some(site_id) => Some(self.inventory.site(site_id)?.number.clone()),
            None => None,
        };
        session.reservation = Some(updated.clone());
        session.step = LookupStep::Done;

        Ok(CheckInReceipt {
            reservation: updated,
            site_number,
            rules: self.inventory.rules().to_vec(),
        })
    }

    /// Charges for extras bought on the way out and, if `depart`, marks the
    /// reservation checked out.
    ///
    /// Payment is skipped when the extras come to nothing. If payment was
    /// captured but the status update fails the session halts with
    /// [`BookingError::Reconciliation`].
    pub async fn check_out(
        &self,
        session: &mut LookupSession,
        extras: &[ExtraSelection],
        payment_method: Option<&str>,
        depart: bool,
    ) -> Result<CheckOutReceipt, BookingError> {
        session.expect(Some(DeskFlow::CheckOut), LookupStep::Action)?;
        let reservation = session.unlocked()?.clone();
        if reservation.status == ReservationStatus::CheckedOut {
            return Err(BookingError::invalid(format!(
                "reservation {} has already checked out",
                reservation.id
            )));
        }

        let extras = normalize_extras(&self.inventory, extras)?;
        let amount = extras_total(&self.inventory, &extras)?;

        let payment_reference = if amount.is_zero() {
            None
        } else {
            let payment_method = payment_method
                .ok_or_else(|| BookingError::invalid("A payment method is required"))?;
            let key = format!("checkout-{}-{}", session.id, to_minor_units(amount)?);
            let reference = capture_payment(
                self.payments.as_ref(),
                amount,
                &self.config.currency,
                &key,
                payment_method,
            )
            .await?;
            session.payment_reference = Some(reference.clone());
            Some(reference)
        };

        let reservation = if depart {
            match self
                .store
                .update_reservation_status(reservation.id, ReservationStatus::CheckedOut)
                .await
            {
                Ok(updated) => {
                    info!("Reservation {} checked out", updated.id);
                    updated
                }
                Err(e) => match payment_reference {
                    Some(reference) => {
                        error!(
                            "Desk session {}: payment {} captured but check-out of reservation {} failed: {}",
                            session.id, reference, reservation.id, e
                        );
                        self.halt(session, ErrorKind::Reconciliation, Some(reference.clone()));
                        return Err(BookingError::Reconciliation {
                            payment_reference: reference,
                            reason: e.to_string(),
                        });
                    }
                    None => return Err(e),
                },
            }
        } else {
            reservation
        };

        session.reservation = Some(reservation.clone());
        session.step = LookupStep::Done;
        Ok(CheckOutReceipt {
            reservation,
            extras,
            amount_charged: amount,
            payment_reference,
        })
    }

    /// Moves the unlocked reservation to new dates. The stored price is kept.
    pub async fn change_dates(
        &self,
        session: &mut LookupSession,
        start_date: NaiveDate,
        nights: u32,
    ) -> Result<Reservation, BookingError> {
        session.expect(Some(DeskFlow::Manage), LookupStep::Action)?;
        let reservation = session.unlocked()?.clone();
        if reservation.status != ReservationStatus::Booked {
            return Err(BookingError::invalid(format!(
                "reservation {} is {} and can no longer be changed",
                reservation.id,
                reservation.status.as_str()
            )));
        }
        if start_date < Local::now().date_naive() {
            return Err(BookingError::invalid(format!(
                "arrival date {} is in the past",
                start_date
            )));
        }
        let stay = DateRange::from_nights(start_date, nights)?;

        let fits = stay_fits(
            &self.inventory,
            self.store.as_ref(),
            &reservation.site_type_id,
            reservation.site_id.as_deref(),
            &stay,
            Some(reservation.id),
        )
        .await?;
        if !fits {
            return Err(BookingError::invalid(format!(
                "{} is not available for {}",
                reservation.site_type_id, stay
            )));
        }

        let updated = match self
            .store
            .update_reservation_dates(reservation.id, stay.start, stay.end)
            .await
        {
            Ok(updated) => updated,
            Err(e @ BookingError::Conflict(_)) => {
                warn!(
                    "Desk session {}: date change for reservation {} conflicted",
                    session.id, reservation.id
                );
                self.halt(session, ErrorKind::Conflict, None);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        info!(
            "Reservation {} moved from {} to {}",
            updated.id,
            reservation.dates(),
            updated.dates()
        );

        session.reservation = Some(updated.clone());
        session.step = LookupStep::Done;
        Ok(updated)
    }

    /// Cancels the unlocked reservation
    pub async fn cancel(&self, session: &mut LookupSession) -> Result<(), BookingError> {
        session.expect(Some(DeskFlow::Manage), LookupStep::Action)?;
        let reservation = session.unlocked()?;
        if reservation.status != ReservationStatus::Booked {
            return Err(BookingError::invalid(format!(
                "reservation {} is {} and can no longer be cancelled",
                reservation.id,
                reservation.status.as_str()
            )));
        }
        let id = reservation.id;

        self.store.delete_reservation(id).await?;
        info!("Reservation {} cancelled", id);

        session.reservation = None;
        session.step = LookupStep::Done;
        Ok(())
    }

    fn halt(&self, session: &mut LookupSession, kind: ErrorKind, payment_reference: Option<String>) {
        let message = match kind {
            ErrorKind::Reconciliation => {
                "Your payment was received but the reservation could not be updated. Please contact the campground office."
            }
            _ => "Those dates were just taken. Please contact the campground office.",
        };
        session.step = LookupStep::Halted;
        session.halt = Some(SessionHalt {
            kind,
            payment_reference,
            message: message.to_string(),
        });
    }
}

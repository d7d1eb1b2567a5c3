use actix_web::{HttpResponse, Result, web};
use campground::{BookingCoordinator, BookingError, BookingSession, GuestDetails};
use uuid::Uuid;

use crate::sessions::SessionStore;
use crate::types::*;

type BookingSessions = web::Data<SessionStore<BookingSession>>;

fn session_view(session: BookingSession) -> HttpResponse {
    HttpResponse::Ok().json(BookingSessionView::from(session))
}

/// Starts a booking wizard session
pub async fn start_booking(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
) -> Result<HttpResponse, BookingError> {
    let session = coordinator.start_session();
    sessions.insert(session.clone());
    log::info!("🏕️ Booking session {} started", session.id);

    Ok(HttpResponse::Created().json(BookingSessionView::from(session)))
}

/// Current state of a booking session
pub async fn get_booking(
    sessions: BookingSessions,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    let session = sessions.snapshot(path.into_inner()).await?;
    Ok(session_view(session))
}

/// Site type selection step
pub async fn booking_select_site_type(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
    request: web::Json<SelectSiteTypeRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    coordinator.select_site_type(&mut session, &request.site_type_id)?;

    Ok(session_view(session.clone()))
}

/// Date selection step
pub async fn booking_select_dates(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
    request: web::Json<SelectDatesRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    coordinator
        .select_dates(&mut session, request.start_date, request.nights)
        .await?;

    Ok(session_view(session.clone()))
}

/// Site selection step
pub async fn booking_select_site(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
    request: web::Json<SelectSiteRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    coordinator.select_site(&mut session, &request.site_id).await?;

    Ok(session_view(session.clone()))
}

/// Guest details step
pub async fn booking_submit_guest(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
    request: web::Json<GuestDetails>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    coordinator.submit_guest_details(&mut session, request.into_inner())?;

    Ok(session_view(session.clone()))
}

/// Extras step; freezes the price for review
pub async fn booking_set_extras(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
    request: web::Json<ExtrasRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    coordinator.set_extras(&mut session, &request.extras)?;

    Ok(session_view(session.clone()))
}

/// Review and payment step.
///
/// The session stays locked until the reservation is stored, so a second tap
/// finds it confirmed. A halt is kept when the error is returned and
/// `GET /api/bookings/{id}` shows the payment reference to staff.
pub async fn booking_pay(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
    request: web::Json<PayRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    let reservation = coordinator
        .confirm_and_pay(&mut session, &request.payment_method)
        .await?;

    Ok(HttpResponse::Ok().json(BookingConfirmation {
        session: session.clone().into(),
        reservation,
    }))
}

/// Returns to the previous step, keeping entered data
pub async fn booking_back(
    coordinator: web::Data<BookingCoordinator>,
    sessions: BookingSessions,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    coordinator.go_back(&mut session)?;

    Ok(session_view(session.clone()))
}

use actix_web::{HttpResponse, Result, web};
use campground::{BookingError, LookupSession, ReservationDesk};
use uuid::Uuid;

use crate::sessions::SessionStore;
use crate::types::*;

type DeskSessions = web::Data<SessionStore<LookupSession>>;

fn lookup_view(session: LookupSession) -> HttpResponse {
    HttpResponse::Ok().json(LookupSessionView::from(session))
}

/// Starts a check-in, check-out or manage session
pub async fn start_desk(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    request: web::Json<StartDeskRequest>,
) -> Result<HttpResponse, BookingError> {
    let session = desk.start_session(request.flow);
    sessions.insert(session.clone());

    Ok(HttpResponse::Created().json(LookupSessionView::from(session)))
}

/// Current state of a desk session
pub async fn get_desk(
    sessions: DeskSessions,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    Ok(lookup_view(sessions.snapshot(path.into_inner()).await?))
}

/// Looks up reservations by number, name, email or phone
pub async fn desk_search(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
    request: web::Json<SearchRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    desk.search(&mut session, &request.term).await?;

    Ok(lookup_view(session.clone()))
}

/// Picks one of several matches; a code is sent for it
pub async fn desk_select(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
    request: web::Json<SelectReservationRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    desk.select(&mut session, request.reservation_id).await?;

    Ok(lookup_view(session.clone()))
}

/// Checks the code the guest received
pub async fn desk_verify(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
    request: web::Json<VerifyRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    desk.verify(&mut session, request.code.trim())?;

    Ok(lookup_view(session.clone()))
}

/// Issues a fresh code
pub async fn desk_resend_code(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    desk.resend_code(&mut session).await?;

    Ok(lookup_view(session.clone()))
}

/// Marks the reservation checked in
pub async fn desk_check_in(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    let receipt = desk.check_in(&mut session).await?;

    Ok(HttpResponse::Ok().json(DeskActionResponse {
        session: session.clone().into(),
        result: receipt,
    }))
}

/// Charges for extras and optionally marks the reservation checked out
pub async fn desk_check_out(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
    request: web::Json<CheckOutRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    let receipt = desk
        .check_out(
            &mut session,
            &request.extras,
            request.payment_method.as_deref(),
            request.depart,
        )
        .await?;

    Ok(HttpResponse::Ok().json(DeskActionResponse {
        session: session.clone().into(),
        result: receipt,
    }))
}

/// Moves the reservation to new dates
pub async fn desk_change_dates(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
    request: web::Json<SelectDatesRequest>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    let reservation = desk
        .change_dates(&mut session, request.start_date, request.nights)
        .await?;

    Ok(HttpResponse::Ok().json(DeskActionResponse {
        session: session.clone().into(),
        result: reservation,
    }))
}

/// Cancels the reservation
pub async fn desk_cancel(
    desk: web::Data<ReservationDesk>,
    sessions: DeskSessions,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    let mut session = sessions.lock(path.into_inner()).await?;
    desk.cancel(&mut session).await?;

    Ok(lookup_view(session.clone()))
}

use actix_web::{HttpResponse, Result, web};
use campground::{BookingCoordinator, BookingError, compute_max_run_length};
use chrono::Local;
use serde::Serialize;

use crate::types::*;

/// Lists every site type with its pricing
pub async fn list_site_types(
    coordinator: web::Data<BookingCoordinator>,
) -> Result<HttpResponse, BookingError> {
    Ok(HttpResponse::Ok().json(coordinator.inventory().list_site_types()))
}

/// Lists the sites of one site type
pub async fn list_sites(
    coordinator: web::Data<BookingCoordinator>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let sites = coordinator.inventory().list_sites_for_type(&path)?;
    Ok(HttpResponse::Ok().json(sites))
}

/// Lists the extras on sale
pub async fn list_extras(
    coordinator: web::Data<BookingCoordinator>,
) -> Result<HttpResponse, BookingError> {
    Ok(HttpResponse::Ok().json(coordinator.inventory().list_extra_services()))
}

/// Lists the campground rules
pub async fn list_rules(
    coordinator: web::Data<BookingCoordinator>,
) -> Result<HttpResponse, BookingError> {
    Ok(HttpResponse::Ok().json(coordinator.inventory().rules()))
}

/// Currency, horizon and pre-filled party size
pub async fn get_kiosk_settings(
    coordinator: web::Data<BookingCoordinator>,
) -> Result<HttpResponse, BookingError> {
    Ok(HttpResponse::Ok().json(coordinator.kiosk_settings()))
}

#[derive(Serialize)]
struct AvailabilityResponse {
    #[serde(flatten)]
    window: campground::AvailabilityWindow,
    max_nights_from_start: u32,
}

/// Remaining capacity per night for a site type
pub async fn get_availability(
    coordinator: web::Data<BookingCoordinator>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, BookingError> {
    let start = query.start.unwrap_or_else(|| Local::now().date_naive());
    let days = query
        .days
        .unwrap_or(coordinator.config().booking_horizon_days);

    let window = coordinator
        .get_availability(&query.site_type, start, days)
        .await?;
    let max_nights_from_start = compute_max_run_length(&window, start);

    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        window,
        max_nights_from_start,
    }))
}

/// Sites free for a whole stay
pub async fn get_available_sites(
    coordinator: web::Data<BookingCoordinator>,
    query: web::Query<AvailableSitesQuery>,
) -> Result<HttpResponse, BookingError> {
    let sites = coordinator
        .list_available_sites(&query.site_type, query.start, query.nights)
        .await?;
    Ok(HttpResponse::Ok().json(sites))
}

/// Who occupies each site on a night
pub async fn get_occupancy(
    coordinator: web::Data<BookingCoordinator>,
    query: web::Query<OccupancyQuery>,
) -> Result<HttpResponse, BookingError> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    let board = coordinator.site_occupancy(&query.site_type, date).await?;
    Ok(HttpResponse::Ok().json(board))
}

/// Itemised price of a stay
pub async fn get_quote(
    coordinator: web::Data<BookingCoordinator>,
    request: web::Json<QuoteRequest>,
) -> Result<HttpResponse, BookingError> {
    let quote = coordinator.get_quote(
        &request.site_type_id,
        request.nights,
        request.adult_count,
        request.child_count,
        &request.extras,
    )?;
    Ok(HttpResponse::Ok().json(quote))
}

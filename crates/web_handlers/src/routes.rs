use actix_web::web;

use crate::booking_handlers::*;
use crate::desk_handlers::*;
use crate::reference_handlers::*;
use crate::walk_up_handlers::*;

/// Registers every `/api` route. Handlers expect `BookingCoordinator`,
/// `ReservationDesk`, `WalkUpDesk` and both session stores as app data.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Reference data
            .route("/site-types", web::get().to(list_site_types))
            .route("/site-types/{site_type_id}/sites", web::get().to(list_sites))
            .route("/extras", web::get().to(list_extras))
            .route("/rules", web::get().to(list_rules))
            .route("/kiosk", web::get().to(get_kiosk_settings))
            // Projections
            .route("/availability", web::get().to(get_availability))
            .route("/available-sites", web::get().to(get_available_sites))
            .route("/occupancy", web::get().to(get_occupancy))
            .route("/quote", web::post().to(get_quote))
            // Booking wizard
            .service(
                web::scope("/bookings")
                    .route("", web::post().to(start_booking))
                    .route("/{session_id}", web::get().to(get_booking))
                    .route("/{session_id}/site-type", web::post().to(booking_select_site_type))
                    .route("/{session_id}/dates", web::post().to(booking_select_dates))
                    .route("/{session_id}/site", web::post().to(booking_select_site))
                    .route("/{session_id}/guest", web::post().to(booking_submit_guest))
                    .route("/{session_id}/extras", web::post().to(booking_set_extras))
                    .route("/{session_id}/pay", web::post().to(booking_pay))
                    .route("/{session_id}/back", web::post().to(booking_back)),
            )
            // Desk flows
            .service(
                web::scope("/desk")
                    .route("", web::post().to(start_desk))
                    .route("/{session_id}", web::get().to(get_desk))
                    .route("/{session_id}/search", web::post().to(desk_search))
                    .route("/{session_id}/select", web::post().to(desk_select))
                    .route("/{session_id}/verify", web::post().to(desk_verify))
                    .route("/{session_id}/resend-code", web::post().to(desk_resend_code))
                    .route("/{session_id}/check-in", web::post().to(desk_check_in))
                    .route("/{session_id}/check-out", web::post().to(desk_check_out))
                    .route("/{session_id}/dates", web::post().to(desk_change_dates))
                    .route("/{session_id}/cancel", web::post().to(desk_cancel)),
            )
            // Walk-up payments
            .service(
                web::scope("/payments")
                    .route("/stay", web::post().to(pay_for_stay))
                    .route("/extras", web::post().to(purchase_extras)),
            ),
    );
}

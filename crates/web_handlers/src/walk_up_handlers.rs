use actix_web::{HttpResponse, Result, web};
use campground::{BookingError, WalkUpDesk};

use crate::types::*;

/// Pays for a stay that was never booked
pub async fn pay_for_stay(
    walk_up: web::Data<WalkUpDesk>,
    request: web::Json<PayForStayRequest>,
) -> Result<HttpResponse, BookingError> {
    let receipt = walk_up
        .pay_for_stay(&request.stay, &request.payment_method)
        .await?;
    Ok(HttpResponse::Ok().json(receipt))
}

/// Buys extras without a stay
pub async fn purchase_extras(
    walk_up: web::Data<WalkUpDesk>,
    request: web::Json<PurchaseExtrasRequest>,
) -> Result<HttpResponse, BookingError> {
    let receipt = walk_up
        .purchase_extras(&request.purchase, &request.payment_method)
        .await?;
    Ok(HttpResponse::Ok().json(receipt))
}

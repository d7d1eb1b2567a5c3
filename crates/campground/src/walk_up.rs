use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::collaborators::{PaymentGateway, capture_payment};
use crate::config::KioskConfig;
use crate::error::BookingError;
use crate::inventory::Inventory;
use crate::pricing::{Quote, extras_total, normalize_extras, quote, to_minor_units};
use crate::reservation::{ExtraSelection, check_party_size};

/// Payment for a stay that was never booked through the kiosk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastStayPayment {
    /// Client-generated id; resubmitting the same request cannot charge twice
    pub request_id: Uuid,
    /// Site type stayed on
    pub site_type_id: String,
    /// Nights stayed
    pub nights: u32,
    /// Guests over 13
    pub adult_count: u32,
    /// Guests 13 and under
    #[serde(default)]
    pub child_count: u32,
    /// Extras bought with the stay
    #[serde(default)]
    pub extras: Vec<ExtraSelection>,
}

/// Extras bought without a stay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrasPurchase {
    /// Client-generated id; resubmitting the same request cannot charge twice
    pub request_id: Uuid,
    /// Extras to buy
    pub extras: Vec<ExtraSelection>,
}

/// Result of a walk-up payment
#[derive(Debug, Clone, Serialize)]
pub struct WalkUpReceipt {
    /// Extras actually charged, zero quantities removed
    pub extras: Vec<ExtraSelection>,
    /// Itemised stay price, absent for extras-only purchases
    pub quote: Option<Quote>,
    /// Amount charged
    pub amount_charged: Decimal,
    /// Processor reference
    pub payment_reference: String,
}

/// Takes one-off payments that leave the reservation ledger untouched
#[derive(Clone)]
pub struct WalkUpDesk {
    inventory: Arc<Inventory>,
    payments: Arc<dyn PaymentGateway>,
    config: KioskConfig,
}

impl WalkUpDesk {
    /// Creates a new walk-up desk
    pub fn new(inventory: Arc<Inventory>, payments: Arc<dyn PaymentGateway>, config: KioskConfig) -> Self {
        Self {
            inventory,
            payments,
            config,
        }
    }

    /// Prices a past stay with the usual rules and charges for it
    pub async fn pay_for_stay(
        &self,
        request: &PastStayPayment,
        payment_method: &str,
    ) -> Result<WalkUpReceipt, BookingError> {
        let site_type = self.inventory.site_type(&request.site_type_id)?;
        check_party_size(site_type, request.adult_count, request.child_count)?;
        let extras = normalize_extras(&self.inventory, &request.extras)?;
        let stay = quote(
            &self.inventory,
            &site_type.id,
            request.nights,
            request.adult_count,
            request.child_count,
            &extras,
        )?;

        let key = format!("stay-{}-{}", request.request_id, to_minor_units(stay.total)?);
        let payment_reference = capture_payment(
            self.payments.as_ref(),
            stay.total,
            &self.config.currency,
            &key,
            payment_method,
        )
        .await?;
        info!(
            "Walk-up payment {} for {} nights on {}",
            payment_reference, request.nights, site_type.id
        );

        Ok(WalkUpReceipt {
            extras,
            amount_charged: stay.total,
            quote: Some(stay),
            payment_reference,
        })
    }

    /// Charges for extras alone; an empty selection is rejected
    pub async fn purchase_extras(
        &self,
        request: &ExtrasPurchase,
        payment_method: &str,
    ) -> Result<WalkUpReceipt, BookingError> {
        let extras = normalize_extras(&self.inventory, &request.extras)?;
        if extras.is_empty() {
            return Err(BookingError::invalid("Please select at least one extra"));
        }
        let amount = extras_total(&self.inventory, &extras)?;

        let key = format!("extras-{}-{}", request.request_id, to_minor_units(amount)?);
        let payment_reference = capture_payment(
            self.payments.as_ref(),
            amount,
            &self.config.currency,
            &key,
            payment_method,
        )
        .await?;
        info!("Walk-up extras payment {} for {}", payment_reference, amount);

        Ok(WalkUpReceipt {
            extras,
            quote: None,
            amount_charged: amount,
            payment_reference,
        })
    }
}

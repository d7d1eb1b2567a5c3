use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::BookingError;
use crate::inventory::{Inventory, SiteType};
use crate::reservation::ExtraSelection;

/// Itemised price of a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Nights charged
    pub nights: u32,
    /// Adults above the site type's base guests
    pub extra_adults: u32,
    /// `base_price * nights`
    pub base_charge: Decimal,
    /// `extra_guest_price * extra_adults * nights`
    pub extra_guest_charge: Decimal,
    /// Sum of extras, charged once per stay
    pub extras_charge: Decimal,
    /// Amount due
    pub total: Decimal,
}

/// Prices a stay.
///
/// Children never attract the extra guest surcharge. Extras are one-off
/// purchases and are not multiplied by the number of nights.
pub fn quote(
    inventory: &Inventory,
    site_type_id: &str,
    nights: u32,
    adult_count: u32,
    _child_count: u32,
    extras: &[ExtraSelection],
) -> Result<Quote, BookingError> {
    let site_type = inventory.site_type(site_type_id)?;
    if nights < 1 {
        return Err(BookingError::invalid("a stay must be at least one night"));
    }
    if adult_count < 1 {
        return Err(BookingError::invalid("At least one adult is required"));
    }

    let extras_charge = extras_total(inventory, extras)?;
    Ok(stay_quote(site_type, nights, adult_count, extras_charge))
}

/// Total due for a stay, see [`quote`]
pub fn compute_price(
    inventory: &Inventory,
    site_type_id: &str,
    nights: u32,
    adult_count: u32,
    child_count: u32,
    extras: &[ExtraSelection],
) -> Result<Decimal, BookingError> {
    quote(
        inventory,
        site_type_id,
        nights,
        adult_count,
        child_count,
        extras,
    )
    .map(|q| q.total)
}

fn stay_quote(site_type: &SiteType, nights: u32, adult_count: u32, extras_charge: Decimal) -> Quote {
    let pricing = &site_type.pricing;
    let extra_adults = adult_count.saturating_sub(pricing.base_guests);
    let nights_dec = Decimal::from(nights);

    let base_charge = pricing.base_price * nights_dec;
    let extra_guest_charge = pricing.extra_guest_price * Decimal::from(extra_adults) * nights_dec;

    Quote {
        nights,
        extra_adults,
        base_charge,
        extra_guest_charge,
        extras_charge,
        total: base_charge + extra_guest_charge + extras_charge,
    }
}

/// Sum of `price * quantity` over the selection
pub fn extras_total(inventory: &Inventory, extras: &[ExtraSelection]) -> Result<Decimal, BookingError> {
    normalize_extras(inventory, extras)?
        .iter()
        .try_fold(Decimal::ZERO, |total, selection| {
            let extra = inventory.extra_service(selection.extra_service_id)?;
            Ok(total + extra.price * Decimal::from(selection.quantity))
        })
}

/// Validates an extras selection and drops zero-quantity lines.
///
/// Unknown ids are `NotFound`; more than one unit of an extra that does not
/// allow multiples, or the same extra listed twice, is `InvalidArgument`.
pub fn normalize_extras(
    inventory: &Inventory,
    extras: &[ExtraSelection],
) -> Result<Vec<ExtraSelection>, BookingError> {
    let mut normalized: Vec<ExtraSelection> = Vec::with_capacity(extras.len());
    for selection in extras {
        let extra = inventory.extra_service(selection.extra_service_id)?;
        if selection.quantity == 0 {
            continue;
        }
        if selection.quantity > 1 && !extra.allow_multiple {
            return Err(BookingError::invalid(format!(
                "{} can only be bought once",
                extra.name
            )));
        }
        if normalized
            .iter()
            .any(|s| s.extra_service_id == selection.extra_service_id)
        {
            return Err(BookingError::invalid(format!(
                "{} is listed more than once",
                extra.name
            )));
        }
        normalized.push(*selection);
    }
    Ok(normalized)
}

/// Converts a decimal amount to minor currency units (cents), rounding half
/// away from zero
pub fn to_minor_units(amount: Decimal) -> Result<i64, BookingError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(BookingError::invalid(format!(
            "amount {} must not be negative",
            amount
        )));
    }
    (amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| BookingError::invalid(format!("amount {} is too large", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ExtraService, InventoryDocument, Pricing};
    use std::str::FromStr;

    fn inventory() -> Inventory {
        Inventory::new(InventoryDocument {
            site_types: vec![SiteType {
                id: "powered".to_string(),
                name: "Powered Site".to_string(),
                icon: "Zap".to_string(),
                requires_site_selection: true,
                limited_availability: true,
                pool_size: None,
                pricing: Pricing {
                    base_price: Decimal::from(20),
                    extra_guest_price: Decimal::from(5),
                    base_guests: 2,
                    max_guests: 6,
                },
            }],
            sites: vec![],
            extra_services: vec![
                ExtraService {
                    id: 1,
                    name: "Dump Station".to_string(),
                    price: Decimal::from_str("5.00").unwrap(),
                    allow_multiple: true,
                },
                ExtraService {
                    id: 2,
                    name: "Firewood".to_string(),
                    price: Decimal::from(10),
                    allow_multiple: true,
                },
                ExtraService {
                    id: 3,
                    name: "Late Checkout".to_string(),
                    price: Decimal::from(15),
                    allow_multiple: false,
                },
            ],
            rules: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_children_do_not_pay_surcharge() {
        let inventory = inventory();

        let total = compute_price(&inventory, "powered", 3, 4, 1, &[]).unwrap();
        assert_eq!(total, Decimal::from(90));
    }

    #[test]
    fn test_extras_are_charged_once() {
        let inventory = inventory();
        let extras = [ExtraSelection {
            extra_service_id: 2,
            quantity: 2,
        }];

        let quote = quote(&inventory, "powered", 3, 4, 1, &extras).unwrap();
        assert_eq!(quote.base_charge, Decimal::from(60));
        assert_eq!(quote.extra_guest_charge, Decimal::from(30));
        assert_eq!(quote.extras_charge, Decimal::from(20));
        assert_eq!(quote.total, Decimal::from(110));
    }

    #[test]
    fn test_base_guests_pay_base_price_only() {
        let inventory = inventory();

        let quote = quote(&inventory, "powered", 2, 2, 3, &[]).unwrap();
        assert_eq!(quote.extra_adults, 0);
        assert_eq!(quote.total, Decimal::from(40));
    }

    #[test]
    fn test_rejects_zero_nights_and_unknown_ids() {
        let inventory = inventory();

        assert!(matches!(
            compute_price(&inventory, "powered", 0, 2, 0, &[]),
            Err(BookingError::InvalidArgument(_))
        ));
        assert!(matches!(
            compute_price(&inventory, "cabin", 1, 2, 0, &[]),
            Err(BookingError::NotFound { .. })
        ));
        assert!(matches!(
            compute_price(
                &inventory,
                "powered",
                1,
                2,
                0,
                &[ExtraSelection {
                    extra_service_id: 99,
                    quantity: 1
                }]
            ),
            Err(BookingError::NotFound { .. })
        ));
    }

    #[test]
    fn test_normalize_extras() {
        let inventory = inventory();

        let normalized = normalize_extras(
            &inventory,
            &[
                ExtraSelection {
                    extra_service_id: 1,
                    quantity: 0,
                },
                ExtraSelection {
                    extra_service_id: 3,
                    quantity: 1,
                },
            ],
        )
        .unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].extra_service_id, 3);

        let too_many = [ExtraSelection {
            extra_service_id: 3,
            quantity: 2,
        }];
        assert!(normalize_extras(&inventory, &too_many).is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::from(110)).unwrap(), 11000);
        assert_eq!(to_minor_units(Decimal::from_str("12.345").unwrap()).unwrap(), 1235);
        assert_eq!(to_minor_units(Decimal::from_str("0.005").unwrap()).unwrap(), 1);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
        assert!(to_minor_units(Decimal::from(-1)).is_err());
    }
}

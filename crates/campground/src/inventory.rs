use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// Pricing rules for a site type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Charge per night for the site
    pub base_price: Decimal,
    /// Charge per night for each adult above `base_guests`
    pub extra_guest_price: Decimal,
    /// Adults included in the base price
    pub base_guests: u32,
    /// Largest party (adults and children) the site type accepts
    pub max_guests: u32,
}

/// A category of campsite with its own pricing and capacity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteType {
    /// Unique identifier, e.g. `powered`
    pub id: String,
    /// Display name shown on the kiosk
    pub name: String,
    /// Icon tag used by the frontend
    pub icon: String,
    /// Whether the guest must pick a specific site
    pub requires_site_selection: bool,
    /// Whether capacity is tracked per site rather than as a pool
    pub limited_availability: bool,
    /// Pool size for site types without per-site tracking
    #[serde(default)]
    pub pool_size: Option<u32>,
    /// Pricing rules
    pub pricing: Pricing,
}

/// One physical, individually tracked site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Unique identifier, e.g. `P1`
    pub id: String,
    /// Site type this site belongs to
    pub site_type_id: String,
    /// Label painted on the site post, e.g. `A1`
    pub number: String,
}

/// An optional add-on purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraService {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Price per unit
    pub price: Decimal,
    /// Whether more than one unit may be bought
    pub allow_multiple: bool,
}

/// Serialized shape of the inventory, as stored in a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDocument {
    /// Site types on offer
    pub site_types: Vec<SiteType>,
    /// Individually tracked sites
    #[serde(default)]
    pub sites: Vec<Site>,
    /// Add-on purchases
    #[serde(default)]
    pub extra_services: Vec<ExtraService>,
    /// Campground rules shown after check-in and booking
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Immutable reference data for the campground
#[derive(Debug, Clone)]
pub struct Inventory {
    site_types: Vec<SiteType>,
    sites: Vec<Site>,
    extra_services: Vec<ExtraService>,
    rules: Vec<String>,
}

impl Inventory {
    /// Validates the document and builds the inventory
    pub fn new(document: InventoryDocument) -> Result<Self, BookingError> {
        let InventoryDocument {
            site_types,
            sites,
            extra_services,
            rules,
        } = document;

        let mut type_ids = HashSet::new();
        for site_type in &site_types {
            if !type_ids.insert(site_type.id.as_str()) {
                return Err(BookingError::invalid(format!(
                    "duplicate site type id {}",
                    site_type.id
                )));
            }
            validate_pricing(site_type)?;
            if !site_type.limited_availability && site_type.pool_size.is_none() {
                return Err(BookingError::invalid(format!(
                    "site type {} has pooled capacity but no pool size",
                    site_type.id
                )));
            }
        }

        let mut site_ids = HashSet::new();
        for site in &sites {
            if !site_ids.insert(site.id.as_str()) {
                return Err(BookingError::invalid(format!("duplicate site id {}", site.id)));
            }
            let owner = site_types
                .iter()
                .find(|t| t.id == site.site_type_id)
                .ok_or_else(|| BookingError::not_found("site type", &site.site_type_id))?;
            if !owner.limited_availability {
                return Err(BookingError::invalid(format!(
                    "site {} belongs to pooled site type {}",
                    site.id, owner.id
                )));
            }
        }

        let mut extra_ids = HashSet::new();
        for extra in &extra_services {
            if !extra_ids.insert(extra.id) {
                return Err(BookingError::invalid(format!(
                    "duplicate extra service id {}",
                    extra.id
                )));
            }
            if extra.price.is_sign_negative() {
                return Err(BookingError::invalid(format!(
                    "extra service {} has a negative price",
                    extra.id
                )));
            }
        }

        Ok(Self {
            site_types,
            sites,
            extra_services,
            rules,
        })
    }

    /// Parses and validates a JSON inventory document
    pub fn from_json(json: &str) -> Result<Self, BookingError> {
        let document: InventoryDocument = serde_json::from_str(json)
            .map_err(|e| BookingError::invalid(format!("Invalid inventory document: {}", e)))?;
        Self::new(document)
    }

    /// All site types
    pub fn list_site_types(&self) -> &[SiteType] {
        &self.site_types
    }

    /// Looks up a site type by id
    pub fn site_type(&self, site_type_id: &str) -> Result<&SiteType, BookingError> {
        self.site_types
            .iter()
            .find(|t| t.id == site_type_id)
            .ok_or_else(|| BookingError::not_found("site type", site_type_id))
    }

    /// Sites of a site type, empty for pooled types
    pub fn list_sites_for_type(&self, site_type_id: &str) -> Result<Vec<&Site>, BookingError> {
        let site_type = self.site_type(site_type_id)?;
        Ok(self
            .sites
            .iter()
            .filter(|s| s.site_type_id == site_type.id)
            .collect())
    }

    /// Looks up a site by id
    pub fn site(&self, site_id: &str) -> Result<&Site, BookingError> {
        self.sites
            .iter()
            .find(|s| s.id == site_id)
            .ok_or_else(|| BookingError::not_found("site", site_id))
    }

    /// All extra services
    pub fn list_extra_services(&self) -> &[ExtraService] {
        &self.extra_services
    }

    /// Looks up an extra service by id
    pub fn extra_service(&self, extra_service_id: i64) -> Result<&ExtraService, BookingError> {
        self.extra_services
            .iter()
            .find(|e| e.id == extra_service_id)
            .ok_or_else(|| BookingError::not_found("extra service", extra_service_id))
    }

    /// Campground rules
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Number of stays of this type that can overlap on a single night
    pub fn total_capacity(&self, site_type: &SiteType) -> u32 {
        if site_type.limited_availability {
            self.sites
                .iter()
                .filter(|s| s.site_type_id == site_type.id)
                .count() as u32
        } else {
            site_type.pool_size.unwrap_or(0)
        }
    }

    /// The inventory as a serializable document
    pub fn to_document(&self) -> InventoryDocument {
        InventoryDocument {
            site_types: self.site_types.clone(),
            sites: self.sites.clone(),
            extra_services: self.extra_services.clone(),
            rules: self.rules.clone(),
        }
    }
}

fn validate_pricing(site_type: &SiteType) -> Result<(), BookingError> {
    let pricing = &site_type.pricing;
    if pricing.base_price.is_sign_negative() || pricing.extra_guest_price.is_sign_negative() {
        return Err(BookingError::invalid(format!(
            "site type {} has a negative price",
            site_type.id
        )));
    }
    if pricing.max_guests == 0 || pricing.base_guests > pricing.max_guests {
        return Err(BookingError::invalid(format!(
            "site type {} must allow at least one guest and no fewer than its base guests",
            site_type.id
        )));
    }
    Ok(())
}

use campground::{
    BookingError, ExtraService, Inventory, InventoryDocument, Pricing, Site, SiteType,
};
use sqlx::{PgPool, Row};

use crate::error::map_sqlx_error;

/// Loads site types, sites, extras and rules and validates them as one inventory
pub async fn load_inventory(pool: &PgPool) -> Result<Inventory, BookingError> {
    let site_types = sqlx::query(
        r#"
        SELECT
            id, name, icon, requires_site_selection, limited_availability, pool_size,
            base_price, extra_guest_price, base_guests, max_guests
        FROM site_types
        ORDER BY sort_order, id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .iter()
    .map(|row| {
        let pool_size: Option<i32> = row.get("pool_size");
        let base_guests: i32 = row.get("base_guests");
        let max_guests: i32 = row.get("max_guests");
        SiteType {
            id: row.get("id"),
            name: row.get("name"),
            icon: row.get("icon"),
            requires_site_selection: row.get("requires_site_selection"),
            limited_availability: row.get("limited_availability"),
            pool_size: pool_size.map(|size| size.max(0) as u32),
            pricing: Pricing {
                base_price: row.get("base_price"),
                extra_guest_price: row.get("extra_guest_price"),
                base_guests: base_guests.max(0) as u32,
                max_guests: max_guests.max(0) as u32,
            },
        }
    })
    .collect();

    let sites = sqlx::query("SELECT id, site_type_id, site_number FROM sites ORDER BY site_number")
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?
        .iter()
        .map(|row| Site {
            id: row.get("id"),
            site_type_id: row.get("site_type_id"),
            number: row.get("site_number"),
        })
        .collect();

    let extra_services = sqlx::query(
        "SELECT id, name, price, allow_multiple FROM additional_services ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .iter()
    .map(|row| ExtraService {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        allow_multiple: row.get("allow_multiple"),
    })
    .collect();

    let rules = sqlx::query("SELECT rule_text FROM rules ORDER BY sort_order, id")
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?
        .iter()
        .map(|row| row.get("rule_text"))
        .collect();

    let inventory = Inventory::new(InventoryDocument {
        site_types,
        sites,
        extra_services,
        rules,
    })?;

    log::info!(
        "🏕️ Loaded {} site types and {} extras from the database",
        inventory.list_site_types().len(),
        inventory.list_extra_services().len()
    );
    Ok(inventory)
}

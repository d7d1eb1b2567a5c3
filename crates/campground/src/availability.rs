use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::collaborators::ReservationStore;
use crate::error::BookingError;
use crate::inventory::{Inventory, Site};
use crate::reservation::{DateRange, Reservation};

/// Remaining capacity per night for one site type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityWindow {
    /// Site type the window describes
    pub site_type_id: String,
    /// Capacity when nothing is booked
    pub total_capacity: u32,
    /// Remaining capacity keyed by night
    pub days: BTreeMap<NaiveDate, u32>,
}

impl AvailabilityWindow {
    /// Remaining capacity on `date`, `None` outside the window
    pub fn remaining(&self, date: NaiveDate) -> Option<u32> {
        self.days.get(&date).copied()
    }

    /// Whether every night of `stay` has at least one unit left
    pub fn can_fit(&self, stay: &DateRange) -> bool {
        stay.days()
            .all(|d| self.remaining(d).is_some_and(|remaining| remaining > 0))
    }
}

/// Computes remaining capacity for each night in
/// `[window_start, window_start + window_length_days)` from a ledger snapshot.
///
/// Pooled site types always report their full pool size. Tracked site types
/// subtract every reservation of that type whose half-open stay contains the
/// night; the result saturates at zero.
pub fn compute_availability(
    inventory: &Inventory,
    site_type_id: &str,
    window_start: NaiveDate,
    window_length_days: u32,
    reservations: &[Reservation],
) -> Result<AvailabilityWindow, BookingError> {
    let site_type = inventory.site_type(site_type_id)?;
    let window = DateRange::from_nights(window_start, window_length_days)?;
    let total_capacity = inventory.total_capacity(site_type);

    let days = window
        .days()
        .map(|day| {
            let remaining = if site_type.limited_availability {
                let booked = reservations
                    .iter()
                    .filter(|r| r.site_type_id == site_type.id && r.dates().contains(day))
                    .count() as u32;
                total_capacity.saturating_sub(booked)
            } else {
                total_capacity
            };
            (day, remaining)
        })
        .collect();

    Ok(AvailabilityWindow {
        site_type_id: site_type.id.clone(),
        total_capacity,
        days,
    })
}

/// Counts consecutive nights from `candidate_start` with capacity left,
/// stopping at the first full night or the end of the window
pub fn compute_max_run_length(availability: &AvailabilityWindow, candidate_start: NaiveDate) -> u32 {
    availability
        .days
        .range(candidate_start..)
        .zip(candidate_start.iter_days())
        .take_while(|((day, remaining), expected)| *day == expected && **remaining > 0)
        .count() as u32
}

/// Loads overlapping reservations from the ledger and computes the window.
///
/// A ledger failure is reported as [`BookingError::Unavailable`], never as a
/// window of zeros.
pub async fn fetch_availability(
    inventory: &Inventory,
    store: &dyn ReservationStore,
    site_type_id: &str,
    window_start: NaiveDate,
    window_length_days: u32,
) -> Result<AvailabilityWindow, BookingError> {
    let site_type = inventory.site_type(site_type_id)?;
    let window = DateRange::from_nights(window_start, window_length_days)?;

    let reservations = if site_type.limited_availability {
        store
            .query_reservations_overlapping(&site_type.id, &window)
            .await?
    } else {
        Vec::new()
    };

    debug!(
        "Computing availability for {} over {} from {} reservations",
        site_type.id,
        window,
        reservations.len()
    );

    compute_availability(
        inventory,
        site_type_id,
        window_start,
        window_length_days,
        &reservations,
    )
}

/// Sites of the type that are free for every night of `stay`.
/// `ignore_reservation` excludes one booking, used when moving it.
pub fn free_sites<'a>(
    inventory: &'a Inventory,
    site_type_id: &str,
    stay: &DateRange,
    reservations: &[Reservation],
    ignore_reservation: Option<i64>,
) -> Result<Vec<&'a Site>, BookingError> {
    let sites = inventory.list_sites_for_type(site_type_id)?;
    Ok(sites
        .into_iter()
        .filter(|site| {
            !reservations.iter().any(|r| {
                Some(r.id) != ignore_reservation
                    && r.site_id.as_deref() == Some(site.id.as_str())
                    && r.dates().overlaps(stay)
            })
        })
        .collect())
}

/// Whether a stay of this site type (and site, if given) still fits the ledger
pub async fn stay_fits(
    inventory: &Inventory,
    store: &dyn ReservationStore,
    site_type_id: &str,
    site_id: Option<&str>,
    stay: &DateRange,
    ignore_reservation: Option<i64>,
) -> Result<bool, BookingError> {
    let site_type = inventory.site_type(site_type_id)?;
    if !site_type.limited_availability {
        return Ok(true);
    }

    let reservations: Vec<Reservation> = store
        .query_reservations_overlapping(&site_type.id, stay)
        .await?
        .into_iter()
        .filter(|r| Some(r.id) != ignore_reservation)
        .collect();

    let window = compute_availability(
        inventory,
        site_type_id,
        stay.start,
        stay.nights(),
        &reservations,
    )?;
    if !window.can_fit(stay) {
        return Ok(false);
    }

    match site_id {
        Some(site_id) => {
            let free = free_sites(inventory, site_type_id, stay, &reservations, None)?;
            Ok(free.iter().any(|s| s.id == site_id))
        }
        None => Ok(true),
    }
}

/// Who occupies a site on a given night
#[derive(Debug, Clone, Serialize)]
pub struct SiteOccupancy {
    /// The site
    pub site: Site,
    /// Reservation holding the site that night, if any
    pub reservation: Option<OccupantSummary>,
}

/// The parts of a reservation shown on the occupancy board
#[derive(Debug, Clone, Serialize)]
pub struct OccupantSummary {
    /// Reservation id
    pub reservation_id: i64,
    /// Guest's name
    pub guest_name: String,
    /// Adults plus children
    pub party_size: u32,
    /// Stay dates
    pub dates: DateRange,
}

/// Occupancy board for one night
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyBoard {
    /// Site type shown
    pub site_type_id: String,
    /// Night shown
    pub date: NaiveDate,
    /// Per-site occupancy for tracked site types
    pub sites: Vec<SiteOccupancy>,
    /// Reservations of the type staying that night
    pub occupied: u32,
    /// Capacity when nothing is booked
    pub total_capacity: u32,
}

/// Builds the occupancy board for `date` from the ledger
pub async fn site_occupancy(
    inventory: &Inventory,
    store: &dyn ReservationStore,
    site_type_id: &str,
    date: NaiveDate,
) -> Result<OccupancyBoard, BookingError> {
    let site_type = inventory.site_type(site_type_id)?;
    let night = DateRange::from_nights(date, 1)?;
    let staying = store
        .query_reservations_overlapping(&site_type.id, &night)
        .await?;

    let sites = inventory
        .list_sites_for_type(site_type_id)?
        .into_iter()
        .map(|site| SiteOccupancy {
            site: site.clone(),
            reservation: staying
                .iter()
                .find(|r| r.site_id.as_deref() == Some(site.id.as_str()))
                .map(|r| OccupantSummary {
                    reservation_id: r.id,
                    guest_name: r.guest_name.clone(),
                    party_size: r.adult_count + r.child_count,
                    dates: r.dates(),
                }),
        })
        .collect();

    Ok(OccupancyBoard {
        site_type_id: site_type.id.clone(),
        date,
        sites,
        occupied: staying.len() as u32,
        total_capacity: inventory.total_capacity(site_type),
    })
}

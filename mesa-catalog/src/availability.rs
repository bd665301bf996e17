use std::collections::HashSet;

use serde::Serialize;

use crate::interval::Window;
use crate::resource::{OccupancyInterval, Resource, ResourceId, ResourceRef};

/// Outcome of a read-only capacity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    pub party_size: u32,
    pub free_capacity: u64,
    /// Free tables, largest first.
    pub free_resources: Vec<ResourceId>,
    pub available: bool,
}

/// References of every table with at least one occupancy interval overlapping `window`.
///
/// Occupancy is binary per table: one overlapping interval is enough, seats are not shared.
pub fn occupied_refs<T: PartialOrd>(
    intervals: &[OccupancyInterval<T>],
    window: &Window<T>,
) -> HashSet<ResourceRef> {
    intervals
        .iter()
        .filter(|interval| window.overlaps(&interval.start, &interval.end))
        .map(|interval| interval.resource_ref)
        .collect()
}

/// Eligible tables that carry an occupancy reference not present in `occupied`,
/// sorted by capacity descending then id ascending.
pub fn free_resources<'a>(
    catalog: &'a [Resource],
    occupied: &HashSet<ResourceRef>,
) -> Vec<&'a Resource> {
    let mut free: Vec<&Resource> = catalog
        .iter()
        .filter(|r| r.is_eligible())
        .filter(|r| matches!(r.external_ref, Some(reference) if !occupied.contains(&reference)))
        .collect();

    free.sort_by(|a, b| b.capacity.cmp(&a.capacity).then(a.id.cmp(&b.id)));
    free
}

/// Does the free capacity during `window` cover `party_size`?
///
/// Pure: identical inputs always give the same report and nothing is reserved.
pub fn check_availability<T: PartialOrd>(
    catalog: &[Resource],
    intervals: &[OccupancyInterval<T>],
    window: &Window<T>,
    party_size: u32,
) -> AvailabilityReport {
    let occupied = occupied_refs(intervals, window);
    let free = free_resources(catalog, &occupied);

    let free_capacity: u64 = free.iter().map(|r| u64::from(r.capacity)).sum();

    AvailabilityReport {
        party_size,
        free_capacity,
        free_resources: free.iter().map(|r| r.id).collect(),
        available: party_size > 0 && free_capacity >= u64::from(party_size),
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a bookable table in the tenant's back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

/// Reference used by occupancy records to point at a table.
///
/// Kept apart from [`ResourceId`]: some back offices key occupancy by a
/// different identifier than the one used to create booking lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bookable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub external_ref: Option<ResourceRef>,
    pub capacity: u32,
    pub active: bool,
}

impl Resource {
    pub fn new(id: i64, external_ref: Option<i64>, capacity: u32, active: bool) -> Self {
        Self {
            id: ResourceId(id),
            external_ref: external_ref.map(ResourceRef),
            capacity,
            active,
        }
    }

    /// Only active tables with at least one seat take part in allocation or capacity sums.
    pub fn is_eligible(&self) -> bool {
        self.active && self.capacity > 0
    }
}

/// Time range during which the referenced table cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyInterval<T> {
    pub resource_ref: ResourceRef,
    pub start: T,
    pub end: T,
}

impl<T> OccupancyInterval<T> {
    pub fn new(resource_ref: ResourceRef, start: T, end: T) -> Self {
        Self { resource_ref, start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_requires_active_and_seats() {
        assert!(Resource::new(1, Some(10), 4, true).is_eligible());
        assert!(!Resource::new(2, Some(11), 4, false).is_eligible());
        assert!(!Resource::new(3, Some(12), 0, true).is_eligible());
    }
}

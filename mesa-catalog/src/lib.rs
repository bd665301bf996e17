//! Table catalog primitives: bookable resources, occupancy windows, the
//! availability calculation and the table allocator.
//!
//! Everything in this crate is synchronous and side-effect free. Timestamps are
//! generic over any totally ordered type; callers must normalize every value to
//! the same reference frame before handing it over.

pub mod resource;
pub mod interval;
pub mod availability;
pub mod allocator;

pub use resource::{OccupancyInterval, Resource, ResourceId, ResourceRef};
pub use interval::{overlaps, Window};
pub use availability::{check_availability, occupied_refs, AvailabilityReport};
pub use allocator::{allocate, Allocation, AllocationError, AllocationLine, SelectionStrategy};

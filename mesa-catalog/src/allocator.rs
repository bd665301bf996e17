use serde::Serialize;

use crate::resource::{Resource, ResourceId};

/// Which step of the tie-break cascade produced the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// One table seating exactly the party.
    ExactMatch,
    /// The smallest single table larger than the party.
    SmallestSufficient,
    /// Several smaller tables, largest first.
    Combination,
}

/// One table of an allocation and the seats taken from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationLine {
    pub resource_id: ResourceId,
    pub resource_capacity: u32,
    pub reserved_capacity: u32,
}

/// Tables assigned to a party. `reserved_capacity` across `lines` sums to `party_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub party_size: u32,
    pub strategy: SelectionStrategy,
    pub lines: Vec<AllocationLine>,
}

impl Allocation {
    pub fn reserved_total(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.reserved_capacity)).sum()
    }

    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.lines.iter().map(|l| l.resource_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("party size must be at least one")]
    EmptyParty,

    /// Expected business outcome: no table or combination seats the party.
    #[error("capacity shortfall: requested {requested}, best combination seats {reachable}")]
    CapacityShortfall {
        requested: u32,
        reachable: u64,
        attempted: Vec<ResourceId>,
    },

    /// The capacity assignment pass left seats unassigned on a selection believed sufficient.
    #[error("allocation invariant violated: {remaining} of {party_size} seats unassigned across {selection:?}")]
    InvariantViolation {
        party_size: u32,
        remaining: u32,
        selection: Vec<AllocationLine>,
    },
}

impl AllocationError {
    pub fn is_shortfall(&self) -> bool {
        matches!(self, AllocationError::CapacityShortfall { .. })
    }
}

/// Select tables for `party_size` guests.
///
/// Cascade, first success wins:
/// 1. the first table (catalog order) whose capacity equals the party size;
/// 2. the smallest table larger than the party;
/// 3. tables smaller than the party, largest first, until the seats cover it.
///
/// Equal capacities are ordered by id in steps 2 and 3. Ineligible tables are skipped.
/// Nothing is reserved: concurrent callers reading the same catalog can pick the same tables.
pub fn allocate(catalog: &[Resource], party_size: u32) -> Result<Allocation, AllocationError> {
    if party_size == 0 {
        return Err(AllocationError::EmptyParty);
    }

    let tables: Vec<&Resource> = catalog.iter().filter(|r| r.is_eligible()).collect();

    let (strategy, selection) = select(&tables, party_size)?;
    assign_capacity(strategy, selection, party_size)
}

fn select<'a>(
    tables: &[&'a Resource],
    party_size: u32,
) -> Result<(SelectionStrategy, Vec<&'a Resource>), AllocationError> {
    // 1. Exact
    if let Some(table) = tables.iter().find(|t| t.capacity == party_size) {
        return Ok((SelectionStrategy::ExactMatch, vec![*table]));
    }

    // 2. Smallest single table above the party size
    let smallest_bigger = tables
        .iter()
        .filter(|t| t.capacity > party_size)
        .min_by(|a, b| a.capacity.cmp(&b.capacity).then(a.id.cmp(&b.id)));

    if let Some(table) = smallest_bigger {
        return Ok((SelectionStrategy::SmallestSufficient, vec![*table]));
    }

    // 3. Combine smaller tables
    let mut smaller: Vec<&Resource> = tables
        .iter()
        .copied()
        .filter(|t| t.capacity < party_size)
        .collect();
    smaller.sort_by(|a, b| b.capacity.cmp(&a.capacity).then(a.id.cmp(&b.id)));

    let target = u64::from(party_size);
    let mut seats: u64 = 0;
    let mut selection = Vec::new();

    for table in smaller {
        if seats >= target {
            break;
        }
        seats += u64::from(table.capacity);
        selection.push(table);
    }

    if seats < target {
        return Err(AllocationError::CapacityShortfall {
            requested: party_size,
            reachable: seats,
            attempted: selection.iter().map(|t| t.id).collect(),
        });
    }

    Ok((SelectionStrategy::Combination, selection))
}

fn assign_capacity(
    strategy: SelectionStrategy,
    selection: Vec<&Resource>,
    party_size: u32,
) -> Result<Allocation, AllocationError> {
    let mut remaining = party_size;
    let mut lines = Vec::with_capacity(selection.len());

    for table in selection {
        let reserved = table.capacity.min(remaining);
        remaining -= reserved;

        lines.push(AllocationLine {
            resource_id: table.id,
            resource_capacity: table.capacity,
            reserved_capacity: reserved,
        });
    }

    if remaining != 0 {
        return Err(AllocationError::InvariantViolation {
            party_size,
            remaining,
            selection: lines,
        });
    }

    Ok(Allocation { party_size, strategy, lines })
}

use serde::{Deserialize, Serialize};

/// Half-open interval intersection: `[a_start, a_end)` and `[b_start, b_end)`
/// overlap iff `a_start < b_end && a_end > b_start`. Touching endpoints do not overlap.
pub fn overlaps<T: PartialOrd>(a_start: &T, a_end: &T, b_start: &T, b_end: &T) -> bool {
    a_start < b_end && a_end > b_start
}

/// Query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window<T> {
    pub start: T,
    pub end: T,
}

impl<T: PartialOrd> Window<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, start: &T, end: &T) -> bool {
        overlaps(&self.start, &self.end, start, end)
    }
}

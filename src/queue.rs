//! Queue-position arithmetic.
//!
//! The roster is one sequence of positions split into two disjoint
//! sub-ranges: primary `[1, primary_max]` and secondary/overflow
//! `[secondary_min, secondary_max]`. Calls advance through a sub-range and
//! wrap back to its low end, so the distance from a worker to the next call
//! is circular within the worker's own sub-range.

use serde::{Deserialize, Serialize};

use crate::model::{DoorCutoff, QueueDistances, QueueType};

/// Named bounds of the two roster sub-ranges. Configuration, never derived
/// from data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeBounds {
    pub primary_max: i64,
    pub secondary_min: i64,
    pub secondary_max: i64,
}

impl Default for RangeBounds {
    fn default() -> Self {
        Self {
            primary_max: 449,
            secondary_min: 450,
            secondary_max: 535,
        }
    }
}

impl RangeBounds {
    pub fn is_primary(&self, position: i64) -> bool {
        position <= self.primary_max
    }
}

/// Last position called for one queue type within one sub-range: the
/// maximum cutoff across all shifts of that queue type.
fn last_called(cutoffs: &[DoorCutoff], queue: QueueType, primary_range: bool) -> Option<i64> {
    cutoffs
        .iter()
        .filter(|c| c.shift.queue_type() == queue)
        .filter_map(|c| if primary_range { c.primary } else { c.secondary })
        .filter(|n| *n > 0)
        .max()
}

/// Circular distance from `position` to the next call given the last called
/// position within the sub-range `[lo, hi]`.
fn wrap_distance(position: i64, last: i64, lo: i64, hi: i64) -> i64 {
    if position > last {
        position - last
    } else {
        (hi - last) + (position - lo + 1)
    }
}

/// Distances to the next working-day and holiday calls for a worker at
/// `position`. `None` per queue when no cutoff applies to the worker's
/// sub-range — unknown, not zero.
pub fn queue_distances(
    position: i64,
    cutoffs: &[DoorCutoff],
    bounds: &RangeBounds,
) -> QueueDistances {
    let primary = bounds.is_primary(position);
    let (lo, hi) = if primary {
        (1, bounds.primary_max)
    } else {
        (bounds.secondary_min, bounds.secondary_max)
    };

    let distance = |queue: QueueType| {
        last_called(cutoffs, queue, primary).map(|last| wrap_distance(position, last, lo, hi))
    };

    QueueDistances {
        working_day: distance(QueueType::WorkingDay),
        holiday: distance(QueueType::Holiday),
    }
}

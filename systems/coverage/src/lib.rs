#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure geometry precomputation: path sampling and per-slot coverage sets.
//!
//! Both structures are built once at round start. The coverage index is
//! read-only afterwards and can be shared freely between readers.

mod sampler;

use log::debug;
use serde::{Deserialize, Serialize};
use shop_advisor_core::{PathPoint, PlacementSlot, SlotId};

pub use sampler::{PathSampler, MAX_SAMPLES};

/// Geometry tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageTuning {
    /// Arc length represented by each path sample.
    pub segment_length: f64,
    /// Largest radius bucket precomputed for every slot.
    pub max_radius: u32,
}

impl Default for CoverageTuning {
    fn default() -> Self {
        Self {
            segment_length: 1.0,
            max_radius: 20,
        }
    }
}

/// Path sample indices reachable from each slot at each integer radius.
///
/// A sample belongs to radius bucket `r` of a slot when its squared distance
/// to the slot is strictly below `r²`. Buckets are therefore nested: every
/// bucket contains all samples of the smaller buckets of the same slot.
/// Bucket 0 is always empty, even for a sample sitting on the slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageIndex {
    max_radius: u32,
    buckets: Vec<Vec<Vec<usize>>>,
}

impl CoverageIndex {
    /// Precomputes every bucket for the provided slots and samples.
    ///
    /// Slots are addressed by their position within `slots`.
    #[must_use]
    pub fn build(slots: &[PlacementSlot], points: &[PathPoint], max_radius: u32) -> Self {
        let mut buckets = Vec::with_capacity(slots.len());
        let mut distances = Vec::with_capacity(points.len());

        for slot in slots {
            distances.clear();
            distances.extend(
                points
                    .iter()
                    .map(|point| slot.position().distance_squared(point.position())),
            );

            let per_radius: Vec<Vec<usize>> = (0..=max_radius)
                .map(|radius| {
                    let limit = f64::from(radius) * f64::from(radius);
                    distances
                        .iter()
                        .enumerate()
                        .filter(|(_, distance)| **distance < limit)
                        .map(|(index, _)| index)
                        .collect()
                })
                .collect();
            buckets.push(per_radius);
        }

        debug!(
            "built coverage for {} slots over {} samples up to radius {max_radius}",
            slots.len(),
            points.len()
        );

        Self {
            max_radius,
            buckets,
        }
    }

    /// Number of slots covered by the index.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.buckets.len()
    }

    /// Sample indices, ascending, within `radius` of `slot`.
    ///
    /// Radii beyond the precomputed maximum use the largest bucket, unknown
    /// slots cover nothing.
    #[must_use]
    pub fn covered(&self, slot: SlotId, radius: u32) -> &[usize] {
        let radius = radius.min(self.max_radius) as usize;
        self.buckets
            .get(slot.get())
            .and_then(|per_radius| per_radius.get(radius))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Radius bucket used for an item range.
    ///
    /// Fractional ranges are truncated to the next lower integer, then
    /// clamped to the precomputed maximum.
    #[must_use]
    pub fn bucket(&self, range: f64) -> u32 {
        if !(range > 0.0) {
            return 0;
        }
        let truncated = range.floor();
        if truncated >= f64::from(self.max_radius) {
            self.max_radius
        } else {
            truncated as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_advisor_core::{slots_from_positions, Point};

    fn line(count: usize) -> Vec<PathPoint> {
        (0..count)
            .map(|x| PathPoint::new(Point::new(x as f64, 0.0)))
            .collect()
    }

    #[test]
    fn boundary_samples_are_excluded() {
        let slots = slots_from_positions(&[Point::new(5.0, 0.0)]);
        let index = CoverageIndex::build(&slots, &line(10), 20);

        assert!(index.covered(SlotId::new(0), 0).is_empty());
        assert_eq!(index.covered(SlotId::new(0), 1), &[5]);
        assert_eq!(index.covered(SlotId::new(0), 2), &[4, 5, 6]);
    }

    #[test]
    fn fractional_ranges_truncate_toward_lower_bucket() {
        let index = CoverageIndex::build(&[], &[], 20);

        assert_eq!(index.bucket(6.9), 6);
        assert_eq!(index.bucket(6.0), 6);
        assert_eq!(index.bucket(0.4), 0);
        assert_eq!(index.bucket(-3.0), 0);
        assert_eq!(index.bucket(f64::NAN), 0);
        assert_eq!(index.bucket(57.0), 20);
    }

    #[test]
    fn oversized_radius_uses_largest_bucket() {
        let slots = slots_from_positions(&[Point::new(0.0, 0.0)]);
        let index = CoverageIndex::build(&slots, &line(30), 20);

        assert_eq!(index.covered(SlotId::new(0), 99).len(), 20);
    }

    #[test]
    fn unknown_slot_covers_nothing() {
        let slots = slots_from_positions(&[Point::new(0.0, 0.0)]);
        let index = CoverageIndex::build(&slots, &line(5), 20);

        assert_eq!(index.slot_count(), 1);
        assert!(index.covered(SlotId::new(3), 5).is_empty());
    }
}

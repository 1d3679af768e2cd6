#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mutable per-sample damage field shared by every item placed in a round.
//!
//! The field accumulates the contributions of committed items on each path
//! sample so that the value of a new item can be measured against what is
//! already there. Two items covering the same stretch compound: damage adds
//! up, the strongest slow wins and one special item turns the bonus on for
//! everybody.

use std::sync::Arc;

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use shop_advisor_core::{
    slots_from_positions, Contribution, PathPoint, PlacementSlot, Point, SlotId,
};
use shop_advisor_system_coverage::{CoverageIndex, CoverageTuning, PathSampler};
use thiserror::Error;

/// Damage field tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTuning {
    /// Multiplier applied to samples where the special effect is active.
    pub special_bonus: f64,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            special_bonus: 1.54,
        }
    }
}

/// Reasons a commit is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The slot index is not part of the round.
    #[error("slot {0} does not exist")]
    UnknownSlot(usize),
    /// An item already sits in the slot.
    #[error("slot {0} is already occupied")]
    SlotOccupied(usize),
}

/// Path samples, slot occupancy and the coverage they are evaluated through.
#[derive(Clone, Debug)]
pub struct DamageField {
    points: Vec<PathPoint>,
    slots: Vec<PlacementSlot>,
    coverage: Arc<CoverageIndex>,
    segment_weight: f64,
    special_bonus: f64,
}

impl DamageField {
    /// Creates a field over prepared samples and slots.
    ///
    /// `coverage` must have been built from the same `points` and `slots`;
    /// `segment_weight` is the arc length each sample stands for.
    #[must_use]
    pub fn new(
        points: Vec<PathPoint>,
        slots: Vec<PlacementSlot>,
        coverage: Arc<CoverageIndex>,
        segment_weight: f64,
        tuning: &FieldTuning,
    ) -> Self {
        Self {
            points,
            slots,
            coverage,
            segment_weight,
            special_bonus: tuning.special_bonus,
        }
    }

    /// Samples the path, builds the coverage index and creates an empty field.
    #[must_use]
    pub fn from_geometry(
        path: &[Point],
        slot_positions: &[Point],
        coverage: &CoverageTuning,
        tuning: &FieldTuning,
    ) -> Self {
        let sampler = PathSampler::new(coverage.segment_length);
        let points = sampler.sample(path);
        let slots = slots_from_positions(slot_positions);
        let index = CoverageIndex::build(&slots, &points, coverage.max_radius);
        Self::new(
            points,
            slots,
            Arc::new(index),
            sampler.segment_length(),
            tuning,
        )
    }

    /// Path samples in path order.
    #[must_use]
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Placement slots in announcement order.
    #[must_use]
    pub fn slots(&self) -> &[PlacementSlot] {
        &self.slots
    }

    /// Radius bucket used for an item range.
    #[must_use]
    pub fn bucket(&self, range: f64) -> u32 {
        self.coverage.bucket(range)
    }

    /// Reports whether `slot` exists and is still free.
    #[must_use]
    pub fn is_available(&self, slot: SlotId) -> bool {
        self.slots
            .get(slot.get())
            .is_some_and(|candidate| !candidate.is_occupied())
    }

    /// Marginal damage-equivalent of placing `contribution` at `slot`.
    ///
    /// Occupied and unknown slots are worth nothing. The field is left
    /// untouched.
    #[must_use]
    pub fn evaluate(&self, slot: SlotId, radius: u32, contribution: &Contribution) -> f64 {
        if !self.is_available(slot) {
            return 0.0;
        }
        debug_assert!(contribution.slow_factor > 0.0, "slow factor must be positive");

        let gain: f64 = self
            .coverage
            .covered(slot, radius)
            .iter()
            .filter_map(|&index| self.points.get(index))
            .map(|point| {
                let before = self.damage_equivalent(
                    point.total_damage(),
                    point.slow_factor(),
                    point.has_special_eff(),
                );
                let after = self.damage_equivalent(
                    point.total_damage() + contribution.attack_rate,
                    point.slow_factor().min(contribution.slow_factor),
                    point.has_special_eff() || contribution.is_special,
                );
                after - before
            })
            .sum();

        gain * self.segment_weight
    }

    /// Free slot where `contribution` gains the most, with that gain.
    ///
    /// Only strictly positive gains qualify; ties keep the lower slot.
    #[must_use]
    pub fn best_slot(&self, radius: u32, contribution: &Contribution) -> Option<(SlotId, f64)> {
        let mut best: Option<(SlotId, f64)> = None;
        for slot in &self.slots {
            if slot.is_occupied() {
                continue;
            }
            let value = self.evaluate(slot.id(), radius, contribution);
            trace!("slot {} radius {radius} gains {value:.3}", slot.id().get());
            if value > 0.0 && best.map_or(true, |(_, current)| value > current) {
                best = Some((slot.id(), value));
            }
        }
        best
    }

    /// Places `contribution` at `slot`, folding it into every covered sample.
    ///
    /// The slot becomes occupied.
    pub fn commit(
        &mut self,
        slot: SlotId,
        radius: u32,
        contribution: &Contribution,
    ) -> Result<(), FieldError> {
        let Some(target) = self.slots.get_mut(slot.get()) else {
            warn!("refusing commit to unknown slot {}", slot.get());
            return Err(FieldError::UnknownSlot(slot.get()));
        };
        if target.is_occupied() {
            return Err(FieldError::SlotOccupied(slot.get()));
        }
        target.occupy();

        let covered = self.coverage.covered(slot, radius);
        for &index in covered {
            if let Some(point) = self.points.get_mut(index) {
                point.absorb(contribution);
            }
        }

        trace!(
            "committed rate {:.3} slow {:.3} special {} at slot {} over {} samples",
            contribution.attack_rate,
            contribution.slow_factor,
            contribution.is_special,
            slot.get(),
            covered.len()
        );
        Ok(())
    }

    fn damage_equivalent(&self, total: f64, slow_factor: f64, special: bool) -> f64 {
        let bonus = if special { self.special_bonus } else { 1.0 };
        total / slow_factor * bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_on_line(slot_positions: &[Point]) -> DamageField {
        let points: Vec<PathPoint> = (0..10)
            .map(|x| PathPoint::new(Point::new(x as f64, 0.0)))
            .collect();
        let slots = slots_from_positions(slot_positions);
        let coverage = Arc::new(CoverageIndex::build(&slots, &points, 20));
        DamageField::new(points, slots, coverage, 1.0, &FieldTuning::default())
    }

    #[test]
    fn commit_rejects_unknown_and_occupied_slots() {
        let mut field = field_on_line(&[Point::new(5.0, 0.0)]);
        let item = Contribution::new(1.0, 1.0, false);

        assert_eq!(
            field.commit(SlotId::new(4), 2, &item),
            Err(FieldError::UnknownSlot(4))
        );
        assert_eq!(field.commit(SlotId::new(0), 2, &item), Ok(()));
        assert_eq!(
            field.commit(SlotId::new(0), 2, &item),
            Err(FieldError::SlotOccupied(0))
        );
    }

    #[test]
    fn best_slot_prefers_larger_coverage_and_skips_worthless_slots() {
        let field = field_on_line(&[Point::new(5.0, 50.0), Point::new(9.0, 0.0), Point::new(5.0, 0.0)]);
        let item = Contribution::new(2.0, 1.0, false);

        let (slot, value) = field.best_slot(2, &item).expect("a slot reaches the path");
        assert_eq!(slot, SlotId::new(2));
        assert!((value - 6.0).abs() < 1e-9);
    }

    #[test]
    fn best_slot_is_none_without_free_slots() {
        let mut field = field_on_line(&[Point::new(5.0, 0.0)]);
        let item = Contribution::new(2.0, 1.0, false);
        field.commit(SlotId::new(0), 2, &item).expect("free slot");

        assert!(field.best_slot(2, &item).is_none());
    }
}

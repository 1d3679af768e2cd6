#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure translation of item templates into effective field contributions.
//!
//! The monster attributes predicted for the round reshape an item's raw
//! damage in a fixed order: attack cadence, element, slow reaction, target
//! count, special effect. Templates are only ever read; the unlimited
//! target count resolves to a derived number on every call.

use serde::{Deserialize, Serialize};
use shop_advisor_core::{
    AttackCadence, Contribution, Element, ItemTemplate, Occurrence, PredictedAttributes,
    SlowReaction, TargetCap,
};

/// Value model tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueTuning {
    /// Items attacking at least this often count as fast attackers.
    pub fast_interval: f64,
    /// Items attacking at most this often count as slow attackers.
    pub slow_interval: f64,
    /// Damage multiplier for cadence-matched fast attackers, and divisor for mismatched ones.
    pub fast_match: f64,
    /// Damage multiplier for slow attackers when fast cadence is predicted.
    pub slow_mismatch: f64,
    /// Damage multiplier for slow attackers when slow cadence is predicted.
    pub slow_match: f64,
    /// Damage multiplier for elements the monster is weak to.
    pub weak_multiplier: f64,
    /// Damage multiplier for elements the monster resists.
    pub resist_multiplier: f64,
    /// Target count standing for "every monster in range".
    pub dense_targets: u32,
}

impl Default for ValueTuning {
    fn default() -> Self {
        Self {
            fast_interval: 0.06,
            slow_interval: 0.30,
            fast_match: 1.5,
            slow_mismatch: 0.5,
            slow_match: 2.0,
            weak_multiplier: 1.25,
            resist_multiplier: 0.8,
            dense_targets: 6,
        }
    }
}

/// Maps items and predicted attributes to [`Contribution`] values.
#[derive(Clone, Debug, Default)]
pub struct ValueModel {
    tuning: ValueTuning,
}

impl ValueModel {
    /// Creates a value model with the provided tuning.
    #[must_use]
    pub fn new(tuning: ValueTuning) -> Self {
        Self { tuning }
    }

    /// Effective contribution of an item dealing `raw_damage` per hit.
    #[must_use]
    pub fn contribution(
        &self,
        template: &ItemTemplate,
        raw_damage: f64,
        attributes: &PredictedAttributes,
    ) -> Contribution {
        let mut damage = raw_damage;
        damage *= self.cadence_multiplier(template.interval, attributes.cadence);
        damage *= self.element_multiplier(template.element, attributes);
        let slow_factor = self.effective_slow(template.speed_down, attributes.slow_reaction);
        let targets = self.effective_targets(template, attributes.occurrence);
        let attack_rate = damage * f64::from(targets) / template.interval;
        let is_special = attributes.special == Some(template.element);

        Contribution::new(attack_rate, slow_factor, is_special)
    }

    /// Number of monsters one hit of the item is expected to reach.
    #[must_use]
    pub fn effective_targets(&self, template: &ItemTemplate, occurrence: Occurrence) -> u32 {
        let dense = self.tuning.dense_targets;
        let resolved = match template.n_targets {
            TargetCap::Limited(count) => count,
            TargetCap::Unlimited => dense,
        };

        match occurrence {
            Occurrence::Single => resolved.min(1),
            Occurrence::Double => resolved.min(2),
            Occurrence::Triple => resolved.min(3),
            Occurrence::Sparse => resolved.min(dense),
            Occurrence::Dense if template.area => dense,
            Occurrence::Dense => resolved.min(dense),
        }
    }

    /// Slow multiplier the item effectively imposes on the monster.
    #[must_use]
    pub fn effective_slow(&self, speed_down: f64, reaction: SlowReaction) -> f64 {
        match reaction {
            SlowReaction::Resist => 1.0,
            SlowReaction::Normal => speed_down,
            SlowReaction::Weak => speed_down.powi(3),
        }
    }

    fn cadence_multiplier(&self, interval: f64, cadence: AttackCadence) -> f64 {
        let fast_item = interval <= self.tuning.fast_interval;
        let slow_item = interval >= self.tuning.slow_interval;

        match cadence {
            AttackCadence::Normal => 1.0,
            AttackCadence::Fast if slow_item => self.tuning.slow_mismatch,
            AttackCadence::Fast if fast_item => self.tuning.fast_match,
            AttackCadence::Slow if fast_item => 1.0 / self.tuning.fast_match,
            AttackCadence::Slow if slow_item => self.tuning.slow_match,
            AttackCadence::Fast | AttackCadence::Slow => 1.0,
        }
    }

    fn element_multiplier(&self, element: Element, attributes: &PredictedAttributes) -> f64 {
        if attributes.is_weak_to(element) {
            self.tuning.weak_multiplier
        } else if attributes.resists(element) {
            self.tuning.resist_multiplier
        } else {
            1.0
        }
    }
}

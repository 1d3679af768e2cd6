#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Purchase planner answering every shop cycle with `buy` or `refresh`.
//!
//! One planner lives for one round. It owns the damage field, the counters
//! and the histories the policy depends on, and switches between three
//! regimes on every cycle:
//!
//! * [`Regime::Bootstrapping`] refreshes unconditionally for the first few
//!   cycles while recording how good the offers were.
//! * [`Regime::GreedyGated`] buys the best offer unless it falls well short
//!   of the best offer seen so far.
//! * [`Regime::EndgameDp`] weighs the current offers against a sampled
//!   look-ahead over the remaining coins.

mod lookahead;

use log::{debug, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use shop_advisor_core::{
    Action, Contribution, ItemCatalog, ItemOffer, ItemTemplate, Point, PredictedAttributes,
    PurchaseRecord, Shop, SlotId,
};
use shop_advisor_system_coverage::CoverageTuning;
use shop_advisor_system_damage_field::{DamageField, FieldError, FieldTuning};
use shop_advisor_system_value_model::{ValueModel, ValueTuning};
use thiserror::Error;

pub use lookahead::{Candidate, LookaheadTable};

/// Policy tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerTuning {
    /// Number of opening cycles that always refresh.
    pub pre_refresh: u32,
    /// Coin balance below which the look-ahead takes over.
    pub budget_threshold: u32,
    /// Fraction of the best value seen that an offer must reach to be bought.
    pub expect_threshold: f64,
    /// Simulated shops drawn per look-ahead table.
    pub num_sample: usize,
    /// Offers per simulated shop, shrunk to the population when larger.
    pub simulated_shop_size: usize,
    /// Seed of the look-ahead sampler.
    pub rng_seed: u64,
}

impl Default for PlannerTuning {
    fn default() -> Self {
        Self {
            pre_refresh: 3,
            budget_threshold: 60,
            expect_threshold: 0.3,
            num_sample: 500,
            simulated_shop_size: 20,
            rng_seed: 0x5eed,
        }
    }
}

/// Every tuning surface of the advisor in one place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorTuning {
    /// Path sampling and coverage.
    pub coverage: CoverageTuning,
    /// Damage field.
    pub field: FieldTuning,
    /// Item valuation.
    pub value: ValueTuning,
    /// Purchase policy.
    pub planner: PlannerTuning,
}

/// Policy regime selected for a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Opening cycles that only observe.
    Bootstrapping,
    /// Greedy buying behind the quality gate.
    GreedyGated,
    /// Sampled look-ahead over the remaining coins.
    EndgameDp,
}

/// Failures while planning a cycle.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PlanError {
    /// An offer names an item type missing from the catalog.
    #[error("offer {offer} references unknown item type {item}")]
    UnknownItemType {
        /// Position of the offer within the shop.
        offer: usize,
        /// Item type index that was not found.
        item: usize,
    },
    /// The look-ahead was asked for more offers per shop than it can draw.
    #[error("simulated shop of {shop_size} offers exceeds a population of {population}")]
    SimulatedShopTooLarge {
        /// Requested offers per simulated shop.
        shop_size: usize,
        /// Candidates available.
        population: usize,
    },
    /// The damage field refused a commit.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Best placement found for one offer.
#[derive(Clone, Copy, Debug)]
struct Appraisal {
    offer: usize,
    cost: u32,
    slot: SlotId,
    radius: u32,
    value: f64,
    contribution: Contribution,
}

/// Per-round purchase planner.
#[derive(Debug)]
pub struct PurchasePlanner {
    field: DamageField,
    catalog: ItemCatalog,
    attributes: PredictedAttributes,
    value_model: ValueModel,
    tuning: PlannerTuning,
    cycles: u32,
    observed: Vec<f64>,
    seen: Vec<ItemOffer>,
    history: Vec<PurchaseRecord>,
    rng: ChaCha8Rng,
}

impl PurchasePlanner {
    /// Prepares a planner for a round played on the provided geometry.
    #[must_use]
    pub fn new(
        path: &[Point],
        slot_positions: &[Point],
        catalog: ItemCatalog,
        attributes: PredictedAttributes,
        tuning: &AdvisorTuning,
    ) -> Self {
        let field =
            DamageField::from_geometry(path, slot_positions, &tuning.coverage, &tuning.field);
        Self::with_field(
            field,
            catalog,
            attributes,
            tuning.value.clone(),
            tuning.planner.clone(),
        )
    }

    /// Prepares a planner around an already built damage field.
    #[must_use]
    pub fn with_field(
        field: DamageField,
        catalog: ItemCatalog,
        attributes: PredictedAttributes,
        value: ValueTuning,
        tuning: PlannerTuning,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(tuning.rng_seed);
        Self {
            field,
            catalog,
            attributes,
            value_model: ValueModel::new(value),
            tuning,
            cycles: 0,
            observed: Vec::new(),
            seen: Vec::new(),
            history: Vec::new(),
            rng,
        }
    }

    /// Damage field accumulated so far.
    #[must_use]
    pub fn field(&self) -> &DamageField {
        &self.field
    }

    /// Purchases accepted this round, oldest first.
    #[must_use]
    pub fn history(&self) -> &[PurchaseRecord] {
        &self.history
    }

    /// Number of cycles decided so far.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Replaces the predicted attributes for the remaining cycles.
    pub fn set_attributes(&mut self, attributes: PredictedAttributes) {
        self.attributes = attributes;
    }

    /// Regime the next cycle will run in with `coins` available.
    #[must_use]
    pub fn regime(&self, coins: u32) -> Regime {
        if self.cycles < self.tuning.pre_refresh {
            Regime::Bootstrapping
        } else if coins >= self.tuning.budget_threshold {
            Regime::GreedyGated
        } else {
            Regime::EndgameDp
        }
    }

    /// Decides the action for one shop cycle.
    ///
    /// A returned `buy` has already been committed to the field.
    pub fn decide(&mut self, shop: &Shop) -> Result<Action, PlanError> {
        let regime = self.regime(shop.coins);
        let appraisals = self.appraise_shop(&shop.offers)?;
        self.seen.extend(shop.offers.iter().copied());
        self.cycles += 1;

        let action = match regime {
            Regime::Bootstrapping => {
                if let Some(best) = best_affordable(&appraisals, shop.coins) {
                    self.observed.push(best.value);
                }
                Action::Refresh
            }
            Regime::GreedyGated => self.greedy(&appraisals, shop)?,
            Regime::EndgameDp => self.endgame(&appraisals, shop)?,
        };

        debug!(
            "cycle {} with {} coins and {} offers: {regime:?} -> {action}",
            self.cycles,
            shop.coins,
            shop.offers.len()
        );
        Ok(action)
    }

    /// Contributions the purchased items would have under the current
    /// attributes, in purchase order.
    ///
    /// Every recorded offer was resolved against the catalog when it was
    /// bought, and the catalog never changes during a round.
    #[must_use]
    pub fn recompute_history(&self) -> Vec<Contribution> {
        self.history
            .iter()
            .filter_map(|record| {
                let template = self.catalog.get(record.offer.item)?;
                Some(self.value_model.contribution(
                    template,
                    record.offer.raw_damage(template),
                    &self.attributes,
                ))
            })
            .collect()
    }

    fn greedy(&mut self, appraisals: &[Appraisal], shop: &Shop) -> Result<Action, PlanError> {
        let Some(best) = best_affordable(appraisals, shop.coins) else {
            return Ok(Action::Refresh);
        };

        self.observed.push(best.value);
        let bar = self.tuning.expect_threshold * self.best_observed();
        if best.value < bar {
            debug!(
                "offer {} worth {:.3} falls short of {bar:.3}, lowering the bar",
                best.offer, best.value
            );
            self.discard_best_observed();
            return Ok(Action::Refresh);
        }

        self.accept(*best, shop)
    }

    fn endgame(&mut self, appraisals: &[Appraisal], shop: &Shop) -> Result<Action, PlanError> {
        if appraisals.is_empty() {
            return Ok(Action::Refresh);
        }

        let population = self.population();
        let shop_size = self.tuning.simulated_shop_size.min(population.len());
        let table = LookaheadTable::build(
            population,
            shop_size,
            self.tuning.num_sample,
            shop.coins,
            &mut self.rng,
        )?;

        let options: Vec<Candidate> = appraisals
            .iter()
            .map(|appraisal| Candidate::new(appraisal.value, appraisal.cost))
            .collect();

        match table.choose(&options, shop.coins) {
            Some(position) => self.accept(appraisals[position], shop),
            None => Ok(Action::Refresh),
        }
    }

    /// Every offer seen this round valued against the current field, best
    /// first, without the ones assumed already bought.
    fn population(&self) -> Vec<Candidate> {
        let mut population: Vec<Candidate> = self
            .seen
            .iter()
            .filter_map(|offer| {
                if offer.cost == 0 {
                    warn!("leaving zero-cost offer {offer:?} out of the look-ahead");
                    return None;
                }
                let template = self.catalog.get(offer.item)?;
                let contribution = self.value_model.contribution(
                    template,
                    offer.raw_damage(template),
                    &self.attributes,
                );
                let radius = self.field.bucket(template.range);
                let value = self
                    .field
                    .best_slot(radius, &contribution)
                    .map_or(0.0, |(_, value)| value);
                Some(Candidate::new(value, offer.cost))
            })
            .collect();

        population.sort_by(|a, b| b.value.total_cmp(&a.value));
        let chosen = self.history.len().min(population.len());
        population.split_off(chosen)
    }

    fn accept(&mut self, appraisal: Appraisal, shop: &Shop) -> Result<Action, PlanError> {
        self.field
            .commit(appraisal.slot, appraisal.radius, &appraisal.contribution)?;

        let offer = shop.offers[appraisal.offer];
        self.history.push(PurchaseRecord {
            offer,
            slot: appraisal.slot,
            value: appraisal.value,
            cost: appraisal.cost,
        });

        Ok(Action::Buy {
            offer: appraisal.offer,
            slot: appraisal.slot,
        })
    }

    fn appraise_shop(&self, offers: &[ItemOffer]) -> Result<Vec<Appraisal>, PlanError> {
        let mut appraisals = Vec::with_capacity(offers.len());
        for (position, offer) in offers.iter().enumerate() {
            let template = self.template(position, offer)?;
            let contribution = self.value_model.contribution(
                template,
                offer.raw_damage(template),
                &self.attributes,
            );
            let radius = self.field.bucket(template.range);

            if let Some((slot, value)) = self.field.best_slot(radius, &contribution) {
                appraisals.push(Appraisal {
                    offer: position,
                    cost: offer.cost,
                    slot,
                    radius,
                    value,
                    contribution,
                });
            }
        }
        Ok(appraisals)
    }

    fn template(&self, position: usize, offer: &ItemOffer) -> Result<&ItemTemplate, PlanError> {
        self.catalog
            .get(offer.item)
            .ok_or(PlanError::UnknownItemType {
                offer: position,
                item: offer.item.get(),
            })
    }

    fn best_observed(&self) -> f64 {
        self.observed.iter().copied().fold(0.0, f64::max)
    }

    fn discard_best_observed(&mut self) {
        let best = self
            .observed
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(position, _)| position);
        if let Some(position) = best {
            let _ = self.observed.swap_remove(position);
        }
    }
}

fn best_affordable(appraisals: &[Appraisal], coins: u32) -> Option<&Appraisal> {
    let mut best: Option<&Appraisal> = None;
    for appraisal in appraisals.iter().filter(|appraisal| appraisal.cost <= coins) {
        if best.map_or(true, |current| appraisal.value > current.value) {
            best = Some(appraisal);
        }
    }
    best
}

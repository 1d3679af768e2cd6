//! Budget-constrained look-ahead used once coins run low.
//!
//! `dp(c)` estimates the best cumulative value reachable with `c` coins when
//! future shops are drawn from a population of `(value, cost)` pairs seen
//! earlier in the round. Each table draws its simulated shops once and
//! reuses them for every coin amount, which keeps `dp` non-decreasing in
//! `c`. A table owns its population, so it can never be consulted after
//! the population it was built from has changed.

use log::trace;
use rand::{seq::index, Rng};

use crate::PlanError;

/// Value and price of one purchasable option.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Marginal value the option would add.
    pub value: f64,
    /// Price in coins.
    pub cost: u32,
}

impl Candidate {
    /// Creates a new candidate.
    #[must_use]
    pub const fn new(value: f64, cost: u32) -> Self {
        Self { value, cost }
    }
}

/// Memoised `dp(c)` for every coin amount up to the one it was built for.
#[derive(Clone, Debug)]
pub struct LookaheadTable {
    population: Vec<Candidate>,
    shops: Vec<Vec<usize>>,
    values: Vec<f64>,
}

impl LookaheadTable {
    /// Draws `num_sample` simulated shops of `shop_size` candidates and fills
    /// `dp(0..=coins)`.
    ///
    /// `shop_size` may not exceed the population; callers shrink it first.
    /// Zero-cost candidates are never bought in simulation and a sample
    /// count of zero is treated as one.
    pub fn build<R>(
        population: Vec<Candidate>,
        shop_size: usize,
        num_sample: usize,
        coins: u32,
        rng: &mut R,
    ) -> Result<Self, PlanError>
    where
        R: Rng + ?Sized,
    {
        if shop_size > population.len() {
            return Err(PlanError::SimulatedShopTooLarge {
                shop_size,
                population: population.len(),
            });
        }

        let shops = (0..num_sample.max(1))
            .map(|_| index::sample(rng, population.len(), shop_size).into_vec())
            .collect();

        let mut table = Self {
            population,
            shops,
            values: Vec::with_capacity(coins as usize + 1),
        };
        table.fill(coins);
        Ok(table)
    }

    /// Largest coin amount covered by the table.
    #[must_use]
    pub fn max_coins(&self) -> u32 {
        self.values.len().saturating_sub(1) as u32
    }

    /// Expected best cumulative value reachable with `coins`.
    ///
    /// Amounts beyond [`Self::max_coins`] report the value at the maximum.
    #[must_use]
    pub fn expected_value(&self, coins: u32) -> f64 {
        let index = (coins as usize).min(self.values.len().saturating_sub(1));
        self.values.get(index).copied().unwrap_or(0.0)
    }

    /// Picks the option to buy now, or `None` when refreshing is expected to
    /// pay off more.
    ///
    /// Every affordable option with a positive value scores
    /// `value + dp(coins - cost)`; refreshing scores `dp(coins - 1)`. Ties go
    /// to buying, and among equal buys to the earliest option.
    #[must_use]
    pub fn choose(&self, options: &[Candidate], coins: u32) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (position, option) in options.iter().enumerate() {
            if option.value <= 0.0 {
                continue;
            }
            let Some(left) = coins.checked_sub(option.cost) else {
                continue;
            };
            let score = option.value + self.expected_value(left);
            trace!("option {position} scores {score:.3}");
            if best.map_or(true, |(_, current)| score > current) {
                best = Some((position, score));
            }
        }

        let (position, buy_score) = best?;
        match coins.checked_sub(1) {
            Some(left) if self.expected_value(left) > buy_score => None,
            _ => Some(position),
        }
    }

    fn fill(&mut self, coins: u32) {
        let cheapest = self
            .population
            .iter()
            .map(|candidate| candidate.cost)
            .filter(|cost| *cost > 0)
            .min();

        for budget in 0..=coins {
            let value = match cheapest {
                Some(cheapest) if budget >= cheapest => self.mean_trial(budget),
                _ => 0.0,
            };
            self.values.push(value);
        }
    }

    fn mean_trial(&self, budget: u32) -> f64 {
        let total: f64 = self
            .shops
            .iter()
            .map(|shop| self.trial(shop, budget))
            .sum();
        total / self.shops.len() as f64
    }

    fn trial(&self, shop: &[usize], budget: u32) -> f64 {
        let refresh = if budget > 1 {
            self.values[budget as usize - 1]
        } else {
            0.0
        };

        shop.iter()
            .filter_map(|&position| self.population.get(position))
            .filter(|candidate| candidate.cost > 0 && candidate.cost <= budget)
            .map(|candidate| candidate.value + self.values[(budget - candidate.cost) as usize])
            .fold(refresh, f64::max)
    }
}

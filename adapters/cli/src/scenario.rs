//! Scripted rounds replayed through the purchase planner.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use shop_advisor_core::{
    Action, ItemCatalog, ItemOffer, ItemTemplate, Point, PredictedAttributes, Shop,
};
use shop_advisor_system_planner::{AdvisorTuning, PurchasePlanner};

use crate::labels::MonsterLabels;

/// One round: geometry, catalog, predicted labels and the shops presented.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Scenario {
    path: Vec<Point>,
    slots: Vec<Point>,
    towers: Vec<ItemTemplate>,
    #[serde(default)]
    labels: Option<MonsterLabels>,
    #[serde(default)]
    cycles: Vec<Cycle>,
}

#[derive(Clone, Debug, Deserialize)]
struct Cycle {
    coins: u32,
    #[serde(default)]
    store: Vec<ItemOffer>,
}

impl Scenario {
    /// Reads a scenario document from disk.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to load scenario at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("scenario is not valid JSON")
    }

    /// Replays every cycle through one planner and returns its answers.
    ///
    /// Missing labels fall back to neutral attributes.
    pub(crate) fn replay(self, tuning: &AdvisorTuning) -> Result<Vec<Action>> {
        let attributes = match &self.labels {
            Some(labels) => labels
                .to_attributes()
                .context("predicted labels are inconsistent")?,
            None => PredictedAttributes::neutral(),
        };
        let catalog = ItemCatalog::new(self.towers).context("tower catalog is invalid")?;
        info!(
            "replaying {} cycles over {} path vertices and {} slots",
            self.cycles.len(),
            self.path.len(),
            self.slots.len()
        );

        let mut planner =
            PurchasePlanner::new(&self.path, &self.slots, catalog, attributes, tuning);
        let mut actions = Vec::with_capacity(self.cycles.len());
        for (index, cycle) in self.cycles.into_iter().enumerate() {
            let shop = Shop {
                offers: cycle.store,
                coins: cycle.coins,
            };
            let action = planner
                .decide(&shop)
                .with_context(|| format!("cycle {index} could not be planned"))?;
            actions.push(action);
        }

        let spent: u32 = planner.history().iter().map(|record| record.cost).sum();
        info!("bought {} items for {spent} coins", planner.history().len());
        Ok(actions)
    }
}

//! Conversion of predictor labels into [`PredictedAttributes`].
//!
//! Predictors describe a monster with six string lists, all of them
//! required. Lists holding a single-valued attribute must carry exactly one
//! entry, `weak` and `resist` at least one, `special_eff` at most one, and
//! the element sets must not contradict each other.

use std::collections::BTreeSet;

use serde::Deserialize;
use shop_advisor_core::{AttackCadence, Element, Occurrence, PredictedAttributes, SlowReaction};
use thiserror::Error;

/// Label lists as emitted by the predictor.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MonsterLabels {
    pub(crate) best_atk_spd: Vec<AttackCadence>,
    pub(crate) weak: Vec<Element>,
    pub(crate) resist: Vec<Element>,
    pub(crate) special_eff: Vec<Element>,
    pub(crate) slow_eff: Vec<SlowReaction>,
    pub(crate) occurrence: Vec<Occurrence>,
}

/// Contradictions found while converting labels.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum LabelError {
    /// A single-valued label did not hold exactly one entry.
    #[error("label `{label}` must hold exactly one value, found {found}")]
    NotSingle {
        /// Label name.
        label: &'static str,
        /// Number of entries present.
        found: usize,
    },
    /// An element set was left empty.
    #[error("label `{0}` must name at least one element")]
    NoElements(&'static str),
    /// More than one special element was predicted.
    #[error("label `special_eff` holds {0} values, at most one is allowed")]
    SeveralSpecial(usize),
    /// An element is both a weakness and a resistance.
    #[error("{0:?} is listed as both weak and resisted")]
    WeakAndResisted(Element),
    /// The special element is resisted.
    #[error("special element {0:?} is also resisted")]
    SpecialResisted(Element),
}

impl MonsterLabels {
    /// Validates the labels and converts them into attributes.
    pub(crate) fn to_attributes(&self) -> Result<PredictedAttributes, LabelError> {
        let cadence = single("best_atk_spd", &self.best_atk_spd)?;
        let slow_reaction = single("slow_eff", &self.slow_eff)?;
        let occurrence = single("occurrence", &self.occurrence)?;

        let weak = elements("weak", &self.weak)?;
        let resist = elements("resist", &self.resist)?;
        let special = match self.special_eff.as_slice() {
            [] => None,
            [element] => Some(*element),
            several => return Err(LabelError::SeveralSpecial(several.len())),
        };

        if let Some(element) = weak.intersection(&resist).next() {
            return Err(LabelError::WeakAndResisted(*element));
        }
        if let Some(element) = special.filter(|element| resist.contains(element)) {
            return Err(LabelError::SpecialResisted(element));
        }

        Ok(PredictedAttributes {
            cadence,
            weak,
            resist,
            special,
            slow_reaction,
            occurrence,
        })
    }
}

fn single<T: Copy>(label: &'static str, values: &[T]) -> Result<T, LabelError> {
    match values {
        [value] => Ok(*value),
        _ => Err(LabelError::NotSingle {
            label,
            found: values.len(),
        }),
    }
}

fn elements(label: &'static str, values: &[Element]) -> Result<BTreeSet<Element>, LabelError> {
    if values.is_empty() {
        return Err(LabelError::NoElements(label));
    }
    Ok(values.iter().copied().collect())
}

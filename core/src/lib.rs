#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the shop advisor.
//!
//! This crate defines the vocabulary that connects the adapters and the pure
//! systems. Adapters translate transport payloads into [`Shop`] snapshots,
//! [`ItemCatalog`] templates and [`PredictedAttributes`], the systems sample
//! the path, maintain the damage field and plan purchases, and the planner
//! answers every decision cycle with exactly one [`Action`].

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position on the game map expressed in map units.
///
/// On the wire a point is a two-element `[x, y]` array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Point located `t` of the way from `self` to `other`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Sample of the monster path carrying the damage accumulated over it.
///
/// Each sample stands for a thin stretch of path whose length equals the
/// sampling spacing. The accumulators only ever grow more favourable:
/// damage adds up, the slow factor only decreases and the special effect
/// flag never resets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    position: Point,
    total_damage: f64,
    slow_factor: f64,
    has_special_eff: bool,
}

impl PathPoint {
    /// Creates an untouched sample at the provided position.
    #[must_use]
    pub const fn new(position: Point) -> Self {
        Self {
            position,
            total_damage: 0.0,
            slow_factor: 1.0,
            has_special_eff: false,
        }
    }

    /// Location of the sample on the map.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Attack mass assigned to the sample so far.
    #[must_use]
    pub const fn total_damage(&self) -> f64 {
        self.total_damage
    }

    /// Strongest slow multiplier assigned so far, `1.0` when unslowed.
    #[must_use]
    pub const fn slow_factor(&self) -> f64 {
        self.slow_factor
    }

    /// Reports whether any covering item unlocked the special bonus.
    #[must_use]
    pub const fn has_special_eff(&self) -> bool {
        self.has_special_eff
    }

    /// Folds a committed contribution into the sample.
    pub fn absorb(&mut self, contribution: &Contribution) {
        self.total_damage += contribution.attack_rate;
        self.slow_factor = self.slow_factor.min(contribution.slow_factor);
        self.has_special_eff |= contribution.is_special;
    }
}

/// Index of a placement slot as announced by the map.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(usize);

impl SlotId {
    /// Creates a new slot identifier.
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Retrieves the numeric index of the slot.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Discrete location where one item may be placed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementSlot {
    id: SlotId,
    position: Point,
    occupied: bool,
}

impl PlacementSlot {
    /// Creates a free slot.
    #[must_use]
    pub const fn new(id: SlotId, position: Point) -> Self {
        Self {
            id,
            position,
            occupied: false,
        }
    }

    /// Identifier of the slot.
    #[must_use]
    pub const fn id(&self) -> SlotId {
        self.id
    }

    /// Location of the slot on the map.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Reports whether an item already sits in the slot.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Marks the slot as holding an item.
    pub fn occupy(&mut self) {
        self.occupied = true;
    }
}

/// Builds the slot list for a round from the announced positions.
#[must_use]
pub fn slots_from_positions(positions: &[Point]) -> Vec<PlacementSlot> {
    positions
        .iter()
        .enumerate()
        .map(|(index, position)| PlacementSlot::new(SlotId::new(index), *position))
        .collect()
}

/// Damage element carried by an item.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Element {
    /// Fire damage.
    Fire,
    /// Ice damage.
    Ice,
    /// Poison damage.
    Poison,
    /// Blunt damage.
    Blunt,
    /// Lightning damage.
    Lightning,
}

/// Attack cadence the monster is most vulnerable to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackCadence {
    /// Rapid attackers perform best.
    Fast,
    /// No cadence preference.
    Normal,
    /// Heavy, slow attackers perform best.
    Slow,
}

/// How the monster reacts to slowing effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlowReaction {
    /// Slowing has no effect.
    Resist,
    /// Slowing works as advertised.
    Normal,
    /// Slowing is unusually effective.
    Weak,
}

/// Spawn pattern of the monster, bounding how many targets one hit can reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occurrence {
    /// Monsters arrive alone.
    Single,
    /// Monsters arrive in pairs.
    Double,
    /// Monsters arrive in threes.
    Triple,
    /// Monsters arrive spread out.
    Sparse,
    /// Monsters arrive packed together.
    Dense,
}

/// Monster attributes predicted for the current round.
///
/// `weak` and `resist` are disjoint and `special` never names a resisted
/// element; the producer of this value is responsible for those rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedAttributes {
    /// Attack cadence the monster is most vulnerable to.
    pub cadence: AttackCadence,
    /// Elements dealing extra damage.
    pub weak: BTreeSet<Element>,
    /// Elements dealing reduced damage.
    pub resist: BTreeSet<Element>,
    /// Element unlocking the special bonus, if any.
    pub special: Option<Element>,
    /// Reaction to slowing effects.
    pub slow_reaction: SlowReaction,
    /// Spawn pattern of the monster.
    pub occurrence: Occurrence,
}

impl PredictedAttributes {
    /// Attributes that neither favour nor penalise any item.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            cadence: AttackCadence::Normal,
            weak: BTreeSet::new(),
            resist: BTreeSet::new(),
            special: None,
            slow_reaction: SlowReaction::Normal,
            occurrence: Occurrence::Sparse,
        }
    }

    /// Reports whether `element` deals extra damage.
    #[must_use]
    pub fn is_weak_to(&self, element: Element) -> bool {
        self.weak.contains(&element)
    }

    /// Reports whether `element` deals reduced damage.
    #[must_use]
    pub fn resists(&self, element: Element) -> bool {
        self.resist.contains(&element)
    }
}

/// Maximum number of simultaneous targets an item can hit.
///
/// On the wire this is the signed `n_targets` field where any negative value
/// means the item is not limited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum TargetCap {
    /// The item hits at most this many targets.
    Limited(u32),
    /// The item hits every target in range.
    Unlimited,
}

impl From<i32> for TargetCap {
    fn from(value: i32) -> Self {
        match u32::try_from(value) {
            Ok(count) => Self::Limited(count),
            Err(_) => Self::Unlimited,
        }
    }
}

impl From<TargetCap> for i32 {
    fn from(cap: TargetCap) -> Self {
        match cap {
            TargetCap::Limited(count) => i32::try_from(count).unwrap_or(i32::MAX),
            TargetCap::Unlimited => -1,
        }
    }
}

/// Index of an item type within the [`ItemCatalog`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemTypeId(usize);

impl ItemTypeId {
    /// Creates a new item type identifier.
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Retrieves the numeric index of the item type.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

fn no_slow() -> f64 {
    1.0
}

/// Static description of a purchasable item type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Damage dealt per hit.
    pub damage: f64,
    /// Seconds between two hits.
    pub interval: f64,
    /// Reach of the item in map units.
    pub range: f64,
    /// Element of the damage.
    #[serde(rename = "type")]
    pub element: Element,
    /// Simultaneous target limit.
    pub n_targets: TargetCap,
    /// Speed multiplier applied to hit monsters, `1.0` when the item does not slow.
    #[serde(rename = "speedDown", default = "no_slow")]
    pub speed_down: f64,
    /// Area or bullet behaviour that reaches packed monsters.
    #[serde(alias = "bullet", default)]
    pub area: bool,
}

/// Reasons an item template is refused by the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum CatalogError {
    /// The damage is negative or not a number.
    #[error("item type {item} has invalid damage {damage}")]
    InvalidDamage {
        /// Offending item type index.
        item: usize,
        /// Rejected damage.
        damage: f64,
    },
    /// The attack interval is not strictly positive.
    #[error("item type {item} has non-positive attack interval {interval}")]
    InvalidInterval {
        /// Offending item type index.
        item: usize,
        /// Rejected interval.
        interval: f64,
    },
    /// The range is negative or not a number.
    #[error("item type {item} has invalid range {range}")]
    InvalidRange {
        /// Offending item type index.
        item: usize,
        /// Rejected range.
        range: f64,
    },
    /// The slow multiplier lies outside `(0, 1]`.
    #[error("item type {item} has slow multiplier {speed_down} outside (0, 1]")]
    InvalidSlowFactor {
        /// Offending item type index.
        item: usize,
        /// Rejected multiplier.
        speed_down: f64,
    },
}

/// Validated catalog of item templates indexed by [`ItemTypeId`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemCatalog {
    templates: Vec<ItemTemplate>,
}

impl ItemCatalog {
    /// Validates the templates and builds the catalog.
    pub fn new(templates: Vec<ItemTemplate>) -> Result<Self, CatalogError> {
        for (item, template) in templates.iter().enumerate() {
            validate_template(item, template)?;
        }
        Ok(Self { templates })
    }

    /// Looks up the template of an item type.
    #[must_use]
    pub fn get(&self, id: ItemTypeId) -> Option<&ItemTemplate> {
        self.templates.get(id.get())
    }

    /// Number of item types in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Reports whether the catalog holds no item types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn validate_template(item: usize, template: &ItemTemplate) -> Result<(), CatalogError> {
    if !(template.damage >= 0.0) || !template.damage.is_finite() {
        return Err(CatalogError::InvalidDamage {
            item,
            damage: template.damage,
        });
    }
    if !(template.interval > 0.0) || !template.interval.is_finite() {
        return Err(CatalogError::InvalidInterval {
            item,
            interval: template.interval,
        });
    }
    if !(template.range >= 0.0) || !template.range.is_finite() {
        return Err(CatalogError::InvalidRange {
            item,
            range: template.range,
        });
    }
    if !(template.speed_down > 0.0 && template.speed_down <= 1.0) {
        return Err(CatalogError::InvalidSlowFactor {
            item,
            speed_down: template.speed_down,
        });
    }
    Ok(())
}

/// Item offered by the shop during one decision cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemOffer {
    /// Item type being sold.
    #[serde(rename = "type")]
    pub item: ItemTypeId,
    /// Price in coins.
    pub cost: u32,
    /// Per-offer damage replacing the template damage when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
}

impl ItemOffer {
    /// Creates an offer that sells the template as is.
    #[must_use]
    pub const fn new(item: ItemTypeId, cost: u32) -> Self {
        Self {
            item,
            cost,
            damage: None,
        }
    }

    /// Damage per hit of the offered item.
    #[must_use]
    pub fn raw_damage(&self, template: &ItemTemplate) -> f64 {
        self.damage.unwrap_or(template.damage)
    }
}

/// Shop contents and coin balance presented in one decision cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    /// Offers in shop order; `Action::Buy` refers to them by position.
    pub offers: Vec<ItemOffer>,
    /// Coins available to spend.
    pub coins: u32,
}

/// Effective per-time contribution of one item to the damage field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contribution {
    /// Damage per time unit after every attribute adjustment.
    pub attack_rate: f64,
    /// Slow multiplier the item imposes on covered samples.
    pub slow_factor: f64,
    /// Whether the item unlocks the special bonus.
    pub is_special: bool,
}

impl Contribution {
    /// Creates a new contribution.
    #[must_use]
    pub const fn new(attack_rate: f64, slow_factor: f64, is_special: bool) -> Self {
        Self {
            attack_rate,
            slow_factor,
            is_special,
        }
    }
}

/// Answer produced for a decision cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Pay one coin to replace the shop contents.
    Refresh,
    /// Buy an offer and place it into a slot.
    Buy {
        /// Position of the offer within the shop.
        offer: usize,
        /// Slot receiving the item.
        slot: SlotId,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("refresh"),
            Self::Buy { offer, slot } => write!(f, "buy {offer} {}", slot.get()),
        }
    }
}

/// Reasons an action command string could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionParseError {
    /// The command contained no verb.
    #[error("empty action command")]
    Empty,
    /// The verb is neither `refresh` nor `buy`.
    #[error("unknown action `{0}`")]
    UnknownVerb(String),
    /// A `buy` command lacked one of its indices.
    #[error("buy command is missing the {0} index")]
    MissingIndex(&'static str),
    /// An index was not a non-negative integer.
    #[error("invalid {field} index `{value}`")]
    InvalidIndex {
        /// Name of the index being parsed.
        field: &'static str,
        /// Text that failed to parse.
        value: String,
    },
    /// Extra tokens followed a complete command.
    #[error("unexpected trailing input `{0}`")]
    TrailingInput(String),
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut tokens = value.split_whitespace();
        let verb = tokens.next().ok_or(ActionParseError::Empty)?;

        let action = if verb.eq_ignore_ascii_case("refresh") {
            Self::Refresh
        } else if verb.eq_ignore_ascii_case("buy") {
            let offer = parse_index(tokens.next(), "offer")?;
            let slot = parse_index(tokens.next(), "slot")?;
            Self::Buy {
                offer,
                slot: SlotId::new(slot),
            }
        } else {
            return Err(ActionParseError::UnknownVerb(verb.to_owned()));
        };

        match tokens.next() {
            Some(extra) => Err(ActionParseError::TrailingInput(extra.to_owned())),
            None => Ok(action),
        }
    }
}

fn parse_index(token: Option<&str>, field: &'static str) -> Result<usize, ActionParseError> {
    let token = token.ok_or(ActionParseError::MissingIndex(field))?;
    token.parse().map_err(|_| ActionParseError::InvalidIndex {
        field,
        value: token.to_owned(),
    })
}

/// Purchase accepted by the planner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PurchaseRecord {
    /// Offer that was bought.
    pub offer: ItemOffer,
    /// Slot that received the item.
    pub slot: SlotId,
    /// Marginal value realised when the purchase was committed.
    pub value: f64,
    /// Coins paid.
    pub cost: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    fn template() -> ItemTemplate {
        ItemTemplate {
            damage: 12.0,
            interval: 0.5,
            range: 6.0,
            element: Element::Fire,
            n_targets: TargetCap::Limited(1),
            speed_down: 1.0,
            area: false,
        }
    }

    #[test]
    fn action_displays_in_command_form() {
        assert_eq!(Action::Refresh.to_string(), "refresh");
        let buy = Action::Buy {
            offer: 2,
            slot: SlotId::new(7),
        };
        assert_eq!(buy.to_string(), "buy 2 7");
    }

    #[test]
    fn action_parses_case_insensitively() {
        assert_eq!("REFRESH".parse::<Action>(), Ok(Action::Refresh));
        assert_eq!(
            "  Buy 0 1 ".parse::<Action>(),
            Ok(Action::Buy {
                offer: 0,
                slot: SlotId::new(1),
            })
        );
    }

    #[test]
    fn malformed_actions_are_rejected() {
        assert_eq!("".parse::<Action>(), Err(ActionParseError::Empty));
        assert_eq!(
            "sell 1".parse::<Action>(),
            Err(ActionParseError::UnknownVerb("sell".to_owned()))
        );
        assert_eq!(
            "buy 1".parse::<Action>(),
            Err(ActionParseError::MissingIndex("slot"))
        );
        assert_eq!(
            "buy x 1".parse::<Action>(),
            Err(ActionParseError::InvalidIndex {
                field: "offer",
                value: "x".to_owned(),
            })
        );
        assert_eq!(
            "refresh now".parse::<Action>(),
            Err(ActionParseError::TrailingInput("now".to_owned()))
        );
    }

    #[test]
    fn negative_target_count_means_unlimited() {
        assert_eq!(TargetCap::from(-1), TargetCap::Unlimited);
        assert_eq!(TargetCap::from(3), TargetCap::Limited(3));
        assert_eq!(i32::from(TargetCap::Unlimited), -1);
    }

    #[test]
    fn path_point_accumulates_with_min_slow_and_sticky_special() {
        let mut point = PathPoint::new(Point::new(1.0, 2.0));
        point.absorb(&Contribution::new(4.0, 0.5, true));
        point.absorb(&Contribution::new(1.0, 0.8, false));

        assert!((point.total_damage() - 5.0).abs() < f64::EPSILON);
        assert!((point.slow_factor() - 0.5).abs() < f64::EPSILON);
        assert!(point.has_special_eff());
    }

    #[test]
    fn catalog_rejects_invalid_templates() {
        let mut zero_interval = template();
        zero_interval.interval = 0.0;
        assert!(matches!(
            ItemCatalog::new(vec![template(), zero_interval]),
            Err(CatalogError::InvalidInterval { item: 1, .. })
        ));

        let mut no_slow_left = template();
        no_slow_left.speed_down = 0.0;
        assert!(matches!(
            ItemCatalog::new(vec![no_slow_left]),
            Err(CatalogError::InvalidSlowFactor { item: 0, .. })
        ));

        let mut negative_range = template();
        negative_range.range = -1.0;
        assert!(matches!(
            ItemCatalog::new(vec![negative_range]),
            Err(CatalogError::InvalidRange { item: 0, .. })
        ));
    }

    #[test]
    fn catalog_lookup_by_identifier() {
        let catalog = ItemCatalog::new(vec![template()]).expect("valid catalog");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(ItemTypeId::new(0)).is_some());
        assert!(catalog.get(ItemTypeId::new(1)).is_none());
    }

    #[test]
    fn template_reads_wire_field_names() {
        let json = r#"{"type":"Ice","damage":3,"interval":0.05,"range":4.5,"n_targets":-1,"speedDown":0.6,"bullet":true}"#;
        let parsed: ItemTemplate = serde_json::from_str(json).expect("template parses");

        assert_eq!(parsed.element, Element::Ice);
        assert_eq!(parsed.n_targets, TargetCap::Unlimited);
        assert!((parsed.speed_down - 0.6).abs() < f64::EPSILON);
        assert!(parsed.area);
    }

    #[test]
    fn template_defaults_to_no_slow_and_single_target_behaviour() {
        let json = r#"{"type":"Blunt","damage":8,"interval":0.4,"range":3,"n_targets":1}"#;
        let parsed: ItemTemplate = serde_json::from_str(json).expect("template parses");

        assert!((parsed.speed_down - 1.0).abs() < f64::EPSILON);
        assert!(!parsed.area);
    }

    #[test]
    fn offer_damage_overrides_template() {
        let mut offer = ItemOffer::new(ItemTypeId::new(0), 10);
        assert!((offer.raw_damage(&template()) - 12.0).abs() < f64::EPSILON);
        offer.damage = Some(20.0);
        assert!((offer.raw_damage(&template()) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn predicted_attributes_round_trip_through_bincode() {
        let mut attributes = PredictedAttributes::neutral();
        let _ = attributes.weak.insert(Element::Poison);
        let _ = attributes.resist.insert(Element::Blunt);
        attributes.special = Some(Element::Fire);
        attributes.occurrence = Occurrence::Dense;
        assert_round_trip(&attributes);
    }

    #[test]
    fn template_round_trips_through_bincode() {
        let mut unlimited = template();
        unlimited.n_targets = TargetCap::Unlimited;
        assert_round_trip(&unlimited);
    }

    #[test]
    fn slots_are_numbered_in_announcement_order() {
        let slots = slots_from_positions(&[Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(slots[1].id(), SlotId::new(1));
        assert!((slots[0].position().distance(slots[1].position()) - 5.0).abs() < 1e-12);
        assert!(!slots[1].is_occupied());
    }
}

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shop_advisor_core::{slots_from_positions, Contribution, PathPoint, Point, SlotId};
use shop_advisor_system_coverage::{CoverageIndex, CoverageTuning};
use shop_advisor_system_damage_field::{DamageField, FieldTuning};

const EPSILON: f64 = 1e-9;

/// Ten samples one unit apart on the x axis, slots given explicitly.
fn unit_line(slot_positions: &[Point]) -> DamageField {
    let points: Vec<PathPoint> = (0..10)
        .map(|x| PathPoint::new(Point::new(x as f64, 0.0)))
        .collect();
    let slots = slots_from_positions(slot_positions);
    let coverage = Arc::new(CoverageIndex::build(&slots, &points, 20));
    DamageField::new(points, slots, coverage, 1.0, &FieldTuning::default())
}

fn on_point_five(count: usize) -> Vec<Point> {
    vec![Point::new(5.0, 0.0); count]
}

#[test]
fn worked_example_counts_three_samples_then_nothing() {
    let mut field = unit_line(&on_point_five(1));
    let item = Contribution::new(10.0, 1.0, false);

    let value = field.evaluate(SlotId::new(0), 2, &item);
    assert!((value - 30.0).abs() < EPSILON, "expected 30, got {value}");

    field
        .commit(SlotId::new(0), 2, &item)
        .expect("slot is free");
    assert_eq!(field.evaluate(SlotId::new(0), 2, &item), 0.0);

    for index in 4..=6 {
        assert!((field.points()[index].total_damage() - 10.0).abs() < EPSILON);
    }
    assert_eq!(field.points()[3].total_damage(), 0.0);
    assert_eq!(field.points()[7].total_damage(), 0.0);
}

#[test]
fn evaluate_does_not_mutate_the_field() {
    let mut field = unit_line(&on_point_five(2));
    field
        .commit(SlotId::new(0), 3, &Contribution::new(4.0, 0.7, true))
        .expect("slot is free");

    let item = Contribution::new(6.0, 0.5, false);
    let first = field.evaluate(SlotId::new(1), 4, &item);
    let second = field.evaluate(SlotId::new(1), 4, &item);

    assert_eq!(first, second);
    assert!(field.is_available(SlotId::new(1)));
}

#[test]
fn higher_attack_rate_never_lowers_the_gain() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut field = unit_line(&on_point_five(2));
    field
        .commit(SlotId::new(0), 2, &Contribution::new(3.0, 0.6, true))
        .expect("slot is free");

    for _ in 0..50 {
        let slow = rng.gen_range(0.1..=1.0);
        let special = rng.gen_bool(0.5);
        let radius = rng.gen_range(0..=6);
        let low = rng.gen_range(0.0..20.0);
        let high = low + rng.gen_range(0.0..20.0);

        let low_gain = field.evaluate(SlotId::new(1), radius, &Contribution::new(low, slow, special));
        let high_gain =
            field.evaluate(SlotId::new(1), radius, &Contribution::new(high, slow, special));
        assert!(high_gain + EPSILON >= low_gain, "{high_gain} < {low_gain}");
    }
}

#[test]
fn strongest_slow_wins() {
    let mut field = unit_line(&on_point_five(2));
    field
        .commit(SlotId::new(0), 2, &Contribution::new(1.0, 0.5, false))
        .expect("slot is free");
    field
        .commit(SlotId::new(1), 2, &Contribution::new(1.0, 0.8, false))
        .expect("slot is free");

    assert_eq!(field.points()[5].slow_factor(), 0.5);
    assert_eq!(field.points()[0].slow_factor(), 1.0);
}

#[test]
fn special_effect_stays_on() {
    let mut field = unit_line(&on_point_five(3));
    field
        .commit(SlotId::new(0), 2, &Contribution::new(1.0, 1.0, true))
        .expect("slot is free");
    field
        .commit(SlotId::new(1), 2, &Contribution::new(5.0, 1.0, false))
        .expect("slot is free");

    assert!(field.points()[5].has_special_eff());
    assert!(!field.points()[8].has_special_eff());

    let later = field.evaluate(SlotId::new(2), 2, &Contribution::new(1.0, 1.0, false));
    let bonus = FieldTuning::default().special_bonus;
    assert!((later - 3.0 * bonus).abs() < EPSILON);
}

#[test]
fn special_item_lifts_existing_damage() {
    let mut field = unit_line(&on_point_five(2));
    field
        .commit(SlotId::new(0), 2, &Contribution::new(10.0, 1.0, false))
        .expect("slot is free");

    let gain = field.evaluate(SlotId::new(1), 2, &Contribution::new(0.0, 1.0, true));
    let bonus = FieldTuning::default().special_bonus;
    assert!((gain - 3.0 * 10.0 * (bonus - 1.0)).abs() < EPSILON);
}

#[test]
fn slow_item_multiplies_existing_damage() {
    let mut field = unit_line(&on_point_five(2));
    field
        .commit(SlotId::new(0), 1, &Contribution::new(8.0, 1.0, false))
        .expect("slot is free");

    let gain = field.evaluate(SlotId::new(1), 1, &Contribution::new(0.0, 0.5, false));
    assert!((gain - 8.0).abs() < EPSILON);
}

#[test]
fn degenerate_geometry_is_worth_nothing() {
    let tuning = CoverageTuning::default();
    let item = Contribution::new(10.0, 1.0, true);

    let short_path = DamageField::from_geometry(
        &[Point::new(0.0, 0.0), Point::new(0.3, 0.0)],
        &[Point::new(0.0, 0.0)],
        &tuning,
        &FieldTuning::default(),
    );
    assert!(short_path.points().is_empty());
    assert_eq!(short_path.evaluate(SlotId::new(0), 20, &item), 0.0);
    assert!(short_path.best_slot(20, &item).is_none());

    let no_slots = DamageField::from_geometry(
        &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
        &[],
        &tuning,
        &FieldTuning::default(),
    );
    assert_eq!(no_slots.points().len(), 10);
    assert!(no_slots.best_slot(20, &item).is_none());
}

use std::collections::BTreeMap;

use chrono::NaiveDate;
use eatwise::consumption::{aggregate_consumed, merge_meal_slot, DayMeals};
use eatwise::goals::compute_goal;
use eatwise::models::*;
use eatwise::progress::{
    compute_bmi, evaluate_progress, forward_fill_history, BmiCategory, WeightProgress,
};

fn reference_profile() -> UserProfile {
    UserProfile {
        current_weight: 70.0,
        goal_weight: 70.0,
        height: 175.0,
        age: 30,
        sex_offset: Sex::Male.offset(),
        activity_multiplier: ActivityLevel::Low.multiplier(),
        diet_type: DietType::Balanced,
        diet_value: 0,
        ..UserProfile::default()
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
}

#[test]
fn diet_splits_sum_to_one() {
    for diet in DietType::ALL {
        let total = diet.split().total();
        assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", diet, total);
    }
}

#[test]
fn reference_goal() {
    let goal = compute_goal(&reference_profile());
    assert_eq!(goal.kcal, 2391);
    assert_eq!(goal.carbs, 299);
    assert_eq!(goal.protein, 120);
    assert_eq!(goal.fat, 80);
    assert_eq!(goal, compute_goal(&reference_profile()));
}

#[test]
fn saving_a_slot_twice_adds_up() {
    let first = merge_meal_slot(None, &[MealEntry::new("Oats", 200.0, 7.0, 4.0, 33.0)]);
    let second = merge_meal_slot(Some(&first), &[MealEntry::new("Milk", 150.0, 8.0, 8.0, 12.0)]);
    assert_eq!(second.kcal, 350);
    assert_eq!(second.protein, 15);

    let mut meals = DayMeals::new();
    meals.apply(MealSlot::Breakfast, &[MealEntry::new("Oats", 200.0, 0.0, 0.0, 0.0)]);
    meals.apply(MealSlot::Breakfast, &[MealEntry::new("Milk", 150.0, 0.0, 0.0, 0.0)]);
    assert_eq!(meals.get(MealSlot::Breakfast).kcal, 350);
}

#[test]
fn consumed_totals_ignore_slot_order() {
    let breakfast = MacroTotals { kcal: 410, carbs: 50, protein: 20, fat: 12 };
    let lunch = MacroTotals { kcal: 730, carbs: 80, protein: 45, fat: 25 };
    let dinner = MacroTotals { kcal: 620, carbs: 40, protein: 50, fat: 28 };

    let forward = aggregate_consumed([&breakfast, &lunch, &dinner]);
    let backward = aggregate_consumed([&dinner, &lunch, &breakfast]);
    assert_eq!(forward, backward);
    assert_eq!(forward.kcal, 1760);
}

#[test]
fn bmi_examples() {
    let bmi = compute_bmi(70.0, 175.0).unwrap();
    assert!((bmi.value - 22.857).abs() < 1e-3);
    assert_eq!(bmi.category, BmiCategory::NormalWeight);
    assert_eq!(bmi.to_string(), "22.86 (Normal weight)");
    assert!(compute_bmi(70.0, 0.0).is_none());
}

#[test]
fn progress_examples() {
    let history = [WeightLogEntry { date: day(1), weight: 100.0 }];
    assert_eq!(evaluate_progress(&history, 95.0).to_string(), "lost 5.0 kg");
    assert_eq!(evaluate_progress(&[], 95.0), WeightProgress::NotAvailable);
    assert_eq!(evaluate_progress(&[], 95.0).to_string(), "not available");
}

#[test]
fn forward_fill_five_days() {
    let mut sparse = BTreeMap::new();
    sparse.insert(day(1), 80.0);
    sparse.insert(day(5), 78.5);

    let filled = forward_fill_history(&sparse, day(1), day(5), 77.0);
    let weights: Vec<f64> = filled.iter().map(|e| e.weight).collect();
    assert_eq!(weights, vec![80.0, 80.0, 80.0, 80.0, 78.5]);
    assert_eq!(filled.first().unwrap().date, day(1));
    assert_eq!(filled.last().unwrap().date, day(5));
}

use chrono::{Datelike, NaiveDate};

use crate::models::{DailyGoal, UserProfile};

pub const KCAL_PER_GRAM_CARBS: f64 = 4.0;
pub const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Size of the daily surplus or deficit applied while away from the goal weight.
pub const DIET_VALUE_STEP: i32 = 300;

/// Estimated daily energy expenditure before the diet adjustment.
pub fn base_kcal(profile: &UserProfile) -> f64 {
    (10.0 * profile.current_weight + 6.25 * profile.height - 5.0 * f64::from(profile.age)
        + profile.sex_offset)
        * profile.activity_multiplier
}

/// Daily calorie and macro targets for a profile.
///
/// Macro grams are derived from the unrounded calorie target, so they may not
/// add back up to exactly `kcal`. A profile with missing numbers can produce a
/// non-positive target; that is passed through as-is.
pub fn compute_goal(profile: &UserProfile) -> DailyGoal {
    let kcal = base_kcal(profile) + f64::from(profile.diet_value);
    let split = profile.diet_type.split();

    DailyGoal {
        kcal: kcal.round() as i64,
        carbs: (kcal * split.carbs / KCAL_PER_GRAM_CARBS).round() as i64,
        protein: (kcal * split.protein / KCAL_PER_GRAM_PROTEIN).round() as i64,
        fat: (kcal * split.fat / KCAL_PER_GRAM_FAT).round() as i64,
    }
}

/// Calorie adjustment nudging the user towards `goal_weight`.
pub fn diet_value_for(current_weight: f64, goal_weight: f64) -> i32 {
    if current_weight > goal_weight {
        -DIET_VALUE_STEP
    } else if current_weight < goal_weight {
        DIET_VALUE_STEP
    } else {
        0
    }
}

/// Whole years between `birth` and `on`.
///
/// A year is taken off when `on` falls earlier in its year than `birth` did,
/// comparing day-of-year numbers. Around leap days this can be a day off from
/// a calendar birthday.
pub fn age_at(birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - birth.year();
    if on.ordinal() < birth.ordinal() {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, DietType, Sex};

    fn profile() -> UserProfile {
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

    #[test]
    fn balanced_reference_profile() {
        // (700 + 1093.75 - 150 + 5) * 1.45 = 2390.6875
        let goal = compute_goal(&profile());
        assert_eq!(
            goal,
            DailyGoal {
                kcal: 2391,
                carbs: 299,
                protein: 120,
                fat: 80,
            }
        );
    }

    #[test]
    fn diet_value_shifts_target() {
        let mut p = profile();
        p.diet_value = -300;
        assert_eq!(compute_goal(&p).kcal, 2091);
        p.diet_value = 300;
        assert_eq!(compute_goal(&p).kcal, 2691);
    }

    #[test]
    fn ketogenic_split() {
        let mut p = profile();
        p.diet_type = DietType::Ketogenic;
        let goal = compute_goal(&p);
        assert_eq!(goal.carbs, 60);
        assert_eq!(goal.protein, 90);
        assert_eq!(goal.fat, 199);
    }

    #[test]
    fn female_high_activity() {
        let mut p = profile();
        p.sex_offset = Sex::Female.offset();
        p.activity_multiplier = ActivityLevel::High.multiplier();
        // (700 + 1093.75 - 150 - 161) * 1.85 = 2743.0875
        assert_eq!(compute_goal(&p).kcal, 2743);
    }

    #[test]
    fn empty_profile_is_accepted() {
        let mut p = UserProfile::default();
        p.diet_value = -300;
        let goal = compute_goal(&p);
        assert_eq!(goal.kcal, -300);
        assert!(goal.carbs < 0);
    }

    #[test]
    fn goal_is_deterministic() {
        assert_eq!(compute_goal(&profile()), compute_goal(&profile()));
    }

    #[test]
    fn diet_value_direction() {
        assert_eq!(diet_value_for(90.0, 80.0), -300);
        assert_eq!(diet_value_for(60.0, 65.5), 300);
        assert_eq!(diet_value_for(72.0, 72.0), 0);
    }

    #[test]
    fn age_before_and_after_birthday() {
        let birth = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        assert_eq!(age_at(birth, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()), 34);
        assert_eq!(age_at(birth, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()), 35);
        assert_eq!(age_at(birth, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()), 35);
    }
}

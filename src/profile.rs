use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::goals::{age_at, diet_value_for};
use crate::models::{ActivityLevel, DietType, Sex, UserProfile};

pub const WEIGHT_RANGE_KG: RangeInclusive<f64> = 1.0..=1000.0;
pub const HEIGHT_RANGE_CM: RangeInclusive<f64> = 30.0..=300.0;
pub const BIRTH_YEAR_RANGE: RangeInclusive<i32> = 1890..=3000;

/// Body metrics entered at sign-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub current_weight: f64,
    pub goal_weight: f64,
    pub height: f64,
    pub birth_year: i32,
    pub birth_month: u32,
    pub birth_day: u32,
    pub sex: Sex,
    pub activity: ActivityLevel,
}

impl RegistrationForm {
    /// Check the form, returning the birth date on success.
    pub fn validate(&self) -> Result<NaiveDate, ValidationError> {
        if !WEIGHT_RANGE_KG.contains(&self.current_weight) {
            return Err(ValidationError::CurrentWeight(self.current_weight));
        }
        if !WEIGHT_RANGE_KG.contains(&self.goal_weight) {
            return Err(ValidationError::GoalWeight(self.goal_weight));
        }
        if !HEIGHT_RANGE_CM.contains(&self.height) {
            return Err(ValidationError::Height(self.height));
        }

        let invalid_birth_date = ValidationError::BirthDate {
            year: self.birth_year,
            month: self.birth_month,
            day: self.birth_day,
        };
        if !BIRTH_YEAR_RANGE.contains(&self.birth_year) {
            return Err(invalid_birth_date);
        }
        NaiveDate::from_ymd_opt(self.birth_year, self.birth_month, self.birth_day)
            .ok_or(invalid_birth_date)
    }

    /// Build the profile stored at sign-up on `today`.
    pub fn into_profile(self, today: NaiveDate) -> Result<UserProfile, ValidationError> {
        let birth_date = self.validate()?;
        Ok(UserProfile {
            current_weight: self.current_weight,
            goal_weight: self.goal_weight,
            height: self.height,
            birth_date: Some(birth_date),
            age: age_at(birth_date, today),
            sex_offset: self.sex.offset(),
            activity_multiplier: self.activity.multiplier(),
            diet_type: DietType::default(),
            diet_value: diet_value_for(self.current_weight, self.goal_weight),
            created_at: Some(today),
        })
    }
}

pub fn validate_weight(weight: f64) -> Result<f64, ValidationError> {
    if WEIGHT_RANGE_KG.contains(&weight) {
        Ok(weight)
    } else {
        Err(ValidationError::Weight(weight))
    }
}

/// Change the goal weight, keeping the diet value pointed at it.
pub fn set_goal_weight(profile: &mut UserProfile, goal_weight: f64) -> Result<(), ValidationError> {
    if !WEIGHT_RANGE_KG.contains(&goal_weight) {
        return Err(ValidationError::GoalWeight(goal_weight));
    }
    profile.goal_weight = goal_weight;
    profile.diet_value = diet_value_for(profile.current_weight, goal_weight);
    Ok(())
}

pub fn set_activity_level(profile: &mut UserProfile, level: ActivityLevel) {
    profile.activity_multiplier = level.multiplier();
}

pub fn set_diet_type(profile: &mut UserProfile, diet: DietType) {
    profile.diet_type = diet;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            current_weight: 92.0,
            goal_weight: 80.0,
            height: 182.0,
            birth_year: 1995,
            birth_month: 11,
            birth_day: 3,
            sex: Sex::Female,
            activity: ActivityLevel::Medium,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 9).unwrap()
    }

    #[test]
    fn registration_builds_profile() {
        let profile = form().into_profile(today()).unwrap();
        assert_eq!(profile.age, 29);
        assert_eq!(profile.sex_offset, -161.0);
        assert_eq!(profile.activity_multiplier, 1.65);
        assert_eq!(profile.diet_type, DietType::Balanced);
        assert_eq!(profile.diet_value, -300);
        assert_eq!(profile.birth_date, NaiveDate::from_ymd_opt(1995, 11, 3));
        assert_eq!(profile.created_at, Some(today()));
    }

    #[test]
    fn registration_bounds() {
        let mut f = form();
        f.current_weight = 0.5;
        assert_eq!(f.validate(), Err(ValidationError::CurrentWeight(0.5)));

        let mut f = form();
        f.goal_weight = 1001.0;
        assert_eq!(f.validate(), Err(ValidationError::GoalWeight(1001.0)));

        let mut f = form();
        f.height = 29.9;
        assert_eq!(f.validate(), Err(ValidationError::Height(29.9)));

        let mut f = form();
        f.height = f64::NAN;
        assert!(matches!(f.validate(), Err(ValidationError::Height(_))));
    }

    #[test]
    fn registration_rejects_impossible_dates() {
        let mut f = form();
        f.birth_year = 1889;
        assert!(matches!(f.validate(), Err(ValidationError::BirthDate { .. })));

        let mut f = form();
        f.birth_month = 2;
        f.birth_day = 30;
        assert_eq!(
            f.validate(),
            Err(ValidationError::BirthDate {
                year: 1995,
                month: 2,
                day: 30,
            })
        );
    }

    #[test]
    fn goal_weight_change_recomputes_diet_value() {
        let mut profile = form().into_profile(today()).unwrap();
        set_goal_weight(&mut profile, 95.0).unwrap();
        assert_eq!(profile.diet_value, 300);
        set_goal_weight(&mut profile, 92.0).unwrap();
        assert_eq!(profile.diet_value, 0);
        assert!(set_goal_weight(&mut profile, 0.0).is_err());
        assert_eq!(profile.goal_weight, 92.0);
    }

    #[test]
    fn weight_bounds() {
        assert_eq!(validate_weight(70.5), Ok(70.5));
        assert_eq!(validate_weight(0.0), Err(ValidationError::Weight(0.0)));
    }
}

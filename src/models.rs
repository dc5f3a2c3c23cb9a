use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Format of the per-day document keys (`dailyLogs/{date}`, `weightLog/{date}`).
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Parse a user-typed number, treating anything unparseable as 0.
pub fn parse_amount(input: &str) -> f64 {
    input
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Constant term of the energy estimate.
    pub fn offset(self) -> f64 {
        match self {
            Sex::Male => 5.0,
            Sex::Female => -161.0,
        }
    }

    pub fn from_offset(offset: f64) -> Option<Self> {
        if offset == 5.0 {
            Some(Sex::Male)
        } else if offset == -161.0 {
            Some(Sex::Female)
        } else {
            None
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Male => "male",
            Sex::Female => "female",
        })
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "man" | "men" | "m" => Ok(Sex::Male),
            "female" | "woman" | "women" | "f" => Ok(Sex::Female),
            other => Err(format!("unknown sex: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 3] = [ActivityLevel::Low, ActivityLevel::Medium, ActivityLevel::High];

    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Low => 1.45,
            ActivityLevel::Medium => 1.65,
            ActivityLevel::High => 1.85,
        }
    }

    /// Stored multipliers may have gone through an f32, so compare loosely.
    pub fn from_multiplier(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.multiplier() - value).abs() < 1e-4)
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityLevel::Low => "Low",
            ActivityLevel::Medium => "Medium",
            ActivityLevel::High => "High",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown activity level: {s}"))
    }
}

/// Share of daily energy per macro. Always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

impl MacroSplit {
    pub fn total(&self) -> f64 {
        self.carbs + self.protein + self.fat
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietType {
    #[default]
    Balanced,
    HighProtein,
    Ketogenic,
    LowFat,
}

impl DietType {
    pub const ALL: [DietType; 4] = [
        DietType::Balanced,
        DietType::HighProtein,
        DietType::Ketogenic,
        DietType::LowFat,
    ];

    /// Name as stored in the profile document.
    pub fn name(self) -> &'static str {
        match self {
            DietType::Balanced => "Balanced Diet",
            DietType::HighProtein => "High-protein diet",
            DietType::Ketogenic => "Ketogenic diet",
            DietType::LowFat => "Low-fat diet",
        }
    }

    /// Unknown names resolve to `Balanced`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|diet| diet.name() == name)
            .unwrap_or_default()
    }

    pub fn split(self) -> MacroSplit {
        let (carbs, protein, fat) = match self {
            DietType::Balanced => (0.50, 0.20, 0.30),
            DietType::HighProtein => (0.40, 0.35, 0.25),
            DietType::Ketogenic => (0.10, 0.15, 0.75),
            DietType::LowFat => (0.65, 0.20, 0.15),
        };
        MacroSplit { carbs, protein, fat }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DietType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "balanced" => return Ok(DietType::Balanced),
            "high-protein" | "protein" => return Ok(DietType::HighProtein),
            "keto" | "ketogenic" => return Ok(DietType::Ketogenic),
            "low-fat" => return Ok(DietType::LowFat),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|diet| diet.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown diet type: {s}"))
    }
}

/// The user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Weight in kg
    pub current_weight: f64,
    /// Weight in kg
    pub goal_weight: f64,
    /// Height in cm
    pub height: f64,
    pub birth_date: Option<NaiveDate>,
    /// Age in whole years at registration
    pub age: i32,
    /// +5 for men, -161 for women
    pub sex_offset: f64,
    /// 1.45 / 1.65 / 1.85
    pub activity_multiplier: f64,
    pub diet_type: DietType,
    /// Signed kcal adjustment towards the goal weight
    pub diet_value: i32,
    /// Registration date, start of the weight history
    pub created_at: Option<NaiveDate>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            current_weight: 0.0,
            goal_weight: 0.0,
            height: 0.0,
            birth_date: None,
            age: 0,
            sex_offset: 0.0,
            activity_multiplier: 1.0,
            diet_type: DietType::Balanced,
            diet_value: 0,
            created_at: None,
        }
    }
}

/// Daily calorie and macro targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub kcal: i64,
    /// Grams
    pub carbs: i64,
    /// Grams
    pub protein: i64,
    /// Grams
    pub fat: i64,
}

/// Whole kcal and grams of one meal slot or one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub kcal: i64,
    pub carbs: i64,
    pub protein: i64,
    pub fat: i64,
}

/// Saturates at the `i64` bounds instead of overflowing.
impl Add for MacroTotals {
    type Output = MacroTotals;

    fn add(self, rhs: Self) -> Self::Output {
        MacroTotals {
            kcal: self.kcal.saturating_add(rhs.kcal),
            carbs: self.carbs.saturating_add(rhs.carbs),
            protein: self.protein.saturating_add(rhs.protein),
            fat: self.fat.saturating_add(rhs.fat),
        }
    }
}

impl AddAssign for MacroTotals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

pub type MealSlotSummary = MacroTotals;
pub type DailyConsumedTotals = MacroTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Snack,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Snack,
        MealSlot::Lunch,
        MealSlot::Dinner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Snack => "snack",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown meal slot: {s}"))
    }
}

/// A food search hit. Nutrient values are per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodProduct {
    pub name: String,
    pub kcal_per_100g: Option<f64>,
    pub protein_per_100g: Option<f64>,
    pub fat_per_100g: Option<f64>,
    pub carbs_per_100g: Option<f64>,
}

/// One product in a meal that is being put together. Values are for the
/// eaten portion, not per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub name: String,
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl MealEntry {
    /// Negative and non-finite values are clamped to 0.
    pub fn new(name: impl Into<String>, kcal: f64, protein: f64, fat: f64, carbs: f64) -> Self {
        let clamp = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            name: name.into(),
            kcal: clamp(kcal),
            protein: clamp(protein),
            fat: clamp(fat),
            carbs: clamp(carbs),
        }
    }

    /// Scale a search result to a portion. Returns `None` unless `grams` is positive.
    pub fn from_product(product: &FoodProduct, grams: f64) -> Option<Self> {
        if !grams.is_finite() || grams <= 0.0 {
            return None;
        }
        let scale = grams / 100.0;
        let scaled = |v: Option<f64>| v.unwrap_or(0.0) * scale;
        Some(Self::new(
            product.name.clone(),
            scaled(product.kcal_per_100g),
            scaled(product.protein_per_100g),
            scaled(product.fat_per_100g),
            scaled(product.carbs_per_100g),
        ))
    }

    /// A hand-typed entry. Inputs that don't parse count as 0, and a blank
    /// name falls back to the search query that found nothing.
    pub fn manual(name: &str, query: &str, kcal: &str, protein: &str, fat: &str, carbs: &str) -> Self {
        let name = if name.trim().is_empty() {
            format!("{} (manual)", query.trim())
        } else {
            name.trim().to_string()
        };
        Self::new(
            name,
            parse_amount(kcal),
            parse_amount(protein),
            parse_amount(fat),
            parse_amount(carbs),
        )
    }
}

/// A weight measurement for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightLogEntry {
    pub date: NaiveDate,
    /// Weight in kg
    pub weight: f64,
}

/// Goal and consumption stored for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    pub goal: Option<DailyGoal>,
    pub consumed: DailyConsumedTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diet_splits_sum_to_one() {
        for diet in DietType::ALL {
            assert!((diet.split().total() - 1.0).abs() < 1e-9, "{diet}");
        }
    }

    #[test]
    fn unknown_diet_name_is_balanced() {
        assert_eq!(DietType::from_name("Paleo"), DietType::Balanced);
        assert_eq!(DietType::from_name(""), DietType::Balanced);
        assert_eq!(DietType::from_name("Ketogenic diet"), DietType::Ketogenic);
    }

    #[test]
    fn diet_type_parses_short_names() {
        assert_eq!("keto".parse::<DietType>(), Ok(DietType::Ketogenic));
        assert_eq!("Low-fat diet".parse::<DietType>(), Ok(DietType::LowFat));
        assert!("carnivore".parse::<DietType>().is_err());
    }

    #[test]
    fn activity_multiplier_survives_float_storage() {
        assert_eq!(
            ActivityLevel::from_multiplier(1.65_f32 as f64),
            Some(ActivityLevel::Medium)
        );
        assert_eq!(ActivityLevel::from_multiplier(2.0), None);
    }

    #[test]
    fn sex_offsets() {
        assert_eq!(Sex::Male.offset(), 5.0);
        assert_eq!(Sex::Female.offset(), -161.0);
        assert_eq!(Sex::from_offset(-161.0), Some(Sex::Female));
        assert_eq!(Sex::from_offset(0.0), None);
        assert_eq!(Sex::Male.to_string(), "male");
        assert_eq!("Woman".parse::<Sex>(), Ok(Sex::Female));
    }

    #[test]
    fn date_keys() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 9).unwrap();
        assert_eq!(date_key(date), "2025-02-09");
        assert_eq!(parse_date_key("2025-02-09"), Some(date));
        assert_eq!(parse_date_key("summary"), None);
    }

    #[test]
    fn lenient_amounts() {
        assert_eq!(parse_amount(" 12.5 "), 12.5);
        assert_eq!(parse_amount("3,5"), 3.5);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
    }

    #[test]
    fn product_scales_by_portion() {
        let product = FoodProduct {
            name: "Oats".to_string(),
            kcal_per_100g: Some(380.0),
            protein_per_100g: Some(13.0),
            fat_per_100g: None,
            carbs_per_100g: Some(60.0),
        };
        let entry = MealEntry::from_product(&product, 50.0).unwrap();
        assert_eq!(entry.name, "Oats");
        assert_eq!(entry.kcal, 190.0);
        assert_eq!(entry.protein, 6.5);
        assert_eq!(entry.fat, 0.0);
        assert_eq!(entry.carbs, 30.0);

        assert!(MealEntry::from_product(&product, 0.0).is_none());
        assert!(MealEntry::from_product(&product, -10.0).is_none());
    }

    #[test]
    fn manual_entry_defaults() {
        let entry = MealEntry::manual("  ", "grandma soup", "250", "x", "-4", "");
        assert_eq!(entry.name, "grandma soup (manual)");
        assert_eq!(entry.kcal, 250.0);
        assert_eq!(entry.protein, 0.0);
        assert_eq!(entry.fat, 0.0);
        assert_eq!(entry.carbs, 0.0);
    }

    #[test]
    fn meal_slots_round_trip_names() {
        for slot in MealSlot::ALL {
            assert_eq!(slot.as_str().parse::<MealSlot>(), Ok(slot));
        }
        assert!("brunch".parse::<MealSlot>().is_err());
    }
}

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::goals::diet_value_for;
use crate::models::WeightLogEntry;

/// Weight change since the first logged day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "kg", rename_all = "snake_case")]
pub enum WeightProgress {
    Lost(f64),
    Gained(f64),
    Unchanged,
    NotAvailable,
}

impl fmt::Display for WeightProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightProgress::Lost(kg) => write!(f, "lost {kg:.1} kg"),
            WeightProgress::Gained(kg) => write!(f, "gained {kg:.1} kg"),
            WeightProgress::Unchanged => f.write_str("unchanged"),
            WeightProgress::NotAvailable => f.write_str("not available"),
        }
    }
}

/// Compare the earliest logged weight with the current one.
pub fn evaluate_progress(history: &[WeightLogEntry], current_weight: f64) -> WeightProgress {
    let Some(first) = history.iter().min_by_key(|e| e.date) else {
        return WeightProgress::NotAvailable;
    };
    let start = first.weight;
    if start == 0.0 || !start.is_finite() {
        return WeightProgress::NotAvailable;
    }

    if start > current_weight {
        WeightProgress::Lost(start - current_weight)
    } else if start < current_weight {
        WeightProgress::Gained(current_weight - start)
    } else {
        WeightProgress::Unchanged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    NormalWeight,
    Overweight,
    Obesity,
}

impl BmiCategory {
    pub fn classify(bmi: f64) -> Self {
        if bmi > 30.0 {
            BmiCategory::Obesity
        } else if bmi > 25.0 {
            BmiCategory::Overweight
        } else if bmi > 18.5 {
            BmiCategory::NormalWeight
        } else {
            BmiCategory::Underweight
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::NormalWeight => "Normal weight",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obesity => "Obesity",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bmi {
    pub value: f64,
    pub category: BmiCategory,
}

impl fmt::Display for Bmi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ({})", self.value, self.category)
    }
}

/// BMI from kg and cm. `None` when the height is unknown.
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> Option<Bmi> {
    if !height_cm.is_finite() || height_cm <= 0.0 {
        return None;
    }
    let value = weight_kg * 10000.0 / (height_cm * height_cm);
    Some(Bmi {
        value,
        category: BmiCategory::classify(value),
    })
}

/// Outcome of logging a new weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightUpdate {
    pub weight: f64,
    pub diet_value: i32,
    pub goal_achieved: bool,
}

pub fn apply_weight_update(new_weight: f64, goal_weight: f64) -> WeightUpdate {
    WeightUpdate {
        weight: new_weight,
        diet_value: diet_value_for(new_weight, goal_weight),
        goal_achieved: new_weight == goal_weight,
    }
}

/// Where a newly logged weight lands in the existing log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightLogPlacement {
    /// On or after the latest logged day: the weight becomes the profile's
    /// current weight.
    Latest,
    /// Earlier than an existing entry: only the history changes.
    Backfill,
}

/// Weights can be logged from registration up to `today`.
pub fn place_weight_log(
    date: NaiveDate,
    today: NaiveDate,
    registered: Option<NaiveDate>,
    latest_logged: Option<NaiveDate>,
) -> Result<WeightLogPlacement, ValidationError> {
    if date > today || registered.is_some_and(|start| date < start) {
        return Err(ValidationError::WeightDate(date));
    }
    match latest_logged {
        Some(latest) if date < latest => Ok(WeightLogPlacement::Backfill),
        _ => Ok(WeightLogPlacement::Latest),
    }
}

/// Whether a missing entry for `date` may be written from the current
/// weight. Only the real current day qualifies, never one before
/// registration.
pub fn should_seed_weight(date: NaiveDate, today: NaiveDate, registered: Option<NaiveDate>) -> bool {
    date == today && registered.map_or(true, |start| date >= start)
}

/// Expand sparse weight logs to one point per day from `start` to `end`
/// inclusive, carrying the last known weight over days without a log.
///
/// If `start` itself has no log it takes `seed_weight`, which callers pass as
/// the profile's current weight. That is the weight at fetch time rather than
/// on the first day.
pub fn forward_fill_history(
    sparse: &BTreeMap<NaiveDate, f64>,
    start: NaiveDate,
    end: NaiveDate,
    seed_weight: f64,
) -> Vec<WeightLogEntry> {
    let mut last = sparse.get(&start).copied().unwrap_or(seed_weight);
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            if let Some(weight) = sparse.get(&date) {
                last = *weight;
            }
            WeightLogEntry { date, weight: last }
        })
        .collect()
}

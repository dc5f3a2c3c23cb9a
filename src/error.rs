/// Rejected user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid current weight: {0} kg (expected 1-1000)")]
    CurrentWeight(f64),

    #[error("Invalid goal weight: {0} kg (expected 1-1000)")]
    GoalWeight(f64),

    #[error("Invalid height: {0} cm (expected 30-300)")]
    Height(f64),

    #[error("Invalid birth date: {year}-{month}-{day}")]
    BirthDate { year: i32, month: u32, day: u32 },

    #[error("Invalid weight: {0} kg (expected 1-1000)")]
    Weight(f64),

    #[error("Cannot log weight for {0}: before registration or in the future")]
    WeightDate(chrono::NaiveDate),

    #[error("Invalid portion weight: {0} g")]
    PortionWeight(f64),

    #[error("Add product before saving")]
    EmptyMeal,
}

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::consumption::DayMeals;
use crate::firestore::{number_field, string_field, to_firestore_fields, FirestoreClient};
use crate::models::{
    date_key, parse_date_key, DailyConsumedTotals, DailyGoal, DailyLog, DietType, MacroTotals,
    MealSlot, MealSlotSummary, UserProfile,
};

const GOAL_FIELDS: [&str; 4] = ["kcal", "carbs", "protein", "fat"];
const CONSUMED_FIELDS: [&str; 4] = ["consumedKcal", "consumedCarbs", "consumedProtein", "consumedFat"];
const SUMMARY_FIELDS: [&str; 4] = ["kcal", "carbs", "protein", "fat"];

/// Per-user documents in Firestore:
///
/// - `users/{uid}`: the profile
/// - `users/{uid}/dailyLogs/{date}`: goal and consumed totals
/// - `users/{uid}/dailyLogs/{date}/{slot}/summary`: one meal slot
/// - `users/{uid}/weightLog/{date}`: `weight`
#[derive(Clone)]
pub struct ProfileStore {
    firestore: FirestoreClient,
}

fn user_path(uid: &str) -> String {
    format!("users/{}", uid)
}

fn daily_log_path(uid: &str, date: NaiveDate) -> String {
    format!("users/{}/dailyLogs/{}", uid, date_key(date))
}

fn slot_summary_path(uid: &str, date: NaiveDate, slot: MealSlot) -> String {
    format!("{}/{}/summary", daily_log_path(uid, date), slot)
}

fn weight_log_path(uid: &str) -> String {
    format!("users/{}/weightLog", uid)
}

impl ProfileStore {
    pub fn new(firestore: FirestoreClient) -> Self {
        Self { firestore }
    }

    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let doc = self.firestore.get_document(&user_path(uid)).await?;
        Ok(doc.map(|d| profile_from_data(&d.data())))
    }

    /// Write the whole profile document.
    pub async fn save_profile(&self, uid: &str, profile: &UserProfile) -> Result<()> {
        let fields = to_firestore_fields(&profile_to_data(profile));
        self.firestore
            .patch_document(&user_path(uid), fields, &[])
            .await?;
        Ok(())
    }

    /// Overwrite only the given profile fields.
    pub async fn update_profile_fields(&self, uid: &str, data: Map<String, Value>) -> Result<()> {
        let mask: Vec<&str> = data.keys().map(String::as_str).collect();
        self.firestore
            .patch_document(&user_path(uid), to_firestore_fields(&data), &mask)
            .await?;
        Ok(())
    }

    pub async fn save_daily_goal(&self, uid: &str, date: NaiveDate, goal: &DailyGoal) -> Result<()> {
        let totals = MacroTotals {
            kcal: goal.kcal,
            carbs: goal.carbs,
            protein: goal.protein,
            fat: goal.fat,
        };
        self.merge_totals(&daily_log_path(uid, date), &totals, GOAL_FIELDS)
            .await
    }

    pub async fn save_consumed(
        &self,
        uid: &str,
        date: NaiveDate,
        consumed: &DailyConsumedTotals,
    ) -> Result<()> {
        self.merge_totals(&daily_log_path(uid, date), consumed, CONSUMED_FIELDS)
            .await
    }

    /// Goal and consumption for a day; a day never opened reads as empty.
    pub async fn get_daily_log(&self, uid: &str, date: NaiveDate) -> Result<DailyLog> {
        let Some(doc) = self.firestore.get_document(&daily_log_path(uid, date)).await? else {
            return Ok(DailyLog::default());
        };
        let data = doc.data();

        let goal = number_field(&data, "kcal").map(|_| {
            let t = totals_from_data(&data, GOAL_FIELDS);
            DailyGoal {
                kcal: t.kcal,
                carbs: t.carbs,
                protein: t.protein,
                fat: t.fat,
            }
        });

        Ok(DailyLog {
            goal,
            consumed: totals_from_data(&data, CONSUMED_FIELDS),
        })
    }

    pub async fn get_slot_summary(
        &self,
        uid: &str,
        date: NaiveDate,
        slot: MealSlot,
    ) -> Result<Option<MealSlotSummary>> {
        let doc = self
            .firestore
            .get_document(&slot_summary_path(uid, date, slot))
            .await?;
        Ok(doc.map(|d| totals_from_data(&d.data(), SUMMARY_FIELDS)))
    }

    /// All saved slots of a day.
    pub async fn get_day_meals(&self, uid: &str, date: NaiveDate) -> Result<DayMeals> {
        let mut meals = DayMeals::new();
        for slot in MealSlot::ALL {
            if let Some(summary) = self.get_slot_summary(uid, date, slot).await? {
                meals.set(slot, summary);
            }
        }
        Ok(meals)
    }

    pub async fn set_slot_summary(
        &self,
        uid: &str,
        date: NaiveDate,
        slot: MealSlot,
        summary: &MealSlotSummary,
    ) -> Result<()> {
        let data = totals_to_data(summary, SUMMARY_FIELDS);
        self.firestore
            .patch_document(&slot_summary_path(uid, date, slot), to_firestore_fields(&data), &[])
            .await?;
        Ok(())
    }

    /// Add `delta` server-side onto an existing slot summary.
    pub async fn increment_slot_summary(
        &self,
        uid: &str,
        date: NaiveDate,
        slot: MealSlot,
        delta: &MealSlotSummary,
    ) -> Result<()> {
        let values = [delta.kcal, delta.carbs, delta.protein, delta.fat];
        let deltas: Vec<(&str, i64)> = SUMMARY_FIELDS.into_iter().zip(values).collect();
        self.firestore
            .increment_fields(&slot_summary_path(uid, date, slot), &deltas)
            .await
    }

    pub async fn delete_slot_summary(&self, uid: &str, date: NaiveDate, slot: MealSlot) -> Result<()> {
        self.firestore
            .delete_document(&slot_summary_path(uid, date, slot))
            .await
    }

    /// Logged weights by date. Entries without a `weight` read as `missing_weight`.
    pub async fn get_weight_log(
        &self,
        uid: &str,
        missing_weight: f64,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        let docs = self.firestore.list_all_documents(&weight_log_path(uid)).await?;
        let mut log = BTreeMap::new();

        for doc in &docs {
            let Some(date) = parse_date_key(doc.id()) else {
                warn!(id = doc.id(), "Skipping weight log entry with a non-date ID");
                continue;
            };
            let weight = number_field(&doc.data(), "weight").unwrap_or(missing_weight);
            log.insert(date, weight);
        }

        debug!(uid, entries = log.len(), "Loaded weight log");
        Ok(log)
    }

    pub async fn get_weight_entry(&self, uid: &str, date: NaiveDate) -> Result<Option<f64>> {
        let path = format!("{}/{}", weight_log_path(uid), date_key(date));
        let doc = self.firestore.get_document(&path).await?;
        Ok(doc.and_then(|d| number_field(&d.data(), "weight")))
    }

    pub async fn save_weight_entry(&self, uid: &str, date: NaiveDate, weight: f64) -> Result<()> {
        let path = format!("{}/{}", weight_log_path(uid), date_key(date));
        let data = json_object(json!({ "weight": weight }));
        self.firestore
            .patch_document(&path, to_firestore_fields(&data), &[])
            .await?;
        Ok(())
    }

    async fn merge_totals(&self, path: &str, totals: &MacroTotals, names: [&str; 4]) -> Result<()> {
        let data = totals_to_data(totals, names);
        self.firestore
            .patch_document(path, to_firestore_fields(&data), &names)
            .await?;
        Ok(())
    }
}

fn json_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn totals_to_data(totals: &MacroTotals, names: [&str; 4]) -> Map<String, Value> {
    let values = [totals.kcal, totals.carbs, totals.protein, totals.fat];
    names
        .into_iter()
        .zip(values)
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect()
}

/// Missing or malformed numbers read as 0.
fn totals_from_data(data: &Value, names: [&str; 4]) -> MacroTotals {
    let get = |name: &str| number_field(data, name).map(|v| v as i64).unwrap_or(0);
    MacroTotals {
        kcal: get(names[0]),
        carbs: get(names[1]),
        protein: get(names[2]),
        fat: get(names[3]),
    }
}

pub(crate) fn profile_to_data(profile: &UserProfile) -> Map<String, Value> {
    let mut data = json_object(json!({
        "currentWeight": profile.current_weight,
        "goalWeight": profile.goal_weight,
        "height": profile.height,
        "age": profile.age,
        "genderValue": profile.sex_offset,
        "activityValue": profile.activity_multiplier,
        "dietType": profile.diet_type.name(),
        "dietValue": profile.diet_value,
    }));
    if let Some(birth_date) = profile.birth_date {
        data.insert("birthDate".to_string(), json!(date_key(birth_date)));
    }
    if let Some(created_at) = profile.created_at {
        data.insert("createdAt".to_string(), json!(date_key(created_at)));
    }
    data
}

/// Missing numbers default to 0, except the activity multiplier which
/// defaults to 1.0.
pub(crate) fn profile_from_data(data: &Value) -> UserProfile {
    let num = |key: &str| number_field(data, key).unwrap_or(0.0);
    let date = |key: &str| string_field(data, key).and_then(|s| parse_date_key(&s));

    UserProfile {
        current_weight: num("currentWeight"),
        goal_weight: num("goalWeight"),
        height: num("height"),
        birth_date: date("birthDate"),
        age: num("age") as i32,
        sex_offset: num("genderValue"),
        activity_multiplier: number_field(data, "activityValue").unwrap_or(1.0),
        diet_type: DietType::from_name(&string_field(data, "dietType").unwrap_or_default()),
        diet_value: num("dietValue").round() as i32,
        created_at: date("createdAt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_paths() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 9).unwrap();
        assert_eq!(user_path("u1"), "users/u1");
        assert_eq!(daily_log_path("u1", date), "users/u1/dailyLogs/2025-02-09");
        assert_eq!(
            slot_summary_path("u1", date, MealSlot::Snack),
            "users/u1/dailyLogs/2025-02-09/snack/summary"
        );
        assert_eq!(weight_log_path("u1"), "users/u1/weightLog");
    }

    #[test]
    fn profile_round_trips_through_document_data() {
        let profile = UserProfile {
            current_weight: 82.5,
            goal_weight: 75.0,
            height: 180.0,
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 15),
            age: 34,
            sex_offset: 5.0,
            activity_multiplier: 1.85,
            diet_type: DietType::LowFat,
            diet_value: -300,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 2),
        };
        let data = Value::Object(profile_to_data(&profile));
        assert_eq!(data["dietType"], json!("Low-fat diet"));
        assert_eq!(data["birthDate"], json!("1990-06-15"));
        assert_eq!(profile_from_data(&data), profile);
    }

    #[test]
    fn sparse_profile_defaults() {
        let profile = profile_from_data(&json!({"currentWeight": 70, "dietType": "Vegan"}));
        assert_eq!(profile.current_weight, 70.0);
        assert_eq!(profile.height, 0.0);
        assert_eq!(profile.activity_multiplier, 1.0);
        assert_eq!(profile.diet_type, DietType::Balanced);
        assert_eq!(profile.birth_date, None);
    }

    #[test]
    fn totals_fields() {
        let totals = MacroTotals {
            kcal: 2100,
            carbs: 250,
            protein: 120,
            fat: 70,
        };
        let data = Value::Object(totals_to_data(&totals, CONSUMED_FIELDS));
        assert_eq!(data["consumedKcal"], json!(2100));
        assert_eq!(data["consumedFat"], json!(70));
        assert_eq!(totals_from_data(&data, CONSUMED_FIELDS), totals);
        assert_eq!(totals_from_data(&data, GOAL_FIELDS), MacroTotals::default());
    }
}

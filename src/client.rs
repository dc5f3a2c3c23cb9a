use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::auth::FirebaseAuth;
use crate::calendar::{month_days, DayOverview};
use crate::config::Config;
use crate::consumption::{merge_meal_slot, sum_entries, DayMeals};
use crate::error::ValidationError;
use crate::firestore::FirestoreClient;
use crate::food_search::FoodSearchClient;
use crate::goals::compute_goal;
use crate::models::*;
use crate::profile::{self, RegistrationForm};
use crate::progress::{
    apply_weight_update, compute_bmi, evaluate_progress, forward_fill_history, place_weight_log,
    should_seed_weight, Bmi, WeightLogPlacement, WeightProgress, WeightUpdate,
};
use crate::store::ProfileStore;

/// Everything the home screen shows for one day.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub goal: DailyGoal,
    pub meals: DayMeals,
    pub consumed: DailyConsumedTotals,
}

/// Profile page figures.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub profile: UserProfile,
    pub progress: WeightProgress,
    pub bmi: Option<Bmi>,
}

#[derive(Clone)]
pub struct EatWiseClient {
    pub auth: FirebaseAuth,
    pub store: ProfileStore,
    pub food: FoodSearchClient,
    user_id: Option<String>,
}

impl EatWiseClient {
    fn with_auth(config: &Config, auth: FirebaseAuth) -> Self {
        let firestore = FirestoreClient::new(auth.clone(), config.firebase_project_id.clone());
        Self {
            auth,
            store: ProfileStore::new(firestore),
            food: FoodSearchClient::new(config),
            user_id: None,
        }
    }

    pub fn new(config: &Config, refresh_token: String) -> Self {
        Self::with_auth(config, FirebaseAuth::new(config, refresh_token))
    }

    /// Sign in with email and password.
    pub async fn login(config: &Config, email: &str, password: &str) -> Result<Self> {
        let auth = FirebaseAuth::sign_in_with_email(config, email, password).await?;
        Ok(Self::with_auth(config, auth))
    }

    /// Create an account and its profile.
    ///
    /// The form is validated before the account is created, so a bad form
    /// never leaves an account without a profile behind.
    pub async fn register(
        config: &Config,
        email: &str,
        password: &str,
        form: RegistrationForm,
        today: NaiveDate,
    ) -> Result<(Self, UserProfile)> {
        let profile = form.into_profile(today)?;
        let auth = FirebaseAuth::sign_up_with_email(config, email, password).await?;
        let mut client = Self::with_auth(config, auth);

        let uid = client.get_user_id().await?;
        client.store.save_profile(&uid, &profile).await?;
        client
            .store
            .save_weight_entry(&uid, today, profile.current_weight)
            .await?;
        info!(%uid, "Registered new user");

        Ok((client, profile))
    }

    pub async fn get_user_id(&mut self) -> Result<String> {
        if let Some(ref uid) = self.user_id {
            return Ok(uid.clone());
        }
        let uid = self.auth.get_user_id().await?;
        self.user_id = Some(uid.clone());
        Ok(uid)
    }

    pub async fn get_profile(&mut self) -> Result<UserProfile> {
        let uid = self.get_user_id().await?;
        self.store
            .get_profile(&uid)
            .await?
            .ok_or_else(|| anyhow!("No profile for user {}", uid))
    }

    /// Recompute the day's goal from the current profile, re-add the saved
    /// meal slots, and write both back to the daily log.
    pub async fn refresh_day(&mut self, date: NaiveDate) -> Result<DaySummary> {
        let uid = self.get_user_id().await?;
        let profile = self.get_profile().await?;

        let goal = compute_goal(&profile);
        self.store.save_daily_goal(&uid, date, &goal).await?;

        let meals = self.store.get_day_meals(&uid, date).await?;
        let consumed = meals.totals();
        self.store.save_consumed(&uid, date, &consumed).await?;

        Ok(DaySummary {
            date,
            goal,
            meals,
            consumed,
        })
    }

    pub async fn search_foods(&self, query: &str) -> Result<Vec<FoodProduct>> {
        self.food.search(query).await
    }

    /// Save a round of entries to a meal slot, adding to what is already there.
    /// Returns the slot's new summary.
    pub async fn save_meal(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        entries: &[MealEntry],
    ) -> Result<MealSlotSummary> {
        if entries.is_empty() {
            return Err(ValidationError::EmptyMeal.into());
        }
        let uid = self.get_user_id().await?;

        let existing = self.store.get_slot_summary(&uid, date, slot).await?;
        let merged = merge_meal_slot(existing.as_ref(), entries);
        match existing {
            Some(_) => {
                let delta = sum_entries(entries);
                self.store
                    .increment_slot_summary(&uid, date, slot, &delta)
                    .await?;
            }
            None => {
                self.store
                    .set_slot_summary(&uid, date, slot, &merged)
                    .await?;
            }
        }
        info!(%uid, %date, %slot, kcal = merged.kcal, "Saved meal");

        self.update_consumed(&uid, date).await?;
        Ok(merged)
    }

    /// Remove a slot for the day and return the day's new totals.
    pub async fn delete_meal(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
    ) -> Result<DailyConsumedTotals> {
        let uid = self.get_user_id().await?;
        self.store.delete_slot_summary(&uid, date, slot).await?;
        info!(%uid, %date, %slot, "Deleted meal");
        self.update_consumed(&uid, date).await
    }

    async fn update_consumed(&self, uid: &str, date: NaiveDate) -> Result<DailyConsumedTotals> {
        let meals = self.store.get_day_meals(uid, date).await?;
        let consumed = meals.totals();
        self.store.save_consumed(uid, date, &consumed).await?;
        Ok(consumed)
    }

    /// Record a weight for `date`.
    ///
    /// A weight on or after the latest logged day becomes the current weight
    /// and re-aims the diet value at the goal; the update is returned. An
    /// earlier date only fills in history and returns `None`.
    pub async fn log_weight(&mut self, date: NaiveDate, weight: f64) -> Result<Option<WeightUpdate>> {
        let weight = profile::validate_weight(weight)?;
        let uid = self.get_user_id().await?;
        let profile = self.get_profile().await?;

        let log = self.store.get_weight_log(&uid, profile.current_weight).await?;
        let today = Local::now().date_naive();
        let placement =
            place_weight_log(date, today, profile.created_at, log.keys().next_back().copied())?;

        self.store.save_weight_entry(&uid, date, weight).await?;
        if placement == WeightLogPlacement::Backfill {
            info!(%uid, %date, weight, "Backfilled weight");
            return Ok(None);
        }

        let update = apply_weight_update(weight, profile.goal_weight);
        let mut fields = Map::new();
        fields.insert("currentWeight".to_string(), json!(update.weight));
        fields.insert("dietValue".to_string(), json!(update.diet_value));
        self.store.update_profile_fields(&uid, fields).await?;

        info!(%uid, %date, weight, diet_value = update.diet_value, "Logged weight");
        if update.goal_achieved {
            info!(%uid, goal_weight = profile.goal_weight, "Goal weight achieved");
        }
        Ok(Some(update))
    }

    /// One weight per day from registration to `end`, capped at today.
    ///
    /// Today's entry is created from the current weight if missing, and the
    /// registration day falls back to the current weight as well.
    pub async fn weight_history(&mut self, end: NaiveDate) -> Result<Vec<WeightLogEntry>> {
        let uid = self.get_user_id().await?;
        let profile = self.get_profile().await?;
        let today = Local::now().date_naive();
        let end = end.min(today);

        if should_seed_weight(end, today, profile.created_at)
            && self.store.get_weight_entry(&uid, end).await?.is_none()
        {
            self.store
                .save_weight_entry(&uid, end, profile.current_weight)
                .await?;
        }

        let log = self.store.get_weight_log(&uid, profile.current_weight).await?;
        let start = match profile.created_at {
            Some(date) => date,
            None => {
                warn!(%uid, "Profile has no registration date, starting history at first log");
                log.keys().next().copied().unwrap_or(end)
            }
        };

        Ok(forward_fill_history(&log, start, end, profile.current_weight))
    }

    /// Weight change since the first logged weight, and BMI.
    pub async fn profile_report(&mut self) -> Result<ProfileReport> {
        let uid = self.get_user_id().await?;
        let profile = self.get_profile().await?;

        let history: Vec<WeightLogEntry> = self
            .store
            .get_weight_log(&uid, 0.0)
            .await?
            .into_iter()
            .map(|(date, weight)| WeightLogEntry { date, weight })
            .collect();

        Ok(ProfileReport {
            progress: evaluate_progress(&history, profile.current_weight),
            bmi: compute_bmi(profile.current_weight, profile.height),
            profile,
        })
    }

    pub async fn set_diet_type(&mut self, diet: DietType) -> Result<UserProfile> {
        let mut profile = self.get_profile().await?;
        profile::set_diet_type(&mut profile, diet);
        self.update_profile(&profile, &["dietType"]).await?;
        Ok(profile)
    }

    pub async fn set_goal_weight(&mut self, goal_weight: f64) -> Result<UserProfile> {
        let mut profile = self.get_profile().await?;
        profile::set_goal_weight(&mut profile, goal_weight)?;
        self.update_profile(&profile, &["goalWeight", "dietValue"]).await?;
        Ok(profile)
    }

    pub async fn set_activity_level(&mut self, level: ActivityLevel) -> Result<UserProfile> {
        let mut profile = self.get_profile().await?;
        profile::set_activity_level(&mut profile, level);
        self.update_profile(&profile, &["activityValue"]).await?;
        Ok(profile)
    }

    async fn update_profile(&mut self, profile: &UserProfile, keys: &[&str]) -> Result<()> {
        let uid = self.get_user_id().await?;
        let data = crate::store::profile_to_data(profile);
        let fields: Map<String, Value> = data
            .into_iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .collect();
        self.store.update_profile_fields(&uid, fields).await
    }

    pub async fn day_overview(&mut self, date: NaiveDate) -> Result<DayOverview> {
        let uid = self.get_user_id().await?;
        let log = self.store.get_daily_log(&uid, date).await?;
        Ok(DayOverview::new(date, log))
    }

    /// Overview of every day in a month, in date order.
    pub async fn month_overview(&mut self, year: i32, month: u32) -> Result<Vec<DayOverview>> {
        let days = month_days(year, month);
        if days.is_empty() {
            return Err(anyhow!("Invalid month: {}-{}", year, month));
        }
        let mut overview = Vec::with_capacity(days.len());
        for date in days {
            overview.push(self.day_overview(date).await?);
        }
        Ok(overview)
    }
}

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{
    ACTIVITY_CALORIES_TABLE, ActivityRate, DEFAULT_KCAL_PER_MINUTE, EXERCISE_LOGS_TABLE,
    ExerciseEntry, ExercisePatch, NewExercise, calories_for, validate_exercise,
};
use crate::store::{Filter, TableStore, from_row, from_rows, to_row};

/// Exercise log operations over the `exercise_logs` and `activity_calories`
/// tables. Every call is scoped to an owner id.
#[derive(Clone)]
pub struct ExerciseRepository {
    store: Arc<dyn TableStore>,
}

impl ExerciseRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn load_all(&self, owner: &str) -> Result<Vec<ExerciseEntry>> {
        let rows = self
            .store
            .select(EXERCISE_LOGS_TABLE, &[Filter::eq("user_id", owner)])
            .await?;
        from_rows(rows)
    }

    /// Current rate for an activity, or the default when the table has none.
    pub async fn rate_for(&self, activity_type: &str) -> Result<i32> {
        let rows = self
            .store
            .select(
                ACTIVITY_CALORIES_TABLE,
                &[Filter::eq("activity_type", activity_type)],
            )
            .await?;
        let rates: Vec<ActivityRate> = from_rows(rows)?;
        Ok(rates
            .first()
            .map_or(DEFAULT_KCAL_PER_MINUTE, |r| r.kcal_per_minute))
    }

    pub async fn rates(&self) -> Result<Vec<ActivityRate>> {
        from_rows(self.store.select(ACTIVITY_CALORIES_TABLE, &[]).await?)
    }

    pub async fn set_rate(&self, activity_type: &str, kcal_per_minute: i32) -> Result<ActivityRate> {
        if activity_type.trim().is_empty() {
            return Err(Error::validation("Activity type must not be empty"));
        }
        if kcal_per_minute < 0 {
            return Err(Error::validation(format!(
                "Rate must be non-negative (got {kcal_per_minute})"
            )));
        }
        let row = to_row(&ActivityRate {
            activity_type: activity_type.trim().to_string(),
            kcal_per_minute,
        })?;
        let stored = self
            .store
            .upsert(ACTIVITY_CALORIES_TABLE, row, &["activity_type"])
            .await?;
        from_row(stored)
    }

    /// Log an exercise. Calories come from the rate table at this moment.
    ///
    /// The rate lookup and the insert are separate round trips.
    pub async fn add(
        &self,
        owner: &str,
        activity_type: &str,
        duration_minutes: i32,
        display_time: &str,
    ) -> Result<ExerciseEntry> {
        validate_exercise(activity_type, duration_minutes)?;
        let activity_type = activity_type.trim();
        let rate = self.rate_for(activity_type).await?;

        let row = to_row(&NewExercise {
            user_id: owner.to_string(),
            activity_type: activity_type.to_string(),
            duration_min: duration_minutes,
            calories: calories_for(duration_minutes, rate),
            time_display: display_time.to_string(),
        })?;
        let entry: ExerciseEntry = from_row(self.store.insert(EXERCISE_LOGS_TABLE, row).await?)?;
        tracing::info!(id = entry.id, calories = entry.calories, "exercise logged");
        Ok(entry)
    }

    /// Rewrite an entry, recomputing calories from the current rate table.
    /// `entry.calories` is ignored. Returns `None` when no row matched.
    pub async fn update(&self, owner: &str, entry: &ExerciseEntry) -> Result<Option<ExerciseEntry>> {
        validate_exercise(&entry.activity_type, entry.duration_minutes)?;
        let activity_type = entry.activity_type.trim();
        let rate = self.rate_for(activity_type).await?;

        let patch = to_row(&ExercisePatch {
            activity_type: activity_type.to_string(),
            duration_min: entry.duration_minutes,
            calories: calories_for(entry.duration_minutes, rate),
            time_display: entry.display_time.clone(),
        })?;
        let rows = self
            .store
            .update(
                EXERCISE_LOGS_TABLE,
                patch,
                &[Filter::eq("id", entry.id), Filter::eq("user_id", owner)],
            )
            .await?;
        let updated: Vec<ExerciseEntry> = from_rows(rows)?;
        Ok(updated.into_iter().next())
    }

    /// Returns whether a row was removed. Deleting a missing entry is not an error.
    pub async fn delete(&self, owner: &str, id: i64) -> Result<bool> {
        let rows = self
            .store
            .delete(
                EXERCISE_LOGS_TABLE,
                &[Filter::eq("id", id), Filter::eq("user_id", owner)],
            )
            .await?;
        if !rows.is_empty() {
            tracing::info!(id, "exercise deleted");
        }
        Ok(!rows.is_empty())
    }
}

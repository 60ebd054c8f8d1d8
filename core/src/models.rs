use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const EXERCISE_LOGS_TABLE: &str = "exercise_logs";
pub const ACTIVITY_CALORIES_TABLE: &str = "activity_calories";
pub const MEALS_TABLE: &str = "nutrition_meals";
pub const FOODS_TABLE: &str = "nutrition_foods";

/// Rate applied when an activity has no row in the rate table.
pub const DEFAULT_KCAL_PER_MINUTE: i32 = 5;

pub const DEFAULT_CALORIE_GOAL: i32 = 2181;

// --- Exercise ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub activity_type: String,
    #[serde(rename = "duration_min")]
    pub duration_minutes: i32,
    pub calories: i32,
    #[serde(rename = "time_display")]
    pub display_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewExercise {
    pub user_id: String,
    pub activity_type: String,
    pub duration_min: i32,
    pub calories: i32,
    pub time_display: String,
}

/// Columns rewritten on every exercise update. Calories are always the
/// recomputed value, never the caller's.
#[derive(Debug, Clone, Serialize)]
pub struct ExercisePatch {
    pub activity_type: String,
    pub duration_min: i32,
    pub calories: i32,
    pub time_display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRate {
    pub activity_type: String,
    #[serde(rename = "kcal_per_min")]
    pub kcal_per_minute: i32,
}

#[must_use]
pub fn calories_for(duration_minutes: i32, kcal_per_minute: i32) -> i32 {
    duration_minutes.saturating_mul(kcal_per_minute)
}

/// Sum of calorie values, saturating at `i32::MAX`.
#[must_use]
pub fn sum_calories(values: impl IntoIterator<Item = i32>) -> i32 {
    values.into_iter().fold(0, i32::saturating_add)
}

pub fn validate_exercise(activity_type: &str, duration_minutes: i32) -> Result<()> {
    if activity_type.trim().is_empty() {
        return Err(Error::validation("Activity type must not be empty"));
    }
    if duration_minutes <= 0 {
        return Err(Error::validation(format!(
            "Duration must be greater than 0 (got {duration_minutes})"
        )));
    }
    Ok(())
}

// --- Nutrition ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }

    /// Calories suggested for a meal that has nothing logged yet.
    #[must_use]
    pub fn recommended_calories(self) -> i32 {
        match self {
            MealType::Breakfast => 447,
            MealType::Lunch | MealType::Dinner | MealType::Snack => 547,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        MealType::ALL
            .into_iter()
            .find(|m| m.as_str().to_lowercase() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = MealType::ALL.iter().map(|m| m.as_str()).collect();
                Error::validation(format!(
                    "Invalid meal type '{s}'. Must be one of: {}",
                    names.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRow {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub date_label: String,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMeal {
    pub user_id: String,
    pub date_label: String,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: i64,
    pub meal_id: i64,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub name: String,
    pub calories: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFood {
    pub meal_id: i64,
    pub user_id: String,
    pub name: String,
    pub calories: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodPatch {
    pub name: String,
    pub calories: i32,
}

/// A food picked by the user, before it belongs to any meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub calories: i32,
}

impl FoodItem {
    pub fn new(name: impl Into<String>, calories: i32) -> Self {
        Self {
            name: name.into(),
            calories,
        }
    }
}

pub fn validate_food(name: &str, calories: i32) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Food name must not be empty"));
    }
    if calories < 0 {
        return Err(Error::validation(format!(
            "Calories must be non-negative (got {calories})"
        )));
    }
    Ok(())
}

/// A meal with the foods logged against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealEntry {
    pub id: i64,
    pub meal_type: MealType,
    pub date_label: String,
    pub foods: Vec<FoodEntry>,
}

impl MealEntry {
    #[must_use]
    pub fn total_calories(&self) -> i32 {
        sum_calories(self.foods.iter().map(|f| f.calories))
    }
}

// --- Dashboard ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDashboard {
    pub date_label: String,
    pub eaten: i32,
    pub burned: i32,
    pub goal: i32,
    pub eaten_progress: f64,
    pub burned_progress: f64,
    pub meals: Vec<MealSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealSummary {
    pub meal_type: MealType,
    pub calories: i32,
    /// Set only when nothing is logged for the meal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended: Option<i32>,
}

impl DailyDashboard {
    #[must_use]
    pub fn build(
        date_label: &str,
        meals: &[MealEntry],
        exercises: &[ExerciseEntry],
        goal: i32,
    ) -> Self {
        let eaten = sum_calories(meals.iter().map(MealEntry::total_calories));
        let burned = sum_calories(exercises.iter().map(|e| e.calories));
        let meals = MealType::ALL
            .into_iter()
            .map(|meal_type| {
                let calories = sum_calories(
                    meals
                        .iter()
                        .filter(|m| m.meal_type == meal_type)
                        .map(MealEntry::total_calories),
                );
                MealSummary {
                    meal_type,
                    calories,
                    recommended: (calories == 0).then(|| meal_type.recommended_calories()),
                }
            })
            .collect();
        Self {
            date_label: date_label.to_string(),
            eaten,
            burned,
            goal,
            eaten_progress: progress(eaten, goal),
            burned_progress: progress(burned, goal),
            meals,
        }
    }
}

/// Fraction of `goal` reached, clamped to `[0, 1]`. A non-positive goal
/// yields 0.
#[must_use]
pub fn progress(value: i32, goal: i32) -> f64 {
    if goal <= 0 {
        return 0.0;
    }
    (f64::from(value) / f64::from(goal)).clamp(0.0, 1.0)
}

// --- Labels ---

/// Label used to key meals by day, e.g. `2 May, Monday`.
#[must_use]
pub fn date_label(date: NaiveDate) -> String {
    date.format("%-d %B, %A").to_string()
}

/// Display time stored with an exercise, e.g. `2 May, 2022 • 07:30`.
#[must_use]
pub fn display_time(at: NaiveDateTime) -> String {
    at.format("%-d %b, %Y • %H:%M").to_string()
}

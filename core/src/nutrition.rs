use std::sync::Arc;

use crate::error::Result;
use crate::models::{
    FOODS_TABLE, FoodEntry, FoodItem, FoodPatch, MEALS_TABLE, MealEntry, MealRow, MealType,
    NewFood, NewMeal, validate_food,
};
use crate::store::{Filter, TableStore, from_row, from_rows, to_row};

/// Columns that identify a meal; the store holds a unique key on them.
const MEAL_KEY: [&str; 3] = ["user_id", "date_label", "meal_type"];

/// Meal and food operations over `nutrition_meals` and `nutrition_foods`.
///
/// Meals are keyed by (owner, date label, meal type) and only exist while
/// foods are logged against them. Food rows carry the owner id so every
/// food-level path is scoped the same way as meals.
#[derive(Clone)]
pub struct NutritionRepository {
    store: Arc<dyn TableStore>,
}

impl NutritionRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Meals for one day with their foods. Foods are fetched per meal, one
    /// request each. Meals with no foods are left out.
    pub async fn load_meals_for_date(&self, owner: &str, date_label: &str) -> Result<Vec<MealEntry>> {
        let rows = self
            .store
            .select(
                MEALS_TABLE,
                &[Filter::eq("user_id", owner), Filter::eq("date_label", date_label)],
            )
            .await?;
        let meal_rows: Vec<MealRow> = from_rows(rows)?;

        let mut meals = Vec::with_capacity(meal_rows.len());
        for meal in meal_rows {
            let foods = self.foods_for_meal(owner, meal.id).await?;
            if foods.is_empty() {
                continue;
            }
            meals.push(MealEntry {
                id: meal.id,
                meal_type: meal.meal_type,
                date_label: meal.date_label,
                foods,
            });
        }
        meals.sort_by_key(|m| m.meal_type);
        Ok(meals)
    }

    async fn foods_for_meal(&self, owner: &str, meal_id: i64) -> Result<Vec<FoodEntry>> {
        let rows = self
            .store
            .select(
                FOODS_TABLE,
                &[Filter::eq("meal_id", meal_id), Filter::eq("user_id", owner)],
            )
            .await?;
        from_rows(rows)
    }

    async fn find_meal(
        &self,
        owner: &str,
        meal_type: MealType,
        date_label: &str,
    ) -> Result<Option<MealRow>> {
        let rows = self
            .store
            .select(
                MEALS_TABLE,
                &[
                    Filter::eq("user_id", owner),
                    Filter::eq("date_label", date_label),
                    Filter::eq("meal_type", meal_type.as_str()),
                ],
            )
            .await?;
        let meals: Vec<MealRow> = from_rows(rows)?;
        Ok(meals.into_iter().next())
    }

    /// Log a food, creating the meal row on first use.
    ///
    /// The meal is materialized with an upsert on its unique key, so two
    /// concurrent adds to a new meal land in the same row.
    pub async fn add_food_to_meal(
        &self,
        owner: &str,
        meal_type: MealType,
        date_label: &str,
        food: &FoodItem,
    ) -> Result<FoodEntry> {
        validate_food(&food.name, food.calories)?;

        let meal_row = to_row(&NewMeal {
            user_id: owner.to_string(),
            date_label: date_label.to_string(),
            meal_type,
        })?;
        let meal: MealRow = from_row(self.store.upsert(MEALS_TABLE, meal_row, &MEAL_KEY).await?)?;

        let food_row = to_row(&NewFood {
            meal_id: meal.id,
            user_id: owner.to_string(),
            name: food.name.trim().to_string(),
            calories: food.calories,
        })?;
        let entry: FoodEntry = from_row(self.store.insert(FOODS_TABLE, food_row).await?)?;
        tracing::info!(meal_id = meal.id, food_id = entry.id, %meal_type, "food logged");
        Ok(entry)
    }

    /// Returns `None` when the food does not exist for this owner.
    pub async fn update_food_in_meal(
        &self,
        owner: &str,
        food_id: i64,
        name: &str,
        calories: i32,
    ) -> Result<Option<FoodEntry>> {
        validate_food(name, calories)?;
        let patch = to_row(&FoodPatch {
            name: name.trim().to_string(),
            calories,
        })?;
        let rows = self
            .store
            .update(
                FOODS_TABLE,
                patch,
                &[Filter::eq("id", food_id), Filter::eq("user_id", owner)],
            )
            .await?;
        let updated: Vec<FoodEntry> = from_rows(rows)?;
        Ok(updated.into_iter().next())
    }

    pub async fn remove_food_from_meal(&self, owner: &str, food_id: i64) -> Result<bool> {
        let rows = self
            .store
            .delete(
                FOODS_TABLE,
                &[Filter::eq("id", food_id), Filter::eq("user_id", owner)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Delete a meal and all its foods, foods first. Returns `false` when
    /// there was no such meal.
    pub async fn delete_meal_completely(
        &self,
        owner: &str,
        meal_type: MealType,
        date_label: &str,
    ) -> Result<bool> {
        let Some(meal) = self.find_meal(owner, meal_type, date_label).await? else {
            return Ok(false);
        };

        let foods = self
            .store
            .delete(
                FOODS_TABLE,
                &[Filter::eq("meal_id", meal.id), Filter::eq("user_id", owner)],
            )
            .await?;
        self.store
            .delete(
                MEALS_TABLE,
                &[Filter::eq("id", meal.id), Filter::eq("user_id", owner)],
            )
            .await?;
        tracing::info!(meal_id = meal.id, foods = foods.len(), "meal deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::SqliteStore;
    use crate::store::testing::FlakyStore;

    const DAY: &str = "2 May, Monday";

    fn setup() -> (Arc<SqliteStore>, NutritionRepository) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let repo = NutritionRepository::new(store.clone());
        (store, repo)
    }

    #[tokio::test]
    async fn test_empty_date_has_no_meals() {
        let (_, repo) = setup();
        assert!(repo.load_meals_for_date("u1", DAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_food_creates_meal() {
        let (store, repo) = setup();
        let food = repo
            .add_food_to_meal("u1", MealType::Breakfast, DAY, &FoodItem::new("Bubur Ayam", 240))
            .await
            .unwrap();

        let meals = store.select(MEALS_TABLE, &[]).await.unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0]["id"], food.meal_id);

        let loaded = repo.load_meals_for_date("u1", DAY).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].meal_type, MealType::Breakfast);
        assert_eq!(loaded[0].foods, vec![food]);
        assert_eq!(loaded[0].total_calories(), 240);
    }

    #[tokio::test]
    async fn test_second_food_reuses_meal() {
        let (store, repo) = setup();
        let a = repo
            .add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new("Nasi Putih", 180))
            .await
            .unwrap();
        let b = repo
            .add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new("Ayam Goreng", 250))
            .await
            .unwrap();
        assert_eq!(a.meal_id, b.meal_id);
        assert_eq!(store.select(MEALS_TABLE, &[]).await.unwrap().len(), 1);

        let loaded = repo.load_meals_for_date("u1", DAY).await.unwrap();
        assert_eq!(loaded[0].total_calories(), 430);
    }

    #[tokio::test]
    async fn test_concurrent_adds_share_one_meal() {
        let (store, repo) = setup();
        let first = FoodItem::new("Tempe Goreng", 75);
        let second = FoodItem::new("Sayur Asem", 50);
        let (a, b) = tokio::join!(
            repo.add_food_to_meal("u1", MealType::Dinner, DAY, &first),
            repo.add_food_to_meal("u1", MealType::Dinner, DAY, &second),
        );
        assert_eq!(a.unwrap().meal_id, b.unwrap().meal_id);
        assert_eq!(store.select(MEALS_TABLE, &[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_only_matches_owner_and_date() {
        let (_, repo) = setup();
        let pisang = FoodItem::new("Pisang", 89);
        repo.add_food_to_meal("u1", MealType::Snack, DAY, &pisang)
            .await
            .unwrap();
        repo.add_food_to_meal("u1", MealType::Snack, "3 May, Tuesday", &pisang)
            .await
            .unwrap();
        repo.add_food_to_meal("u2", MealType::Snack, DAY, &pisang)
            .await
            .unwrap();

        let loaded = repo.load_meals_for_date("u1", DAY).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].date_label, DAY);
        assert!(loaded[0].foods.iter().all(|f| f.owner_id == "u1"));
    }

    #[tokio::test]
    async fn test_meals_sorted_by_meal_type() {
        let (_, repo) = setup();
        let food = FoodItem::new("Roti Gandum", 70);
        for meal in [MealType::Snack, MealType::Breakfast, MealType::Dinner] {
            repo.add_food_to_meal("u1", meal, DAY, &food).await.unwrap();
        }
        let order: Vec<MealType> = repo
            .load_meals_for_date("u1", DAY)
            .await
            .unwrap()
            .iter()
            .map(|m| m.meal_type)
            .collect();
        assert_eq!(order, vec![MealType::Breakfast, MealType::Dinner, MealType::Snack]);
    }

    #[tokio::test]
    async fn test_update_food() {
        let (_, repo) = setup();
        let food = repo
            .add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new("Nasi", 180))
            .await
            .unwrap();

        let updated = repo
            .update_food_in_meal("u1", food.id, "Nasi Merah", 150)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Nasi Merah");
        assert_eq!(updated.calories, 150);
        assert_eq!(updated.meal_id, food.meal_id);
    }

    #[tokio::test]
    async fn test_food_paths_scoped_to_owner() {
        let (_, repo) = setup();
        let food = repo
            .add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new("Nasi", 180))
            .await
            .unwrap();

        assert!(
            repo.update_food_in_meal("u2", food.id, "Hijacked", 1)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!repo.remove_food_from_meal("u2", food.id).await.unwrap());

        let loaded = repo.load_meals_for_date("u1", DAY).await.unwrap();
        assert_eq!(loaded[0].foods, vec![food]);
    }

    #[tokio::test]
    async fn test_removing_last_food_hides_meal() {
        let (_, repo) = setup();
        let food = repo
            .add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new("Nasi", 180))
            .await
            .unwrap();

        assert!(repo.remove_food_from_meal("u1", food.id).await.unwrap());
        assert!(!repo.remove_food_from_meal("u1", food.id).await.unwrap());
        assert!(repo.load_meals_for_date("u1", DAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_meal_removes_foods_then_meal() {
        let (store, repo) = setup();
        for item in [FoodItem::new("Nasi", 180), FoodItem::new("Ayam", 250)] {
            repo.add_food_to_meal("u1", MealType::Dinner, DAY, &item)
                .await
                .unwrap();
        }
        repo.add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new("Pisang", 89))
            .await
            .unwrap();

        assert!(
            repo.delete_meal_completely("u1", MealType::Dinner, DAY)
                .await
                .unwrap()
        );

        let foods = store.select(FOODS_TABLE, &[]).await.unwrap();
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0]["name"], "Pisang");
        let loaded = repo.load_meals_for_date("u1", DAY).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].meal_type, MealType::Lunch);
    }

    #[tokio::test]
    async fn test_delete_missing_meal_is_noop() {
        let (_, repo) = setup();
        assert!(
            !repo
                .delete_meal_completely("u1", MealType::Breakfast, DAY)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_food_rejected_before_store() {
        let store = Arc::new(FlakyStore::new());
        let repo = NutritionRepository::new(store.clone());

        let err = repo
            .add_food_to_meal("u1", MealType::Lunch, DAY, &FoodItem::new(" ", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = repo
            .update_food_in_meal("u1", 1, "Nasi", -5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_load_is_one_query_per_meal() {
        let store = Arc::new(FlakyStore::new());
        let repo = NutritionRepository::new(store.clone());
        let food = FoodItem::new("Pisang", 89);
        repo.add_food_to_meal("u1", MealType::Breakfast, DAY, &food)
            .await
            .unwrap();
        repo.add_food_to_meal("u1", MealType::Lunch, DAY, &food)
            .await
            .unwrap();

        let before = store.calls();
        repo.load_meals_for_date("u1", DAY).await.unwrap();
        assert_eq!(store.calls() - before, 3);
    }
}

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;

use super::{StateCell, ViewState};
use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::models::{FoodEntry, FoodItem, MealEntry, MealType, sum_calories};
use crate::nutrition::NutritionRepository;
use crate::service::FitnessServices;

/// The food being replaced by the next [`NutritionController::select_food`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTarget {
    pub meal_type: MealType,
    pub food_id: i64,
}

/// Meals screen state for one selected day.
pub struct NutritionController {
    repo: NutritionRepository,
    identity: Arc<dyn IdentityProvider>,
    state: StateCell<MealEntry>,
    date_label: RwLock<String>,
    editing: Mutex<Option<EditTarget>>,
}

impl NutritionController {
    pub fn new(services: &FitnessServices, date_label: impl Into<String>) -> Self {
        Self {
            repo: services.nutrition.clone(),
            identity: services.identity(),
            state: StateCell::new(),
            date_label: RwLock::new(date_label.into()),
            editing: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ViewState<MealEntry> {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<MealEntry>> {
        self.state.subscribe()
    }

    pub fn date_label(&self) -> String {
        self.date_label
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switch day and reload. Any pending edit belongs to the old day and
    /// is dropped.
    pub async fn set_date(&self, date_label: impl Into<String>) -> Result<()> {
        *self
            .date_label
            .write()
            .unwrap_or_else(PoisonError::into_inner) = date_label.into();
        self.cancel_edit();
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<()> {
        let owner = self.identity.owner_id();
        let mut ticket = self.state.begin_refresh();
        loop {
            let date = self.date_label();
            let result = self.repo.load_meals_for_date(&owner, &date).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, date = %date, "meal refresh failed");
            }
            match self.state.finish_refresh(ticket, result)? {
                Some(next) => {
                    tracing::debug!(date = %date, "meal refresh raced a mutation, loading again");
                    ticket = next;
                }
                None => return Ok(()),
            }
        }
    }

    pub fn begin_edit(&self, meal_type: MealType, food_id: i64) {
        *self.editing.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(EditTarget { meal_type, food_id });
    }

    pub fn cancel_edit(&self) {
        self.take_edit();
    }

    pub fn editing_target(&self) -> Option<EditTarget> {
        *self.editing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_edit(&self) -> Option<EditTarget> {
        self.editing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Replace the food under edit when the edit target is in `meal_type`,
    /// otherwise log `food` as a new entry. The edit target is consumed
    /// either way. If the edited food has vanished, the food is inserted.
    pub async fn select_food(&self, meal_type: MealType, food: &FoodItem) -> Result<FoodEntry> {
        match self.take_edit() {
            Some(target) if target.meal_type == meal_type => {
                let updated = self
                    .update_food(target.food_id, &food.name, food.calories)
                    .await?;
                match updated {
                    Some(entry) => Ok(entry),
                    None => self.add_food(meal_type, food).await,
                }
            }
            _ => self.add_food(meal_type, food).await,
        }
    }

    pub async fn add_food(&self, meal_type: MealType, food: &FoodItem) -> Result<FoodEntry> {
        let date = self.date_label();
        let result = self
            .repo
            .add_food_to_meal(&self.identity.owner_id(), meal_type, &date, food)
            .await;
        let current = self.date_label() == date;
        self.state.settle(result, |meals, entry| {
            if current {
                insert_food(meals, meal_type, &date, entry.clone());
            }
        })
    }

    /// Returns `None` when the food no longer exists; it is then dropped
    /// from the local meals too.
    pub async fn update_food(
        &self,
        food_id: i64,
        name: &str,
        calories: i32,
    ) -> Result<Option<FoodEntry>> {
        let result = self
            .repo
            .update_food_in_meal(&self.identity.owner_id(), food_id, name, calories)
            .await;
        self.state.settle(result, |meals, updated| match updated {
            Some(updated) => {
                let slot = meals
                    .iter_mut()
                    .flat_map(|m| m.foods.iter_mut())
                    .find(|f| f.id == food_id);
                if let Some(slot) = slot {
                    *slot = updated.clone();
                }
            }
            None => remove_food(meals, food_id),
        })
    }

    /// A meal whose last food is removed disappears from the state.
    pub async fn remove_food(&self, food_id: i64) -> Result<bool> {
        let result = self
            .repo
            .remove_food_from_meal(&self.identity.owner_id(), food_id)
            .await;
        self.state
            .settle(result, |meals, _| remove_food(meals, food_id))
    }

    pub async fn delete_meal(&self, meal_type: MealType) -> Result<bool> {
        let date = self.date_label();
        let result = self
            .repo
            .delete_meal_completely(&self.identity.owner_id(), meal_type, &date)
            .await;
        self.state.settle(result, |meals, _| {
            meals.retain(|m| !(m.meal_type == meal_type && m.date_label == date));
        })
    }

    pub fn meal(&self, meal_type: MealType) -> Option<MealEntry> {
        self.state
            .with_items(|meals| meals.iter().find(|m| m.meal_type == meal_type).cloned())
    }

    pub fn meal_calories(&self, meal_type: MealType) -> i32 {
        self.state.with_items(|meals| {
            sum_calories(
                meals
                    .iter()
                    .filter(|m| m.meal_type == meal_type)
                    .map(MealEntry::total_calories),
            )
        })
    }

    pub fn total_calories(&self) -> i32 {
        self.state
            .with_items(|meals| sum_calories(meals.iter().map(MealEntry::total_calories)))
    }
}

fn insert_food(meals: &mut Vec<MealEntry>, meal_type: MealType, date_label: &str, food: FoodEntry) {
    if let Some(meal) = meals.iter_mut().find(|m| m.id == food.meal_id) {
        meal.foods.push(food);
        return;
    }
    meals.push(MealEntry {
        id: food.meal_id,
        meal_type,
        date_label: date_label.to_string(),
        foods: vec![food],
    });
    meals.sort_by_key(|m| m.meal_type);
}

fn remove_food(meals: &mut Vec<MealEntry>, food_id: i64) {
    for meal in meals.iter_mut() {
        meal.foods.retain(|f| f.id != food_id);
    }
    meals.retain(|m| !m.foods.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::store::testing::FlakyStore;

    const MONDAY: &str = "2 May, Monday";
    const TUESDAY: &str = "3 May, Tuesday";

    fn setup() -> (Arc<FlakyStore>, NutritionController) {
        let store = Arc::new(FlakyStore::new());
        let identity = Arc::new(StaticIdentity::new(Some("u1".to_string())));
        let services = FitnessServices::new(store.clone(), identity);
        (store, NutritionController::new(&services, MONDAY))
    }

    fn item(name: &str, calories: i32) -> FoodItem {
        FoodItem::new(name, calories)
    }

    #[tokio::test]
    async fn test_add_food_creates_meal_locally() {
        let (_store, ctrl) = setup();
        let food = ctrl
            .add_food(MealType::Breakfast, &item("Bubur Ayam", 240))
            .await
            .unwrap();

        let state = ctrl.state();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].meal_type, MealType::Breakfast);
        assert_eq!(state.items[0].date_label, MONDAY);
        assert_eq!(state.items[0].foods, vec![food]);
        assert_eq!(ctrl.total_calories(), 240);
    }

    #[tokio::test]
    async fn test_local_state_matches_reload() {
        let (_store, ctrl) = setup();
        ctrl.add_food(MealType::Dinner, &item("Nasi Putih", 180)).await.unwrap();
        ctrl.add_food(MealType::Breakfast, &item("Pisang", 89)).await.unwrap();
        ctrl.add_food(MealType::Dinner, &item("Sayur Asem", 50)).await.unwrap();
        let local = ctrl.state().items;

        ctrl.refresh().await.unwrap();
        assert_eq!(ctrl.state().items, local);
        assert_eq!(ctrl.meal_calories(MealType::Dinner), 230);
        assert_eq!(ctrl.meal_calories(MealType::Lunch), 0);
    }

    #[tokio::test]
    async fn test_select_food_updates_edit_target() {
        let (_store, ctrl) = setup();
        let food = ctrl.add_food(MealType::Lunch, &item("Tempe Goreng", 75)).await.unwrap();

        ctrl.begin_edit(MealType::Lunch, food.id);
        let updated = ctrl
            .select_food(MealType::Lunch, &item("Ayam Goreng", 250))
            .await
            .unwrap();
        assert_eq!(updated.id, food.id);
        assert_eq!(updated.name, "Ayam Goreng");
        assert!(ctrl.editing_target().is_none());

        let lunch = ctrl.meal(MealType::Lunch).unwrap();
        assert_eq!(lunch.foods, vec![updated]);
    }

    #[tokio::test]
    async fn test_select_food_other_meal_inserts_and_clears_target() {
        let (_store, ctrl) = setup();
        let food = ctrl.add_food(MealType::Lunch, &item("Tempe Goreng", 75)).await.unwrap();

        ctrl.begin_edit(MealType::Lunch, food.id);
        let added = ctrl
            .select_food(MealType::Dinner, &item("Pisang", 89))
            .await
            .unwrap();
        assert_ne!(added.id, food.id);
        assert!(ctrl.editing_target().is_none());
        assert_eq!(ctrl.meal(MealType::Lunch).unwrap().foods, vec![food]);
        assert_eq!(ctrl.meal_calories(MealType::Dinner), 89);
    }

    #[tokio::test]
    async fn test_select_food_vanished_target_inserts() {
        let (_store, ctrl) = setup();
        let food = ctrl.add_food(MealType::Lunch, &item("Tempe Goreng", 75)).await.unwrap();
        ctrl.begin_edit(MealType::Lunch, food.id);
        ctrl.remove_food(food.id).await.unwrap();

        let added = ctrl
            .select_food(MealType::Lunch, &item("Pisang", 89))
            .await
            .unwrap();
        assert_ne!(added.id, food.id);
        assert_eq!(ctrl.meal(MealType::Lunch).unwrap().foods, vec![added]);
    }

    #[tokio::test]
    async fn test_cancel_edit() {
        let (_store, ctrl) = setup();
        ctrl.begin_edit(MealType::Snack, 4);
        assert_eq!(
            ctrl.editing_target(),
            Some(EditTarget {
                meal_type: MealType::Snack,
                food_id: 4
            })
        );
        ctrl.cancel_edit();
        assert!(ctrl.editing_target().is_none());
    }

    #[tokio::test]
    async fn test_removing_last_food_drops_meal() {
        let (_store, ctrl) = setup();
        let a = ctrl.add_food(MealType::Snack, &item("Pisang", 89)).await.unwrap();
        let b = ctrl.add_food(MealType::Snack, &item("Roti Gandum", 70)).await.unwrap();

        assert!(ctrl.remove_food(a.id).await.unwrap());
        assert_eq!(ctrl.meal(MealType::Snack).unwrap().foods, vec![b.clone()]);
        assert!(ctrl.remove_food(b.id).await.unwrap());
        assert!(ctrl.meal(MealType::Snack).is_none());
    }

    #[tokio::test]
    async fn test_delete_meal() {
        let (_store, ctrl) = setup();
        ctrl.add_food(MealType::Lunch, &item("Nasi Putih", 180)).await.unwrap();
        ctrl.add_food(MealType::Dinner, &item("Ayam Goreng", 250)).await.unwrap();

        assert!(ctrl.delete_meal(MealType::Lunch).await.unwrap());
        assert!(ctrl.meal(MealType::Lunch).is_none());
        assert_eq!(ctrl.total_calories(), 250);
        assert!(!ctrl.delete_meal(MealType::Lunch).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_date_reloads_and_drops_edit() {
        let (_store, ctrl) = setup();
        let food = ctrl.add_food(MealType::Lunch, &item("Nasi Putih", 180)).await.unwrap();
        ctrl.begin_edit(MealType::Lunch, food.id);

        ctrl.set_date(TUESDAY).await.unwrap();
        assert_eq!(ctrl.date_label(), TUESDAY);
        assert!(ctrl.state().items.is_empty());
        assert!(ctrl.editing_target().is_none());

        ctrl.add_food(MealType::Lunch, &item("Pisang", 89)).await.unwrap();
        ctrl.set_date(MONDAY).await.unwrap();
        assert_eq!(ctrl.total_calories(), 180);
    }

    #[tokio::test]
    async fn test_calorie_totals_saturate() {
        let (_store, ctrl) = setup();
        ctrl.add_food(MealType::Lunch, &item("A", i32::MAX)).await.unwrap();
        ctrl.add_food(MealType::Lunch, &item("B", 1)).await.unwrap();
        ctrl.add_food(MealType::Dinner, &item("C", 10)).await.unwrap();

        assert_eq!(ctrl.meal_calories(MealType::Lunch), i32::MAX);
        assert_eq!(ctrl.total_calories(), i32::MAX);
    }

    #[tokio::test]
    async fn test_failed_mutation_surfaces_in_state() {
        let (store, ctrl) = setup();
        ctrl.add_food(MealType::Lunch, &item("Nasi Putih", 180)).await.unwrap();
        store.set_offline(true);

        let err = ctrl
            .add_food(MealType::Lunch, &item("Pisang", 89))
            .await
            .unwrap_err();
        let state = ctrl.state();
        assert_eq!(state.error, Some(err.to_string()));
        assert_eq!(ctrl.total_calories(), 180);

        store.set_offline(false);
        ctrl.refresh().await.unwrap();
        assert!(ctrl.state().error.is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_surfaces_in_state() {
        let (store, ctrl) = setup();
        assert!(ctrl.add_food(MealType::Lunch, &item(" ", 10)).await.is_err());
        assert_eq!(store.calls(), 0);
        assert_eq!(
            ctrl.state().error.as_deref(),
            Some("Food name must not be empty")
        );
    }
}

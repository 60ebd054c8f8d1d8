use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::exercise::ExerciseRepository;
use crate::identity::IdentityProvider;
use crate::models::{DEFAULT_CALORIE_GOAL, DailyDashboard};
use crate::nutrition::NutritionRepository;
use crate::store::{PostgrestConfig, PostgrestStore, SqliteStore, TableStore};

/// Everything the controllers need, built once at startup and shared.
#[derive(Clone)]
pub struct FitnessServices {
    pub exercise: ExerciseRepository,
    pub nutrition: NutritionRepository,
    identity: Arc<dyn IdentityProvider>,
    calorie_goal: i32,
}

impl FitnessServices {
    pub fn new(store: Arc<dyn TableStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            exercise: ExerciseRepository::new(store.clone()),
            nutrition: NutritionRepository::new(store),
            identity,
            calorie_goal: DEFAULT_CALORIE_GOAL,
        }
    }

    pub fn remote(config: PostgrestConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let store = PostgrestStore::new(config)?;
        Ok(Self::new(Arc::new(store), identity))
    }

    pub fn local(db_path: &Path, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let store = SqliteStore::open(db_path)?;
        Ok(Self::new(Arc::new(store), identity))
    }

    pub fn in_memory(identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let store = SqliteStore::open_in_memory()?;
        Ok(Self::new(Arc::new(store), identity))
    }

    #[must_use]
    pub fn with_calorie_goal(mut self, goal: i32) -> Self {
        self.calorie_goal = goal;
        self
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        self.identity.clone()
    }

    pub fn owner_id(&self) -> String {
        self.identity.owner_id()
    }

    pub fn calorie_goal(&self) -> i32 {
        self.calorie_goal
    }

    /// Eaten vs burned for one day. Exercise entries carry only a display
    /// time, so the burned figure covers every logged exercise.
    pub async fn dashboard(&self, date_label: &str) -> Result<DailyDashboard> {
        let owner = self.owner_id();
        let meals = self.nutrition.load_meals_for_date(&owner, date_label).await?;
        let exercises = self.exercise.load_all(&owner).await?;
        Ok(DailyDashboard::build(
            date_label,
            &meals,
            &exercises,
            self.calorie_goal,
        ))
    }
}

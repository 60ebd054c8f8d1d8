use std::sync::Arc;

use tokio::sync::watch;

use super::{StateCell, ViewState};
use crate::error::Result;
use crate::exercise::ExerciseRepository;
use crate::identity::IdentityProvider;
use crate::models::{ExerciseEntry, sum_calories};
use crate::service::FitnessServices;

/// Exercise log screen state.
pub struct ExerciseController {
    repo: ExerciseRepository,
    identity: Arc<dyn IdentityProvider>,
    state: StateCell<ExerciseEntry>,
}

impl ExerciseController {
    pub fn new(services: &FitnessServices) -> Self {
        Self {
            repo: services.exercise.clone(),
            identity: services.identity(),
            state: StateCell::new(),
        }
    }

    pub fn state(&self) -> ViewState<ExerciseEntry> {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<ExerciseEntry>> {
        self.state.subscribe()
    }

    pub async fn refresh(&self) -> Result<()> {
        let owner = self.identity.owner_id();
        let mut ticket = self.state.begin_refresh();
        loop {
            let result = self.repo.load_all(&owner).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "exercise refresh failed");
            }
            match self.state.finish_refresh(ticket, result)? {
                Some(next) => {
                    tracing::debug!("exercise refresh raced a mutation, loading again");
                    ticket = next;
                }
                None => return Ok(()),
            }
        }
    }

    pub async fn add(
        &self,
        activity_type: &str,
        duration_minutes: i32,
        display_time: &str,
    ) -> Result<ExerciseEntry> {
        let result = self
            .repo
            .add(
                &self.identity.owner_id(),
                activity_type,
                duration_minutes,
                display_time,
            )
            .await;
        self.state
            .settle(result, |items, entry| items.push(entry.clone()))
    }

    /// Returns `None` when the entry no longer exists; it is then dropped
    /// from the local list too.
    pub async fn update(&self, entry: &ExerciseEntry) -> Result<Option<ExerciseEntry>> {
        let id = entry.id;
        let result = self.repo.update(&self.identity.owner_id(), entry).await;
        self.state.settle(result, |items, updated| match updated {
            Some(updated) => {
                if let Some(slot) = items.iter_mut().find(|e| e.id == id) {
                    *slot = updated.clone();
                }
            }
            None => items.retain(|e| e.id != id),
        })
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = self.repo.delete(&self.identity.owner_id(), id).await;
        self.state
            .settle(result, |items, _| items.retain(|e| e.id != id))
    }

    pub fn total_burned(&self) -> i32 {
        self.state
            .with_items(|items| sum_calories(items.iter().map(|e| e.calories)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::store::testing::FlakyStore;

    fn setup() -> (Arc<FlakyStore>, ExerciseController) {
        let store = Arc::new(FlakyStore::new());
        let identity = Arc::new(StaticIdentity::new(Some("u1".to_string())));
        let services = FitnessServices::new(store.clone(), identity);
        (store, ExerciseController::new(&services))
    }

    #[tokio::test]
    async fn test_refresh_loads_owner_entries() {
        let (_store, ctrl) = setup();
        ctrl.add("Running", 30, "t").await.unwrap();
        ctrl.refresh().await.unwrap();

        let state = ctrl.state();
        assert!(!state.is_loading);
        assert_eq!(state.items.len(), 1);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_add_applies_entity_without_reload() {
        let (store, ctrl) = setup();
        let entry = ctrl.add("Running", 30, "t").await.unwrap();
        assert_eq!(entry.calories, 300);
        // rate lookup + insert, no follow-up select
        assert_eq!(store.calls(), 2);
        assert_eq!(ctrl.state().items, vec![entry]);
        assert_eq!(ctrl.total_burned(), 300);
    }

    #[tokio::test]
    async fn test_update_replaces_local_entry() {
        let (_store, ctrl) = setup();
        let mut entry = ctrl.add("Running", 30, "t").await.unwrap();
        entry.activity_type = "Walking".to_string();

        let updated = ctrl.update(&entry).await.unwrap().unwrap();
        assert_eq!(updated.calories, 120);
        assert_eq!(ctrl.state().items, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_missing_entry_drops_it() {
        let (_store, ctrl) = setup();
        let entry = ctrl.add("Yoga", 20, "t").await.unwrap();
        assert!(ctrl.delete(entry.id).await.unwrap());

        assert!(ctrl.update(&entry).await.unwrap().is_none());
        assert!(ctrl.state().items.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_local_entry() {
        let (_store, ctrl) = setup();
        let keep = ctrl.add("Running", 10, "a").await.unwrap();
        let gone = ctrl.add("Cycling", 10, "b").await.unwrap();

        assert!(ctrl.delete(gone.id).await.unwrap());
        assert_eq!(ctrl.state().items, vec![keep]);
        assert!(!ctrl.delete(gone.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_total_burned_saturates() {
        let (_store, ctrl) = setup();
        let huge = ctrl.add("Running", i32::MAX, "a").await.unwrap();
        assert_eq!(huge.calories, i32::MAX);
        ctrl.add("Running", 1, "b").await.unwrap();
        assert_eq!(ctrl.total_burned(), i32::MAX);
    }

    #[tokio::test]
    async fn test_failed_mutation_surfaces_in_state() {
        let (store, ctrl) = setup();
        ctrl.add("Running", 10, "a").await.unwrap();
        store.set_offline(true);

        let err = ctrl.add("Running", 10, "b").await.unwrap_err();
        assert!(err.is_network());

        let state = ctrl.state();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.error, Some(err.to_string()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_items() {
        let (store, ctrl) = setup();
        ctrl.add("Running", 10, "a").await.unwrap();
        ctrl.refresh().await.unwrap();
        store.set_offline(true);

        assert!(ctrl.refresh().await.is_err());
        let state = ctrl.state();
        assert!(!state.is_loading);
        assert_eq!(state.items.len(), 1);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_validation_error_in_state() {
        let (store, ctrl) = setup();
        assert!(ctrl.add("Running", 0, "t").await.is_err());
        assert_eq!(store.calls(), 0);
        assert_eq!(
            ctrl.state().error.as_deref(),
            Some("Duration must be greater than 0 (got 0)")
        );
    }
}

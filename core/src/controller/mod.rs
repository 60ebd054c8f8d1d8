//! View state for the exercise and nutrition screens.
//!
//! Controllers own a [`ViewState`] published on a `watch` channel. Front
//! ends subscribe and re-render on change; every repository failure,
//! from a refresh or a mutation, lands in `error`.

mod exercise;
mod nutrition;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;

use crate::error::Result;

pub use exercise::ExerciseController;
pub use nutrition::{EditTarget, NutritionController};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState<T> {
    pub is_loading: bool,
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            is_loading: false,
            items: Vec::new(),
            error: None,
        }
    }
}

pub(crate) struct StateCell<T> {
    tx: watch::Sender<ViewState<T>>,
    generation: AtomicU64,
    mutations: AtomicU64,
}

/// Loads retried after racing a mutation before local items are kept.
const MAX_LOAD_ATTEMPTS: u32 = 3;

/// Identifies one load: its generation and the mutation count when it began.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RefreshTicket {
    generation: u64,
    mutations: u64,
    attempt: u32,
}

impl<T: Clone> StateCell<T> {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(ViewState::default());
        Self {
            tx,
            generation: AtomicU64::new(0),
            mutations: AtomicU64::new(0),
        }
    }

    pub(crate) fn snapshot(&self) -> ViewState<T> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.tx.borrow().items)
    }

    /// Mark a load as started.
    pub(crate) fn begin_refresh(&self) -> RefreshTicket {
        self.tx.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        self.ticket(1)
    }

    fn ticket(&self, attempt: u32) -> RefreshTicket {
        RefreshTicket {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            mutations: self.mutations.load(Ordering::SeqCst),
            attempt,
        }
    }

    /// Apply a load result unless a newer load was started meanwhile. On
    /// failure the previous items stay in place.
    ///
    /// Rows read while a mutation landed may predate it. They are dropped
    /// and a ticket for another load is returned; once the attempts run out
    /// the local items are kept as they are.
    pub(crate) fn finish_refresh(
        &self,
        ticket: RefreshTicket,
        result: Result<Vec<T>>,
    ) -> Result<Option<RefreshTicket>> {
        let latest = self.generation.load(Ordering::SeqCst) == ticket.generation;
        match result {
            Ok(items) => {
                if !latest {
                    return Ok(None);
                }
                let raced = self.mutations.load(Ordering::SeqCst) != ticket.mutations;
                if raced && ticket.attempt < MAX_LOAD_ATTEMPTS {
                    return Ok(Some(self.ticket(ticket.attempt + 1)));
                }
                self.tx.send_modify(|s| {
                    if !raced {
                        s.items = items;
                    }
                    s.is_loading = false;
                });
                Ok(None)
            }
            Err(err) => {
                if latest {
                    let message = err.to_string();
                    self.tx.send_modify(|s| {
                        s.error = Some(message);
                        s.is_loading = false;
                    });
                }
                Err(err)
            }
        }
    }

    /// Fold a mutation result into the state: apply the returned value to
    /// the items on success, record the error otherwise.
    pub(crate) fn settle<R>(
        &self,
        result: Result<R>,
        apply: impl FnOnce(&mut Vec<T>, &R),
    ) -> Result<R> {
        match &result {
            Ok(value) => {
                self.mutations.fetch_add(1, Ordering::SeqCst);
                self.tx.send_modify(|s| {
                    apply(&mut s.items, value);
                    s.error = None;
                });
            }
            Err(err) => {
                let message = err.to_string();
                self.tx.send_modify(|s| s.error = Some(message));
            }
        }
        result
    }
}

//! Session state for today's meal log.
//!
//! A [`MealLogEngine`] owns the canonical list of entries for one active view. Every
//! intent waits for the store to answer before touching that list, and each intent
//! applies its own result the moment its request resolves. Nothing is inserted or
//! removed optimistically, so a failed request leaves the list exactly as it was.
//!
//! Intents may overlap freely. Two quick-adds that resolve out of order are
//! prepended in completion order.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{calorie_progress, daily_totals, macro_progress};
use crate::error::{GatewayError, MealLogError};
use crate::gateway::MealGateway;
use crate::models::{
    CalorieProgress, DailyTotals, MacroProgress, MealEntry, NutritionTargets, QuickAddForm,
};

/// How many recent entries a session loads.
pub const DEFAULT_FETCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Load,
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub operation: Operation,
    pub message: String,
}

/// Read-only view handed to whatever renders the log.
#[derive(Debug, Clone, Serialize)]
pub struct MealLogSnapshot {
    pub entries: Vec<MealEntry>,
    pub totals: DailyTotals,
    pub calories: CalorieProgress,
    pub macros: Vec<MacroProgress>,
    pub loading: bool,
    pub loaded: bool,
    pub saving: bool,
    pub last_error: Option<LastError>,
}

#[derive(Default)]
struct SessionState {
    entries: Vec<MealEntry>,
    /// Sequence number of the most recently started load.
    latest_load: u64,
    loading: bool,
    loaded: bool,
    adds_in_flight: usize,
    last_error: Option<LastError>,
    closed: bool,
}

impl SessionState {
    fn record_failure(&mut self, operation: Operation, err: &GatewayError) {
        self.last_error = Some(LastError {
            operation,
            message: err.to_string(),
        });
    }

    fn clear_failure(&mut self, operation: Operation) {
        if self
            .last_error
            .as_ref()
            .is_some_and(|e| e.operation == operation)
        {
            self.last_error = None;
        }
    }
}

pub struct MealLogEngine {
    gateway: Arc<dyn MealGateway>,
    targets: NutritionTargets,
    fetch_limit: usize,
    state: Mutex<SessionState>,
}

impl MealLogEngine {
    pub fn new(gateway: Arc<dyn MealGateway>) -> Self {
        Self::with_targets(gateway, NutritionTargets::default())
    }

    pub fn with_targets(gateway: Arc<dyn MealGateway>, targets: NutritionTargets) -> Self {
        Self {
            gateway,
            targets,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            state: Mutex::new(SessionState::default()),
        }
    }

    #[must_use]
    pub fn targets(&self) -> NutritionTargets {
        self.targets
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the most recent entries and replace the collection with them.
    ///
    /// On failure the collection is emptied and the error is kept in the snapshot.
    /// Calling this again is the manual refresh; there is no automatic retry.
    pub async fn initialize(&self) -> Result<(), MealLogError> {
        let ticket = {
            let mut state = self.lock();
            if state.closed {
                return Err(MealLogError::SessionClosed);
            }
            state.latest_load += 1;
            state.loading = true;
            state.latest_load
        };
        let pending = PendingLoad {
            engine: self,
            ticket,
        };

        debug!(limit = self.fetch_limit, ticket, "loading meal log");
        let result = self.gateway.list(self.fetch_limit).await;
        drop(pending);

        let mut state = self.lock();
        if state.closed {
            debug!(ticket, "discarding load result for closed session");
            return Err(MealLogError::SessionClosed);
        }
        if ticket != state.latest_load {
            debug!(ticket, latest = state.latest_load, "discarding superseded load");
            return result.map(|_| ()).map_err(MealLogError::from);
        }

        match result {
            Ok(entries) => {
                state.entries = canonicalize(entries);
                state.loaded = true;
                state.last_error = None;
                info!(count = state.entries.len(), "meal log loaded");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load meals");
                state.entries.clear();
                state.loaded = false;
                state.record_failure(Operation::Load, &err);
                Err(err.into())
            }
        }
    }

    /// Validate the form, create the entry in the store, and prepend the stored row.
    ///
    /// The form is cleared only after the store confirms the write. Invalid input
    /// never reaches the store, and a failed write keeps the form as typed.
    pub async fn quick_add(&self, form: &mut QuickAddForm) -> Result<MealEntry, MealLogError> {
        let meal = form.validate()?;

        {
            let mut state = self.lock();
            if state.closed {
                return Err(MealLogError::SessionClosed);
            }
            state.adds_in_flight += 1;
        }
        let pending = PendingAdd { engine: self };

        debug!(name = %meal.name, calories = meal.calories, "creating meal");
        let result = self.gateway.create(&meal).await;
        drop(pending);

        let mut state = self.lock();
        if state.closed {
            debug!("discarding create result for closed session");
            return Err(MealLogError::SessionClosed);
        }

        match result {
            Ok(entry) => {
                let entry = entry.sanitized();
                state.entries.retain(|e| e.id != entry.id);
                state.entries.insert(0, entry.clone());
                state.clear_failure(Operation::Create);
                drop(state);
                info!(id = %entry.id, name = %entry.name, "meal added");
                form.clear();
                Ok(entry)
            }
            Err(err) => {
                warn!(error = %err, "failed to add meal");
                state.record_failure(Operation::Create, &err);
                Err(err.into())
            }
        }
    }

    /// Delete an entry in the store, then drop it from the collection.
    ///
    /// Returns whether a local entry was removed. An id missing locally is not an
    /// error once the store has accepted the delete.
    pub async fn delete_meal(&self, id: &str) -> Result<bool, MealLogError> {
        if self.lock().closed {
            return Err(MealLogError::SessionClosed);
        }

        debug!(id, "deleting meal");
        let result = self.gateway.delete_by_id(id).await;

        let mut state = self.lock();
        if state.closed {
            debug!(id, "discarding delete result for closed session");
            return Err(MealLogError::SessionClosed);
        }

        match result {
            Ok(()) => {
                let before = state.entries.len();
                state.entries.retain(|e| e.id != id);
                let removed = state.entries.len() < before;
                state.clear_failure(Operation::Delete);
                info!(id, removed, "meal deleted");
                Ok(removed)
            }
            Err(err) => {
                warn!(id, error = %err, "failed to delete meal");
                state.record_failure(Operation::Delete, &err);
                Err(err.into())
            }
        }
    }

    /// Current entries with every derived figure recomputed from them.
    #[must_use]
    pub fn snapshot(&self) -> MealLogSnapshot {
        let state = self.lock();
        let totals = daily_totals(&state.entries);
        MealLogSnapshot {
            entries: state.entries.clone(),
            totals,
            calories: calorie_progress(&totals, &self.targets),
            macros: macro_progress(&totals, &self.targets),
            loading: state.loading,
            loaded: state.loaded,
            saving: state.adds_in_flight > 0,
            last_error: state.last_error.clone(),
        }
    }

    /// End the session. Requests still in flight are ignored when they resolve.
    pub fn teardown(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.entries.clear();
            state.loading = false;
            info!("meal log session closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Keeps `loading` honest when a load future is dropped before the store answers.
struct PendingLoad<'a> {
    engine: &'a MealLogEngine,
    ticket: u64,
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        let mut state = self.engine.lock();
        if state.latest_load == self.ticket {
            state.loading = false;
        }
    }
}

/// Counts one quick add as in flight until it resolves or is cancelled.
struct PendingAdd<'a> {
    engine: &'a MealLogEngine,
}

impl Drop for PendingAdd<'_> {
    fn drop(&mut self) {
        let mut state = self.engine.lock();
        state.adds_in_flight = state.adds_in_flight.saturating_sub(1);
    }
}

/// Sanitize, order newest-first if the store did not, and drop repeated ids.
fn canonicalize(entries: Vec<MealEntry>) -> Vec<MealEntry> {
    let mut entries: Vec<MealEntry> = entries.into_iter().map(MealEntry::sanitized).collect();

    if !entries
        .windows(2)
        .all(|w| w[0].logged_at >= w[1].logged_at)
    {
        warn!("store returned meals out of order, re-sorting");
        entries.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
    }

    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.id.clone()));
    entries
}

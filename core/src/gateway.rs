use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::{MealEntry, NewMeal};

/// Row-oriented persistence for meal entries.
///
/// The store is the only authority for ids and timestamps. The HTTP client in the
/// CLI implements this against the hosted row store; [`MemoryGateway`] keeps
/// rows in process.
#[async_trait]
pub trait MealGateway: Send + Sync {
    /// Most recent entries first, at most `limit` of them.
    async fn list(&self, limit: usize) -> Result<Vec<MealEntry>, GatewayError>;
    async fn create(&self, meal: &NewMeal) -> Result<MealEntry, GatewayError>;
    /// Deleting an id the store does not know is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<(), GatewayError>;
}

/// In-process store used by tests and `serve --memory`.
pub struct MemoryGateway {
    rows: Mutex<Vec<MealEntry>>,
    available: AtomicBool,
    requests: AtomicUsize,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    #[must_use]
    pub fn with_entries(entries: Vec<MealEntry>) -> Self {
        Self {
            rows: Mutex::new(entries),
            available: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
        }
    }

    /// While unavailable every call fails with [`GatewayError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of requests received, including failed ones.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<MealEntry>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_request(&self) -> Result<(), GatewayError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::Unavailable)
        }
    }

    /// Server clock, nudged forward so that creation order is always strict.
    fn next_timestamp(rows: &[MealEntry]) -> DateTime<Utc> {
        let now = Utc::now();
        match rows.iter().map(|r| r.logged_at).max() {
            Some(latest) if latest >= now => latest + TimeDelta::microseconds(1),
            _ => now,
        }
    }
}

#[async_trait]
impl MealGateway for MemoryGateway {
    async fn list(&self, limit: usize) -> Result<Vec<MealEntry>, GatewayError> {
        self.begin_request()?;
        let mut rows = self.rows().clone();
        rows.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        rows.truncate(limit);
        debug!(count = rows.len(), limit, "memory store list");
        Ok(rows)
    }

    async fn create(&self, meal: &NewMeal) -> Result<MealEntry, GatewayError> {
        self.begin_request()?;
        let mut rows = self.rows();
        let entry = MealEntry {
            id: Uuid::new_v4().to_string(),
            name: meal.name.clone(),
            calories: meal.calories,
            protein_g: meal.protein_g,
            carbs_g: meal.carbs_g,
            fat_g: meal.fat_g,
            logged_at: Self::next_timestamp(&rows),
        };
        rows.push(entry.clone());
        debug!(id = %entry.id, "memory store create");
        Ok(entry)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), GatewayError> {
        self.begin_request()?;
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        debug!(id, removed = before - rows.len(), "memory store delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_meal(name: &str, calories: f64) -> NewMeal {
        NewMeal {
            name: name.to_string(),
            calories,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamp() {
        let store = MemoryGateway::new();
        let a = store.create(&new_meal("Eggs", 488.0)).await.unwrap();
        let b = store.create(&new_meal("Toast", 120.0)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.logged_at > a.logged_at);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_limited() {
        let store = MemoryGateway::new();
        for i in 0..5 {
            store
                .create(&new_meal(&format!("meal {i}"), 100.0))
                .await
                .unwrap();
        }
        let rows = store.list(3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "meal 4");
        assert_eq!(rows[2].name, "meal 2");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryGateway::new();
        let a = store.create(&new_meal("Eggs", 488.0)).await.unwrap();
        store.delete_by_id(&a.id).await.unwrap();
        store.delete_by_id(&a.id).await.unwrap();
        store.delete_by_id("never-existed").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryGateway::new();
        store.set_available(false);
        assert_eq!(store.list(50).await, Err(GatewayError::Unavailable));
        assert_eq!(
            store.create(&new_meal("Eggs", 1.0)).await,
            Err(GatewayError::Unavailable)
        );
        assert_eq!(store.delete_by_id("x").await, Err(GatewayError::Unavailable));
        assert_eq!(store.request_count(), 3);
        assert!(store.is_empty());

        store.set_available(true);
        assert!(store.list(50).await.unwrap().is_empty());
    }
}

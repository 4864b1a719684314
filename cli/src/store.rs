use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, header};
use tracing::debug;

use platelog_core::error::GatewayError;
use platelog_core::gateway::MealGateway;
use platelog_core::models::{MealEntry, NewMeal};
use platelog_core::store::{SELECT_COLUMNS, StoreInsert, StoreRow, row_to_meal};

use crate::config::StoreConfig;

/// Client for the hosted row store's REST interface.
pub struct RestStoreClient {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl RestStoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "platelog/{} (meal log)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(config.timeout)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", config.base_url, config.table),
            api_key: config.api_key.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

#[async_trait]
impl MealGateway for RestStoreClient {
    async fn list(&self, limit: usize) -> Result<Vec<MealEntry>, GatewayError> {
        let limit = limit.to_string();
        let request = self.client.get(&self.table_url).query(&[
            ("select", SELECT_COLUMNS),
            ("order", "created_at.desc"),
            ("limit", limit.as_str()),
        ]);
        let rows: Vec<StoreRow> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        debug!(count = rows.len(), "fetched meal rows");
        rows.into_iter().map(row_to_meal).collect()
    }

    async fn create(&self, meal: &NewMeal) -> Result<MealEntry, GatewayError> {
        let request = self
            .client
            .post(&self.table_url)
            .query(&[("select", SELECT_COLUMNS)])
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, "application/vnd.pgrst.object+json")
            .json(&StoreInsert::from(meal));
        let row: StoreRow = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        debug!(id = %row.id, "created meal row");
        row_to_meal(row)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), GatewayError> {
        let filter = format!("eq.{id}");
        let request = self
            .client
            .delete(&self.table_url)
            .query(&[("id", filter.as_str())]);
        self.send(request).await?;
        debug!(id, "deleted meal row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct FakeStore {
        rows: Arc<Mutex<Vec<serde_json::Value>>>,
        seen_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("apikey").is_some_and(|v| v == "anon-key")
            && headers
                .get("authorization")
                .is_some_and(|v| v == "Bearer anon-key")
    }

    async fn list_rows(
        State(store): State<FakeStore>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<Vec<serde_json::Value>>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        store.seen_queries.lock().unwrap().push(params);
        let mut rows = store.rows.lock().unwrap().clone();
        rows.reverse();
        Ok(Json(rows))
    }

    async fn insert_row(
        State(store): State<FakeStore>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
        if !authorized(&headers) || headers.get("prefer").is_none() {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let mut rows = store.rows.lock().unwrap();
        let mut row = body;
        row["id"] = serde_json::json!(rows.len() + 1);
        row["created_at"] = serde_json::json!(format!("2026-10-16T08:0{}:00+00:00", rows.len()));
        rows.push(row.clone());
        Ok((StatusCode::CREATED, Json(row)))
    }

    async fn delete_rows(
        State(store): State<FakeStore>,
        Query(params): Query<HashMap<String, String>>,
    ) -> StatusCode {
        let target = params.get("id").cloned().unwrap_or_default();
        store
            .rows
            .lock()
            .unwrap()
            .retain(|r| format!("eq.{}", r["id"]) != target);
        StatusCode::NO_CONTENT
    }

    async fn spawn_fake_store(store: FakeStore) -> String {
        let app = Router::new()
            .route(
                "/rest/v1/meal_entries",
                get(list_rows).post(insert_row).delete(delete_rows),
            )
            .with_state(store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String, api_key: &str) -> RestStoreClient {
        RestStoreClient::new(&StoreConfig {
            base_url,
            api_key: api_key.to_string(),
            table: "meal_entries".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn eggs() -> NewMeal {
        NewMeal {
            name: "Eggs".to_string(),
            calories: 488.0,
            protein_g: 32.0,
            carbs_g: 34.0,
            fat_g: 22.0,
        }
    }

    #[tokio::test]
    async fn test_create_list_delete_against_fake_store() {
        let store = FakeStore::default();
        let client = client_for(spawn_fake_store(store.clone()).await, "anon-key");

        let created = client.create(&eggs()).await.unwrap();
        assert_eq!(created.id, "1");
        assert_eq!(created.name, "Eggs");
        assert!((created.protein_g - 32.0).abs() < f64::EPSILON);

        let toast = NewMeal {
            name: "Toast".to_string(),
            calories: 120.0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
        };
        client.create(&toast).await.unwrap();

        let rows = client.list(50).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Toast");

        let query = store.seen_queries.lock().unwrap()[0].clone();
        assert_eq!(query["order"], "created_at.desc");
        assert_eq!(query["limit"], "50");
        assert_eq!(query["select"], SELECT_COLUMNS);

        client.delete_by_id("1").await.unwrap();
        let rows = client.list(50).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Toast");
    }

    #[tokio::test]
    async fn test_rejected_request_maps_status() {
        let client = client_for(spawn_fake_store(FakeStore::default()).await, "wrong-key");
        let err = client.list(50).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{addr}"), "anon-key");
        let err = client.create(&eggs()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}

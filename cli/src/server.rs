use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use platelog_core::engine::{MealLogEngine, MealLogSnapshot};
use platelog_core::error::MealLogError;
use platelog_core::models::{MealEntry, QuickAddForm};

const BODY_LIMIT: usize = 64 * 1024; // 64 KB

#[derive(Clone)]
struct AppState {
    engine: Arc<MealLogEngine>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Body of a rejected quick add. The submitted form comes back untouched so the
/// client can keep showing what was typed.
#[derive(Serialize)]
struct QuickAddRejected {
    error: String,
    form: QuickAddForm,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    /// Body the JSON extractor refused, answered with the extractor's own status.
    Payload(StatusCode, String),
    BadGateway(String),
    SessionClosed,
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Payload(status, msg) => (status, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::SessionClosed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Meal log session has been closed".to_string(),
            ),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<MealLogError> for ApiError {
    fn from(err: MealLogError) -> Self {
        match err {
            MealLogError::Validation(e) => Self::BadRequest(e.to_string()),
            MealLogError::Gateway(e) => Self::BadGateway(e.to_string()),
            MealLogError::SessionClosed => Self::SessionClosed,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status.is_server_error() {
            error!(error = %rejection, "failed to read request body");
            Self::Internal
        } else {
            Self::Payload(status, rejection.body_text())
        }
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn get_today(State(state): State<AppState>) -> Json<MealLogSnapshot> {
    Json(state.engine.snapshot())
}

async fn refresh(State(state): State<AppState>) -> Result<Json<MealLogSnapshot>, ApiError> {
    state.engine.initialize().await?;
    Ok(Json(state.engine.snapshot()))
}

async fn quick_add(
    State(state): State<AppState>,
    payload: Result<Json<QuickAddForm>, JsonRejection>,
) -> Response {
    let Json(mut form) = match payload {
        Ok(json) => json,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    let submitted = form.clone();
    match state.engine.quick_add(&mut form).await {
        Ok(entry) => (StatusCode::CREATED, Json::<MealEntry>(entry)).into_response(),
        Err(MealLogError::Validation(e)) => (
            StatusCode::BAD_REQUEST,
            Json(QuickAddRejected {
                error: e.to_string(),
                form: submitted,
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_meal(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(get_today))
        .route("/api/refresh", post(refresh))
        .route("/api/meals", post(quick_add))
        .route("/api/meals/{id}", delete(delete_meal))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// Serve one meal log session until Ctrl-C, then tear it down.
pub async fn start_server(
    engine: Arc<MealLogEngine>,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    if let Err(err) = engine.initialize().await {
        warn!(error = %err, "initial load failed; serving with an empty log");
    }

    let state = AppState {
        engine: Arc::clone(&engine),
    };
    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can change this log."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    engine.teardown();
    Ok(())
}

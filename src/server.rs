//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service name and version |
//! | `GET`  | `/health` | Store counts and active catalog state |
//! | `GET`  | `/ingredients?skip=&limit=` | Catalog listing (defaults 0 / 50) |
//! | `GET`  | `/ingredients/{id}/substitutes?limit=&explain=` | Ranked substitutes |
//! | `POST` | `/recipes` | Create a recipe, returning it with totals |
//! | `GET`  | `/recipes?skip=&limit=` | Recipe summaries (defaults 0 / 20) |
//! | `GET`  | `/recipes/{id}` | One recipe with totals computed on read |
//! | `POST` | `/catalog/reload` | Rebuild the catalog from the database |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "ingredient not found: 42" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request` | 400 |
//! | `not_found` | 404 |
//! | `inconsistent` | 409 |
//! | `dependency_unavailable` | 503 |
//! | `internal` | 500 |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use recipe_harness_core::models::RecipeSummary;
use recipe_harness_core::similarity::{SubstituteResult, TextMode};
use recipe_harness_core::CoreError;

use crate::config::Config;
use crate::service::{
    CreateRecipeRequest, HealthReport, IngredientView, RecipeDetail, RecipeService,
};

/// Starts the HTTP server.
///
/// Opens the database, loads the catalog (including any model download and
/// name embedding) and only then binds to `[server].bind`. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(RecipeService::open(config).await?);
    let app = router(service);

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Recipe API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router over a ready service.
pub fn router(service: Arc<RecipeService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/ingredients", get(handle_list_ingredients))
        .route("/ingredients/{id}/substitutes", get(handle_substitutes))
        .route("/recipes", get(handle_list_recipes).post(handle_create_recipe))
        .route("/recipes/{id}", get(handle_get_recipe))
        .route("/catalog/reload", post(handle_reload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CoreError::Inconsistent(_) => StatusCode::CONFLICT,
        CoreError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Core errors keep their kind; anything else is a 500 and gets logged.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<CoreError>() {
            Some(core) => AppError {
                status: status_for(core),
                code: core.code().to_string(),
                message: core.to_string(),
            },
            None => {
                tracing::error!(error = %format!("{:#}", err), "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal".to_string(),
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

type AppState = State<Arc<RecipeService>>;

// ============ GET / and /health ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
    version: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Recipe Cost & Nutrition API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_health(State(service): AppState) -> Result<Json<HealthReport>, AppError> {
    Ok(Json(service.health().await?))
}

// ============ Listings ============

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

const DEFAULT_INGREDIENT_PAGE: usize = 50;
const DEFAULT_RECIPE_PAGE: usize = 20;

async fn handle_list_ingredients(
    State(service): AppState,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<IngredientView>>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_INGREDIENT_PAGE);
    Ok(Json(service.list_ingredients(params.skip, limit)))
}

async fn handle_list_recipes(
    State(service): AppState,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<RecipeSummary>>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_RECIPE_PAGE);
    Ok(Json(service.list_recipes(params.skip, limit).await?))
}

// ============ GET /ingredients/{id}/substitutes ============

#[derive(Debug, Deserialize)]
struct SubstituteParams {
    limit: Option<usize>,
    #[serde(default)]
    explain: bool,
}

async fn handle_substitutes(
    State(service): AppState,
    Path(id): Path<String>,
    params: Result<Query<SubstituteParams>, QueryRejection>,
) -> Result<Json<Vec<SubstituteResult>>, AppError> {
    let Query(params) = params?;
    Ok(Json(service.find_substitutes(
        &id,
        params.limit,
        params.explain,
    )?))
}

// ============ Recipes ============

async fn handle_create_recipe(
    State(service): AppState,
    body: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeDetail>), AppError> {
    let Json(request) = body?;
    let detail = service.create_recipe(request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn handle_get_recipe(
    State(service): AppState,
    Path(id): Path<String>,
) -> Result<Json<RecipeDetail>, AppError> {
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| bad_request(format!("malformed recipe id: '{}'", id)))?;
    Ok(Json(service.get_recipe(id).await?))
}

// ============ POST /catalog/reload ============

#[derive(Serialize)]
struct ReloadResponse {
    generation: u64,
    ingredients: usize,
    text_mode: TextMode,
}

async fn handle_reload(State(service): AppState) -> Result<Json<ReloadResponse>, AppError> {
    let snapshot = service.reload().await?;
    Ok(Json(ReloadResponse {
        generation: snapshot.generation(),
        ingredients: snapshot.len(),
        text_mode: snapshot.text_mode(),
    }))
}

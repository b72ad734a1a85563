use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use kitchie_core::catalog::{self, IngredientVisual};
use kitchie_core::models::{
    ExportData, NewRecipe, PantryIngredient, Recipe, ShoppingItem, UpdatePantryIngredient,
    UpdateShoppingItem, validate_catalog_name, validate_export_data, validate_positive_quantity,
    validate_recipe,
};
use kitchie_core::reconcile::{RecipeFilter, RecipeStatus};
use kitchie_core::service::{
    BulkShoppingAdd, CookOutcome, KitchenService, Purchase, PurchaseSummary, ShoppingAdd,
};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<KitchenService>>,
    api_key: Option<String>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, KitchenService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreatePantryRequest {
    name: String,
    quantity: String,
    unit: Option<String>,
}

#[derive(Deserialize)]
struct CreateShoppingRequest {
    name: String,
    quantity: f64,
    unit: Option<String>,
    /// Sum into an existing (name, unit) entry instead of answering 409.
    #[serde(default)]
    merge: bool,
}

#[derive(Deserialize)]
struct BuyRequest {
    #[serde(default)]
    all: bool,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct StatusQuery {
    #[serde(default)]
    filter: Option<String>,
}

#[derive(Serialize)]
struct CatalogEntry {
    name: &'static str,
    #[serde(flatten)]
    visual: IngredientVisual,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err}"))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

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

// --- Pantry handlers ---

async fn list_pantry(
    State(state): State<AppState>,
) -> Result<Json<Vec<PantryIngredient>>, ApiError> {
    let pantry = state.svc().pantry().context("failed to load pantry")?;
    Ok(Json(pantry))
}

async fn add_pantry(
    State(state): State<AppState>,
    Json(req): Json<CreatePantryRequest>,
) -> Result<(StatusCode, Json<PantryIngredient>), ApiError> {
    validate_catalog_name(&req.name).map_err(|e| bad_request(&e))?;
    validate_positive_quantity(&req.quantity).map_err(|e| bad_request(&e))?;

    let item = state
        .svc()
        .add_pantry_ingredient(&req.name, &req.quantity, req.unit.as_deref())
        .context("failed to add pantry item")?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_pantry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePantryIngredient>,
) -> Result<Json<PantryIngredient>, ApiError> {
    if let Some(ref name) = req.name {
        validate_catalog_name(name).map_err(|e| bad_request(&e))?;
    }
    let item = state
        .svc()
        .update_pantry_ingredient(&id, &req)
        .context("failed to update pantry item")?
        .ok_or_else(|| ApiError::NotFound(format!("Pantry item {id} not found")))?;
    Ok(Json(item))
}

async fn delete_pantry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state
        .svc()
        .delete_pantry_ingredient(&id)
        .context("failed to delete pantry item")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Pantry item {id} not found")))
    }
}

// --- Recipe handlers ---

fn load_recipe(svc: &KitchenService, id: &str) -> Result<Recipe, ApiError> {
    svc.get_recipe(id)
        .context("failed to load recipes")?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {id} not found")))
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state
        .svc()
        .search_recipes(params.q.as_deref().unwrap_or_default())
        .context("failed to load recipes")?;
    Ok(Json(recipes))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    validate_recipe(&req).map_err(|e| bad_request(&e))?;
    let recipe = state
        .svc()
        .create_recipe(&req)
        .context("failed to create recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = load_recipe(&state.svc(), &id)?;
    Ok(Json(recipe))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewRecipe>,
) -> Result<Json<Recipe>, ApiError> {
    validate_recipe(&req).map_err(|e| bad_request(&e))?;
    let recipe = state
        .svc()
        .update_recipe(&id, &req)
        .context("failed to update recipe")?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {id} not found")))?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state
        .svc()
        .delete_recipe(&id)
        .context("failed to delete recipe")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Recipe {id} not found")))
    }
}

async fn recipe_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StatusQuery>,
) -> Result<Json<RecipeStatus>, ApiError> {
    let filter = match params.filter.as_deref() {
        None | Some("all") => RecipeFilter::All,
        Some("missing") => RecipeFilter::Missing,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Invalid filter '{other}'. Use 'all' or 'missing'"
            )));
        }
    };
    let svc = state.svc();
    let recipe = load_recipe(&svc, &id)?;
    let status = svc
        .recipe_status(&recipe, filter)
        .context("failed to load pantry")?;
    Ok(Json(status))
}

/// Deduct the recipe from the pantry. A shortage answers 409 and leaves the
/// pantry as it was.
async fn cook_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PantryIngredient>>, ApiError> {
    let svc = state.svc();
    let recipe = load_recipe(&svc, &id)?;
    match svc.cook(&recipe).context("failed to cook recipe")? {
        CookOutcome::Cooked { pantry } => Ok(Json(pantry)),
        CookOutcome::Short(shortage) => Err(ApiError::Conflict(shortage.to_string())),
    }
}

async fn add_missing_to_shopping(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BulkShoppingAdd>, ApiError> {
    let svc = state.svc();
    let recipe = load_recipe(&svc, &id)?;
    let outcome = svc
        .add_missing_to_shopping(&recipe, |_| true)
        .context("failed to update shopping list")?;
    Ok(Json(outcome))
}

// --- Shopping handlers ---

async fn list_shopping(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShoppingItem>>, ApiError> {
    let list = state
        .svc()
        .shopping_list()
        .context("failed to load shopping list")?;
    Ok(Json(list))
}

async fn add_shopping(
    State(state): State<AppState>,
    Json(req): Json<CreateShoppingRequest>,
) -> Result<(StatusCode, Json<ShoppingItem>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name cannot be empty".to_string()));
    }
    if !req.quantity.is_finite() || req.quantity <= 0.0 {
        return Err(ApiError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let mut conflict = None;
    let outcome = state
        .svc()
        .add_to_shopping(&req.name, req.quantity, req.unit.as_deref(), |prompt| {
            if !req.merge {
                conflict = Some(prompt.to_string());
            }
            req.merge
        })
        .context("failed to update shopping list")?;

    match outcome {
        ShoppingAdd::Added(item) => Ok((StatusCode::CREATED, Json(item))),
        ShoppingAdd::Merged(item) => Ok((StatusCode::OK, Json(item))),
        ShoppingAdd::Declined => Err(ApiError::Conflict(conflict.unwrap_or_else(|| {
            "Item already on the shopping list; resend with \"merge\": true".to_string()
        }))),
    }
}

async fn update_shopping(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateShoppingItem>,
) -> Result<Json<ShoppingItem>, ApiError> {
    if let Some(q) = req.quantity.as_deref().filter(|q| !q.trim().is_empty()) {
        validate_positive_quantity(q).map_err(|e| bad_request(&e))?;
    }
    let item = state
        .svc()
        .update_shopping_item(&id, &req)
        .context("failed to update shopping item")?
        .ok_or_else(|| ApiError::NotFound(format!("Shopping item {id} not found")))?;
    Ok(Json(item))
}

async fn delete_shopping(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state
        .svc()
        .delete_shopping_item(&id)
        .context("failed to delete shopping item")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Shopping item {id} not found")))
    }
}

async fn toggle_shopping(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShoppingItem>, ApiError> {
    let item = state
        .svc()
        .toggle_checked(&id)
        .context("failed to update shopping item")?
        .ok_or_else(|| ApiError::NotFound(format!("Shopping item {id} not found")))?;
    Ok(Json(item))
}

async fn delete_checked(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .svc()
        .delete_checked()
        .context("failed to update shopping list")?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

async fn clear_shopping(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .svc()
        .clear_shopping_list()
        .context("failed to clear shopping list")?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

async fn buy_shopping(
    State(state): State<AppState>,
    body: Option<Json<BuyRequest>>,
) -> Result<Json<PurchaseSummary>, ApiError> {
    let all = body.is_some_and(|Json(req)| req.all);
    let which = if all { Purchase::All } else { Purchase::Checked };
    let summary = state.svc().buy(which).context("failed to buy items")?;
    Ok(Json(summary))
}

// --- Catalog ---

async fn list_catalog(Query(params): Query<SearchQuery>) -> Json<Vec<CatalogEntry>> {
    let names = match params.q.as_deref() {
        Some(q) => catalog::suggestions(q),
        None => catalog::known_names(),
    };
    Json(
        names
            .into_iter()
            .map(|name| CatalogEntry {
                name,
                visual: catalog::resolve_visual(name),
            })
            .collect(),
    )
}

// --- Export / Import handlers ---

async fn export_data(State(state): State<AppState>) -> Result<Json<ExportData>, ApiError> {
    let data = state.svc().export_data().context("failed to export data")?;
    Ok(Json(data))
}

async fn import_data(
    State(state): State<AppState>,
    Json(data): Json<ExportData>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_export_data(&data).map_err(|e| bad_request(&e))?;
    let summary = state
        .svc()
        .import_data(&data)
        .context("failed to import data")?;
    let value = serde_json::to_value(summary).context("failed to serialize import summary")?;
    Ok(Json(value))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/pantry", get(list_pantry).post(add_pantry))
        .route("/api/pantry/{id}", put(update_pantry).delete(delete_pantry))
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/recipes/{id}/status", get(recipe_status))
        .route("/api/recipes/{id}/cook", post(cook_recipe))
        .route("/api/recipes/{id}/shopping", post(add_missing_to_shopping))
        .route(
            "/api/shopping",
            get(list_shopping).post(add_shopping).delete(clear_shopping),
        )
        .route("/api/shopping/checked", delete(delete_checked))
        .route("/api/shopping/buy", post(buy_shopping))
        .route(
            "/api/shopping/{id}",
            put(update_shopping).delete(delete_shopping),
        )
        .route("/api/shopping/{id}/toggle", post(toggle_shopping))
        .route("/api/catalog", get(list_catalog))
        .route("/api/export", get(export_data))
        .route("/api/import", post(import_data))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of the key. Short or non-ASCII keys (a
/// hand-edited key file) are not shown at all.
fn mask_api_key(key: &str) -> String {
    if key.len() >= 8 && key.is_ascii() {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    } else {
        "(set)".to_string()
    }
}

pub async fn start_server(
    svc: KitchenService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        if !new_api_key {
            eprintln!("API key: {} (see api_key file in data directory)", mask_api_key(key));
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(%bind, port, "server started");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use kitchie_core::db::Database;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            svc: Arc::new(Mutex::new(KitchenService::with_store(
                Database::open_in_memory().unwrap(),
            ))),
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    async fn send(app: &Router, request: axum::http::Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let (status, json) = send(&app, get("/api/pantry")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let request = axum::http::Request::get("/api/pantry")
            .header("Authorization", "Bearer wrong-key")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let request = axum::http::Request::get("/api/pantry")
            .header("Authorization", "Bearer test-key-abc123")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(Some("secret".to_string()));
        let response = app.oneshot(get("/api/pantry")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/import")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/kitchie.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn pantry_add_rejects_unknown_ingredient() {
        let app = test_app(None);
        let (status, json) = send(
            &app,
            post_json("/api/pantry", &serde_json::json!({ "name": "caviar", "quantity": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("caviar"));

        let (status, _) = send(
            &app,
            post_json("/api/pantry", &serde_json::json!({ "name": "egg", "quantity": "0" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pantry_add_merges() {
        let app = test_app(None);
        let body = serde_json::json!({ "name": "Egg", "quantity": "2" });
        let (status, _) = send(&app, post_json("/api/pantry", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, json) = send(&app, post_json("/api/pantry", &body)).await;
        assert_eq!(json["quantity"], "4");

        let (_, list) = send(&app, get("/api/pantry")).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_ids_return_404() {
        let app = test_app(None);
        let (status, _) = send(&app, get("/api/recipes/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, post_json("/api/recipes/nope/cook", &serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            post_json("/api/shopping/nope/toggle", &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let request = axum::http::Request::delete("/api/pantry/nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn recipe_validation_returns_400() {
        let app = test_app(None);
        let (status, json) = send(
            &app,
            post_json("/api/recipes", &serde_json::json!({ "title": "Toast", "ingredients": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Add at least 1 ingredient");
    }

    #[tokio::test]
    async fn cook_flow_status_shortage_then_success() {
        let app = test_app(None);
        send(
            &app,
            post_json("/api/pantry", &serde_json::json!({ "name": "egg", "quantity": "1" })),
        )
        .await;
        let (status, recipe) = send(
            &app,
            post_json(
                "/api/recipes",
                &serde_json::json!({
                    "title": "Scrambled eggs",
                    "imageKey": "eggs",
                    "ingredients": [{ "name": "Egg", "quantity": 2 }]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(recipe["imageKey"], "eggs");
        let id = recipe["id"].as_str().unwrap().to_string();

        let (_, st) = send(&app, get(&format!("/api/recipes/{id}/status?filter=missing"))).await;
        assert_eq!(st["makeable"], false);
        assert_eq!(st["ingredients"].as_array().unwrap().len(), 1);

        let (status, json) = send(
            &app,
            post_json(&format!("/api/recipes/{id}/cook"), &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "Not enough egg: need 2, have 1");

        send(
            &app,
            post_json("/api/pantry", &serde_json::json!({ "name": "egg", "quantity": "1" })),
        )
        .await;
        let (status, pantry) = send(
            &app,
            post_json(&format!("/api/recipes/{id}/cook"), &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pantry, serde_json::json!([]));
    }

    #[tokio::test]
    async fn shopping_add_conflict_until_merge() {
        let app = test_app(None);
        let (status, _) = send(
            &app,
            post_json("/api/shopping", &serde_json::json!({ "name": "Milk", "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(
            &app,
            post_json("/api/shopping", &serde_json::json!({ "name": "milk", "quantity": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            json["error"],
            "You already have 1 x of milk in your shopping list. Add 2 more?"
        );

        let (status, json) = send(
            &app,
            post_json(
                "/api/shopping",
                &serde_json::json!({ "name": "milk", "quantity": 2, "merge": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quantity"], "3");
        assert_eq!(json["name"], "Milk");
    }

    #[tokio::test]
    async fn shopping_edit_rejects_non_positive_quantity() {
        let app = test_app(None);
        let (_, item) = send(
            &app,
            post_json("/api/shopping", &serde_json::json!({ "name": "Egg", "quantity": 2 })),
        )
        .await;
        let id = item["id"].as_str().unwrap();

        let put = |quantity: &str| {
            axum::http::Request::put(format!("/api/shopping/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "quantity": quantity }).to_string()))
                .unwrap()
        };
        let (status, _) = send(&app, put("-5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(&app, put("4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quantity"], "4");
    }

    #[test]
    fn api_key_mask() {
        assert_eq!(mask_api_key("abcd1234efgh5678"), "abcd...5678");
        assert_eq!(mask_api_key("ab"), "(set)");
        assert_eq!(mask_api_key("abcdefg"), "(set)");
        assert_eq!(mask_api_key("clé-secrète-longue"), "(set)");
    }

    #[tokio::test]
    async fn start_server_with_short_key_does_not_panic() {
        let svc = KitchenService::with_store(Database::open_in_memory().unwrap());
        let handle = tokio::spawn(start_server(svc, 0, "127.0.0.1", Some("ab".into()), false));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        handle.abort();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn shopping_toggle_buy_moves_to_pantry() {
        let app = test_app(None);
        let (_, item) = send(
            &app,
            post_json("/api/shopping", &serde_json::json!({ "name": "Carrot", "quantity": 3 })),
        )
        .await;
        send(
            &app,
            post_json("/api/shopping", &serde_json::json!({ "name": "Rice", "quantity": 1 })),
        )
        .await;
        let id = item["id"].as_str().unwrap();

        let (status, toggled) = send(
            &app,
            post_json(&format!("/api/shopping/{id}/toggle"), &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["checked"], true);

        let (status, summary) = send(&app, post_json("/api/shopping/buy", &serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["purchased"], 1);
        assert_eq!(summary["shopping"].as_array().unwrap().len(), 1);
        assert_eq!(summary["pantry"][0]["name"], "Carrot");
        assert_eq!(summary["pantry"][0]["quantity"], "3");
    }

    #[tokio::test]
    async fn shopping_from_recipe_adds_missing() {
        let app = test_app(None);
        let (_, recipe) = send(
            &app,
            post_json(
                "/api/recipes",
                &serde_json::json!({
                    "title": "Fried rice",
                    "ingredients": [{ "name": "rice", "quantity": 2 }, { "name": "egg" }]
                }),
            ),
        )
        .await;
        let id = recipe["id"].as_str().unwrap();
        let (status, json) = send(
            &app,
            post_json(&format!("/api/recipes/{id}/shopping"), &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "added");
        assert_eq!(json["added"], 2);

        let (_, list) = send(&app, get("/api/shopping")).await;
        assert_eq!(list.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn catalog_suggestions() {
        let app = test_app(None);
        let (status, json) = send(&app, get("/api/catalog?q=soy")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["name"], "soy sauce");
        assert_eq!(json[0]["height"], 56);
    }

    #[tokio::test]
    async fn export_import_roundtrip() {
        let app = test_app(None);
        send(
            &app,
            post_json("/api/pantry", &serde_json::json!({ "name": "salt", "quantity": "1" })),
        )
        .await;
        let (_, data) = send(&app, get("/api/export")).await;
        assert_eq!(data["version"], 1);

        let other = test_app(None);
        let (status, summary) = send(&other, post_json("/api/import", &data)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["pantry"], 1);

        let mut bad = data.clone();
        bad["version"] = serde_json::json!(99);
        let (status, _) = send(&other, post_json("/api/import", &bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

//! Web dashboard for the Kanto inventory
//!
//! Read endpoints are open. Every mutation needs the admin PIN in the
//! `X-Admin-Pin` header; without a configured PIN the dashboard is read-only.
//! The PIN is checked before the request body, so a malformed body only
//! gets a 400 once the caller is authorized.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use kanto_common::TitleMatch;

use crate::allocation::{
    allocation_summary, assign, move_allocation, remove_allocation, set_allocated_quantity,
    AllocationSummary,
};
use crate::catalog::{products_without_entry, set_display_name, set_image, set_unit_cost};
use crate::error::InventoryError;
use crate::inventory::{add_manual_item, delete_item, set_item_quantity};
use crate::reporting::{build_report, ItemReport, ReportOptions};

/// Header carrying the admin PIN on mutation requests
pub const PIN_HEADER: &str = "x-admin-pin";
pub const DEFAULT_PORT: u16 = 5173;
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Listener and access settings for the dashboard
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub admin_pin: Option<String>,
    pub images_dir: PathBuf,
}

impl WebConfig {
    /// Localhost on the default port, images next to the database
    pub fn new(images_dir: PathBuf) -> Self {
        WebConfig {
            bind: DEFAULT_BIND,
            port: DEFAULT_PORT,
            admin_pin: None,
            images_dir,
        }
    }
}

/// Shared application state (thread-safe database connection + settings)
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    admin_pin: Option<Arc<str>>,
    images_dir: Arc<PathBuf>,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Errors surfaced to the browser
#[derive(Debug)]
enum ApiError {
    Forbidden(&'static str),
    BadBody(JsonRejection),
    Inventory(InventoryError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection)
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Inventory(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden(reason) => (StatusCode::FORBIDDEN, reason.to_string()),
            ApiError::BadBody(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::Inventory(err) => {
                let status = match &err {
                    InventoryError::InvalidInput(_) | InventoryError::Common(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
                    InventoryError::OverAllocated { .. } => StatusCode::CONFLICT,
                    _ => {
                        log::error!("Request failed: {}", err);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn lock(state: &AppState) -> Result<MutexGuard<'_, Connection>, ApiError> {
    state
        .db
        .lock()
        .map_err(|_| ApiError::Inventory(InventoryError::LockPoisoned))
}

fn check_pin(state: &AppState, supplied: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = state.admin_pin.as_deref() else {
        return Err(ApiError::Forbidden("admin PIN is not configured"));
    };
    match supplied {
        Some(pin) if pin.trim() == expected => Ok(()),
        _ => Err(ApiError::Forbidden("wrong admin PIN")),
    }
}

fn require_pin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let supplied = headers.get(PIN_HEADER).and_then(|v| v.to_str().ok());
    check_pin(state, supplied)
}

/// Loose boolean query flag: true/1/yes/on, `default` when absent
fn parse_flag(value: Option<&str>, default: bool) -> bool {
    value.map_or(default, |v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    })
}

/// Items query parameters
#[derive(Deserialize, Default)]
struct ItemsParams {
    title_match: Option<String>,
    include_giveaways: Option<String>,
    group_by_buyer: Option<String>,
}

/// GET / - Serve the dashboard (single HTML page)
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// GET /api/items?title_match=&include_giveaways=&group_by_buyer=
async fn items_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemsParams>,
) -> ApiResult<ItemReport> {
    let title_match = match params.title_match.as_deref().map(str::trim) {
        None | Some("") => TitleMatch::Custom,
        Some(mode) => mode.parse::<TitleMatch>().map_err(InventoryError::from)?,
    };
    let options = ReportOptions {
        group_by_buyer: parse_flag(params.group_by_buyer.as_deref(), false),
        include_non_sales: parse_flag(params.include_giveaways.as_deref(), true),
        title_match,
    };
    let conn = lock(&state)?;
    Ok(ApiResponse::ok(build_report(&conn, options)?))
}

/// GET /api/allocations
async fn allocations_handler(State(state): State<AppState>) -> ApiResult<AllocationSummary> {
    let conn = lock(&state)?;
    Ok(ApiResponse::ok(allocation_summary(&conn)?))
}

/// GET /api/catalog/missing
async fn missing_catalog_handler(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let conn = lock(&state)?;
    Ok(ApiResponse::ok(products_without_entry(&conn)?))
}

/// GET /images/{file} - files directly inside the images directory
async fn image_handler(
    State(state): State<AppState>,
    Path(file): Path<String>,
    request: Request,
) -> Response {
    let safe = !file.is_empty()
        && file != "."
        && !file.contains("..")
        && !file.contains(['/', '\\']);
    if !safe {
        log::warn!("Rejected image path: {}", file);
        return StatusCode::NOT_FOUND.into_response();
    }
    match ServeFile::new(state.images_dir.join(&file)).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

#[derive(Deserialize)]
struct UnlockRequest {
    pin: String,
}

/// POST /api/unlock - check a PIN before the dashboard enables editing
async fn unlock_handler(
    State(state): State<AppState>,
    body: Result<Json<UnlockRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = body?;
    check_pin(&state, Some(&body.pin))?;
    Ok(ApiResponse::ok(json!({ "unlocked": true })))
}

#[derive(Deserialize)]
struct UpdateQuantityRequest {
    item_name: String,
    quantity: i64,
}

/// POST /api/update-quantity
async fn update_quantity_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let mut conn = lock(&state)?;
    let updated = set_item_quantity(&mut conn, &body.item_name, body.quantity)?;
    Ok(ApiResponse::ok(json!({ "transactions_updated": updated })))
}

#[derive(Deserialize)]
struct DeleteItemRequest {
    item_name: String,
}

/// POST /api/delete-item
async fn delete_item_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DeleteItemRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let mut conn = lock(&state)?;
    let deleted = delete_item(&mut conn, &body.item_name)?;
    Ok(ApiResponse::ok(json!({ "deleted": deleted })))
}

#[derive(Deserialize)]
struct AllocationRequest {
    item_name: String,
    owner: String,
    quantity: i64,
}

/// POST /api/assign
async fn assign_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AllocationRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let conn = lock(&state)?;
    let allocation = assign(&conn, &body.item_name, &body.owner, body.quantity)?;
    Ok(ApiResponse::ok(serde_json::to_value(allocation).map_err(InventoryError::from)?))
}

/// POST /api/update-allocated-quantity
async fn update_allocated_quantity_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AllocationRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let conn = lock(&state)?;
    let allocation = set_allocated_quantity(&conn, &body.item_name, &body.owner, body.quantity)?;
    Ok(ApiResponse::ok(serde_json::to_value(allocation).map_err(InventoryError::from)?))
}

#[derive(Deserialize)]
struct MoveAllocationRequest {
    item_name: String,
    from_owner: String,
    to_owner: String,
    #[serde(default)]
    quantity: Option<i64>,
}

/// POST /api/move-allocation
async fn move_allocation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<MoveAllocationRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let mut conn = lock(&state)?;
    let allocation = move_allocation(
        &mut conn,
        &body.item_name,
        &body.from_owner,
        &body.to_owner,
        body.quantity,
    )?;
    Ok(ApiResponse::ok(serde_json::to_value(allocation).map_err(InventoryError::from)?))
}

#[derive(Deserialize)]
struct RemoveAllocationRequest {
    item_name: String,
    owner: String,
}

/// POST /api/remove-allocation
async fn remove_allocation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RemoveAllocationRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let conn = lock(&state)?;
    remove_allocation(&conn, &body.item_name, &body.owner)?;
    Ok(ApiResponse::ok(json!({ "removed": true })))
}

fn default_quantity() -> i64 {
    1
}

#[derive(Deserialize)]
struct AddItemRequest {
    name: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
    #[serde(default)]
    unit_cost: f64,
    #[serde(default)]
    set: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

/// POST /api/admin/add-item
async fn add_item_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let mut conn = lock(&state)?;
    let added = add_manual_item(
        &mut conn,
        &body.name,
        body.quantity,
        body.unit_cost,
        body.set.as_deref(),
        body.image_url.as_deref(),
    )?;
    Ok(ApiResponse::ok(serde_json::to_value(added).map_err(InventoryError::from)?))
}

#[derive(Deserialize)]
struct UpdateImageRequest {
    normalized_name: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// POST /api/admin/update-image - an empty url clears the image
async fn update_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UpdateImageRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let conn = lock(&state)?;
    set_image(
        &conn,
        &body.normalized_name,
        body.image_url.as_deref().unwrap_or(""),
        body.thumbnail_url.as_deref(),
    )?;
    Ok(ApiResponse::ok(json!({ "updated": true })))
}

#[derive(Deserialize)]
struct UpdateNameRequest {
    normalized_name: String,
    new_name: String,
}

/// POST /api/admin/update-name
async fn update_name_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UpdateNameRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let conn = lock(&state)?;
    set_display_name(&conn, &body.normalized_name, &body.new_name)?;
    Ok(ApiResponse::ok(json!({ "updated": true })))
}

#[derive(Deserialize)]
struct UpdatePriceRequest {
    normalized_name: String,
    unit_cost: f64,
}

/// POST /api/admin/update-price
async fn update_price_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UpdatePriceRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_pin(&state, &headers)?;
    let Json(body) = body?;
    let conn = lock(&state)?;
    set_unit_cost(&conn, &body.normalized_name, body.unit_cost)?;
    Ok(ApiResponse::ok(json!({ "updated": true })))
}

/// Build the web server router
pub fn create_router(db: Arc<Mutex<Connection>>, config: &WebConfig) -> Router {
    let state = AppState {
        db,
        admin_pin: config
            .admin_pin
            .as_deref()
            .map(str::trim)
            .filter(|pin| !pin.is_empty())
            .map(Arc::from),
        images_dir: Arc::new(config.images_dir.clone()),
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/items", get(items_handler))
        .route("/api/allocations", get(allocations_handler))
        .route("/api/catalog/missing", get(missing_catalog_handler))
        .route("/images/{file}", get(image_handler))
        .route("/api/unlock", post(unlock_handler))
        .route("/api/update-quantity", post(update_quantity_handler))
        .route("/api/assign", post(assign_handler))
        .route("/api/delete-item", post(delete_item_handler))
        .route(
            "/api/update-allocated-quantity",
            post(update_allocated_quantity_handler),
        )
        .route("/api/move-allocation", post(move_allocation_handler))
        .route("/api/remove-allocation", post(remove_allocation_handler))
        .route("/api/admin/add-item", post(add_item_handler))
        .route("/api/admin/update-image", post(update_image_handler))
        .route("/api/admin/update-name", post(update_name_handler))
        .route("/api/admin/update-price", post(update_price_handler))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down web UI");
}

/// Start the web server (async)
///
/// Binds to localhost unless told otherwise.
pub async fn serve(db: Arc<Mutex<Connection>>, config: &WebConfig) -> crate::Result<()> {
    if config.admin_pin.as_deref().map_or(true, |p| p.trim().is_empty()) {
        log::warn!("No admin PIN configured, dashboard is read-only");
    }

    let app = create_router(db, config);
    let addr = SocketAddr::new(config.bind, config.port);

    log::info!("Web UI listening on http://{}", addr);
    log::info!("Serving images from {}", config.images_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;

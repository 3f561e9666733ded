mod cart;
mod db;
mod error;
mod identity;
mod models;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use cart::{
    AddItemRequest, ApplyPromoRequest, Cart, CartItemResponse, CartResponse, CartService,
    CartStatus, DiscountKind, PgCartStore, PgPriceOracle, PgPromotionOracle, UpdateItemRequest,
};
use db::{AdminCarts, PgAdminCartStore};
use error::ApiError;
use models::{CreateCartRequest, UpdateCartRequest};
use validator::Validate;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        cart::handlers::get_current_cart_handler,
        cart::handlers::add_item_handler,
        cart::handlers::update_item_handler,
        cart::handlers::remove_item_handler,
        cart::handlers::apply_promo_handler,
        cart::handlers::remove_promo_handler,
        cart::handlers::clear_cart_handler,
        list_carts,
        get_cart_by_id,
        create_cart,
        update_cart,
        delete_cart,
    ),
    components(
        schemas(
            Cart, CartStatus, DiscountKind, CartResponse, CartItemResponse,
            AddItemRequest, UpdateItemRequest, ApplyPromoRequest,
            CreateCartRequest, UpdateCartRequest
        )
    ),
    tags(
        (name = "cart", description = "Shopping cart endpoints for the authenticated user"),
        (name = "admin", description = "Administrative cart CRUD, bypassing cart business rules")
    ),
    info(
        title = "Cart API",
        version = "1.0.0",
        description = "RESTful API for the shopping cart aggregate",
        contact(
            name = "API Support",
            email = "support@cartapi.com"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    cart_service: CartService,
    admin_carts: AdminCarts,
}

impl FromRef<AppState> for CartService {
    fn from_ref(state: &AppState) -> Self {
        state.cart_service.clone()
    }
}

impl FromRef<AppState> for AdminCarts {
    fn from_ref(state: &AppState) -> Self {
        state.admin_carts.clone()
    }
}

/// Handler for GET /api/admin/carts
/// Lists all carts regardless of owner or status
#[utoipa::path(
    get,
    path = "/api/admin/carts",
    responses(
        (status = 200, description = "List of all carts", body = Vec<Cart>),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "admin"
)]
async fn list_carts(State(store): State<AdminCarts>) -> Result<Json<Vec<Cart>>, ApiError> {
    tracing::debug!("Fetching all carts");

    let carts = store.list().await?;

    tracing::debug!("Retrieved {} carts", carts.len());
    Ok(Json(carts))
}

/// Handler for GET /api/admin/carts/:id
/// Retrieves a specific cart row by ID
#[utoipa::path(
    get,
    path = "/api/admin/carts/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart ID")
    ),
    responses(
        (status = 200, description = "Cart found", body = Cart),
        (status = 404, description = "Cart not found", body = String, example = json!({"error": "Cart with id ... not found"}))
    ),
    tag = "admin"
)]
async fn get_cart_by_id(
    State(store): State<AdminCarts>,
    Path(id): Path<Uuid>,
) -> Result<Json<Cart>, ApiError> {
    tracing::debug!("Fetching cart with id: {}", id);

    let cart = store.find(id).await?.ok_or_else(|| ApiError::NotFound {
        resource: "Cart".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(cart))
}

/// Handler for POST /api/admin/carts
/// Creates an empty Active cart for a user
#[utoipa::path(
    post,
    path = "/api/admin/carts",
    request_body = CreateCartRequest,
    responses(
        (status = 201, description = "Cart created successfully", body = Cart),
        (status = 400, description = "Invalid input data", body = String),
        (status = 409, description = "User already has an active cart", body = String)
    ),
    tag = "admin"
)]
async fn create_cart(
    State(store): State<AdminCarts>,
    Json(payload): Json<CreateCartRequest>,
) -> Result<(StatusCode, Json<Cart>), ApiError> {
    tracing::debug!("Administratively creating cart for user {}", payload.user_id);

    payload.validate()?;

    if store.has_active(payload.user_id).await? {
        tracing::warn!(
            "Attempt to create second active cart for user {}",
            payload.user_id
        );
        return Err(ApiError::Conflict {
            message: format!("User {} already has an active cart", payload.user_id),
        });
    }

    let cart = store.insert(payload.user_id).await?;

    tracing::info!("Successfully created cart with id: {}", cart.id);
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Handler for PUT /api/admin/carts/:id
/// Updates an existing cart's administrative fields
#[utoipa::path(
    put,
    path = "/api/admin/carts/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart ID")
    ),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Cart updated successfully", body = Cart),
        (status = 400, description = "No fields to update", body = String, example = json!({"error": "Update request contains no fields to change"})),
        (status = 404, description = "Cart not found", body = String)
    ),
    tag = "admin"
)]
async fn update_cart(
    State(store): State<AdminCarts>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Json<Cart>, ApiError> {
    tracing::debug!("Updating cart with id: {}", id);

    if payload.is_empty() {
        return Err(ApiError::NoFieldsToUpdate);
    }

    let updated_cart = store
        .update(id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Cart".to_string(),
            id: id.to_string(),
        })?;

    tracing::info!("Successfully updated cart with id: {}", id);
    Ok(Json(updated_cart))
}

/// Handler for DELETE /api/admin/carts/:id
/// Deletes a cart; its line items are removed by cascade
#[utoipa::path(
    delete,
    path = "/api/admin/carts/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart ID")
    ),
    responses(
        (status = 204, description = "Cart deleted successfully"),
        (status = 404, description = "Cart not found", body = String)
    ),
    tag = "admin"
)]
async fn delete_cart(
    State(store): State<AdminCarts>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting cart with id: {}", id);

    if !store.delete(id).await? {
        return Err(ApiError::NotFound {
            resource: "Cart".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted cart with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Maps all API endpoints to their handlers and adds CORS middleware
fn app_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Cart routes
        .route("/api/cart", get(cart::handlers::get_current_cart_handler))
        .route("/api/cart", delete(cart::handlers::clear_cart_handler))
        .route("/api/cart/items", post(cart::handlers::add_item_handler))
        .route("/api/cart/items/:item_id", put(cart::handlers::update_item_handler))
        .route("/api/cart/items/:item_id", delete(cart::handlers::remove_item_handler))
        .route("/api/cart/promo", post(cart::handlers::apply_promo_handler))
        .route("/api/cart/promo", delete(cart::handlers::remove_promo_handler))
        // Administrative routes
        .route("/api/admin/carts", get(list_carts))
        .route("/api/admin/carts", post(create_cart))
        .route("/api/admin/carts/:id", get(get_cart_by_id))
        .route("/api/admin/carts/:id", put(update_cart))
        .route("/api/admin/carts/:id", delete(delete_cart))
        .layer(cors)
        .with_state(state)
}

/// Wires the router over PostgreSQL-backed collaborators
fn create_router(db: PgPool) -> Router {
    let cart_service = CartService::new(
        Arc::new(PgCartStore::new(db.clone())),
        Arc::new(PgPriceOracle::new(db.clone())),
        Arc::new(PgPromotionOracle::new(db.clone())),
    );
    let admin_carts: AdminCarts = Arc::new(PgAdminCartStore::new(db));

    app_router(AppState {
        cart_service,
        admin_carts,
    })
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Cart API - Starting...");

    // Get configuration from environment variables
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST")
        .unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Create the application router
    let app = create_router(db_pool);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Cart API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

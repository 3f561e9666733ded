// HTTP handlers for the cart endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::cart::{
    AddItemRequest, ApplyPromoRequest, CartError, CartResponse, CartService, UpdateItemRequest,
};
use crate::identity::CurrentUser;

/// Handler for GET /api/cart
/// Returns the authenticated user's current cart, creating one if needed
#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 400, description = "Malformed user id", body = String, example = json!({"error": "Invalid user id: abc"})),
        (status = 401, description = "Missing user identity", body = String, example = json!({"error": "Missing user identity"}))
    ),
    tag = "cart"
)]
pub async fn get_current_cart_handler(
    State(service): State<CartService>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, CartError> {
    tracing::debug!("Fetching current cart for user {}", user.user_id);

    let cart = service.get_current_cart(user.user_id).await?;
    Ok(Json(cart))
}

/// Handler for POST /api/cart/items
/// Adds a quantity of a product to the current cart
#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or inactive product", body = String, example = json!({"error": "Quantity must be positive, got 0"})),
        (status = 404, description = "Product not found", body = String, example = json!({"error": "Product with id 9 not found"}))
    ),
    tag = "cart"
)]
pub async fn add_item_handler(
    State(service): State<CartService>,
    user: CurrentUser,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, CartError> {
    request
        .validate()
        .map_err(|e| CartError::InvalidQuantity(e.to_string()))?;

    tracing::debug!(
        "Adding {} x product {} to cart of user {}",
        request.quantity,
        request.product_id,
        user.user_id
    );

    let cart = service
        .add_item(user.user_id, request.product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

/// Handler for PUT /api/cart/items/:item_id
/// Changes a line item's quantity
#[utoipa::path(
    put,
    path = "/api/cart/items/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart line item ID")
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity", body = String, example = json!({"error": "Quantity must be positive, got -1"})),
        (status = 404, description = "Item not in the caller's cart", body = String, example = json!({"error": "Cart item not found"}))
    ),
    tag = "cart"
)]
pub async fn update_item_handler(
    State(service): State<CartService>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, CartError> {
    request
        .validate()
        .map_err(|e| CartError::InvalidQuantity(e.to_string()))?;

    let cart = service
        .update_item(user.user_id, item_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

/// Handler for DELETE /api/cart/items/:item_id
/// Removes a line item from the current cart
#[utoipa::path(
    delete,
    path = "/api/cart/items/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart line item ID")
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Item not in the caller's cart", body = String, example = json!({"error": "Cart item not found"}))
    ),
    tag = "cart"
)]
pub async fn remove_item_handler(
    State(service): State<CartService>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<CartResponse>, CartError> {
    let cart = service.remove_item(user.user_id, item_id).await?;
    Ok(Json(cart))
}

/// Handler for POST /api/cart/promo
/// Applies a promo code, replacing any previously applied one
#[utoipa::path(
    post,
    path = "/api/cart/promo",
    request_body = ApplyPromoRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid promo code", body = String, example = json!({"error": "Promo code must not be empty"})),
        (status = 404, description = "Promo code not found", body = String, example = json!({"error": "Promo code 'NOPE' not found"})),
        (status = 410, description = "Promo code expired", body = String, example = json!({"error": "Promo code 'OLD' has expired"}))
    ),
    tag = "cart"
)]
pub async fn apply_promo_handler(
    State(service): State<CartService>,
    user: CurrentUser,
    Json(request): Json<ApplyPromoRequest>,
) -> Result<Json<CartResponse>, CartError> {
    request
        .validate()
        .map_err(|_| CartError::InvalidPromoCode("Promo code must not be empty".to_string()))?;

    let cart = service.apply_promo(user.user_id, &request.code).await?;
    Ok(Json(cart))
}

/// Handler for DELETE /api/cart/promo
/// Removes any applied promo code (idempotent)
#[utoipa::path(
    delete,
    path = "/api/cart/promo",
    responses(
        (status = 200, description = "Updated cart", body = CartResponse)
    ),
    tag = "cart"
)]
pub async fn remove_promo_handler(
    State(service): State<CartService>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, CartError> {
    let cart = service.remove_promo(user.user_id).await?;
    Ok(Json(cart))
}

/// Handler for DELETE /api/cart
/// Clears all line items and any applied promo; the cart stays active
#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cleared cart", body = CartResponse)
    ),
    tag = "cart"
)]
pub async fn clear_cart_handler(
    State(service): State<CartService>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, CartError> {
    tracing::debug!("Clearing cart for user {}", user.user_id);

    let cart = service.clear_cart(user.user_id).await?;
    Ok(Json(cart))
}

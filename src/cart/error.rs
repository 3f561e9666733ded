use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cart item not found")]
    ItemNotFound,

    #[error("Product {0} not found")]
    ProductNotFound(i32),

    #[error("Product {0} is not available for purchase")]
    ProductInactive(i32),

    #[error("Promo code '{0}' not found")]
    PromoNotFound(String),

    #[error("Promo code '{0}' has expired")]
    PromoExpired(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid promo code: {0}")]
    InvalidPromoCode(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Missing user identity")]
    Unauthenticated,

    #[error("Concurrent cart modification: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-constraint violations are the storage layer's race detector;
        // the service retries them once before surfacing a 409.
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return CartError::Conflict(db_err.message().to_string());
            }
        }
        CartError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            CartError::DatabaseError(msg) => {
                // Full detail stays in the logs; no internals leak to clients.
                tracing::error!("Cart storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            CartError::ItemNotFound => {
                (StatusCode::NOT_FOUND, "Cart item not found".to_string())
            }
            CartError::ProductNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Product with id {} not found", id),
            ),
            CartError::ProductInactive(id) => (
                StatusCode::BAD_REQUEST,
                format!("Product with id {} is not available for purchase", id),
            ),
            CartError::PromoNotFound(code) => (
                StatusCode::NOT_FOUND,
                format!("Promo code '{}' not found", code),
            ),
            CartError::PromoExpired(code) => (
                StatusCode::GONE,
                format!("Promo code '{}' has expired", code),
            ),
            CartError::InvalidQuantity(msg) => (StatusCode::BAD_REQUEST, msg),
            CartError::InvalidPromoCode(msg) => (StatusCode::BAD_REQUEST, msg),
            CartError::InvalidUserId(msg) => (StatusCode::BAD_REQUEST, msg),
            CartError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Missing user identity".to_string())
            }
            CartError::Conflict(msg) => {
                tracing::warn!("Cart conflict surfaced to client: {}", msg);
                (
                    StatusCode::CONFLICT,
                    "The cart was modified concurrently, please retry".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

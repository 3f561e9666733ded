use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::cart::models::CartStatus;

/// Request DTO for administratively creating a cart
///
/// Used for POST /api/admin/carts. The created cart is empty and Active;
/// creation fails if the user already has an Active cart.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCartRequest {
    #[validate(range(min = 1, message = "User id must be positive"))]
    #[schema(example = 42, minimum = 1)]
    pub user_id: i32,
}

/// Request DTO for administratively updating a cart
///
/// Used for PUT /api/admin/carts/{id}. All fields are optional to support
/// partial updates; a request with no fields fails with NoFieldsToUpdate.
/// Derived pricing fields are never administratively settable.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    #[schema(example = "abandoned")]
    pub status: Option<CartStatus>,
}

impl UpdateCartRequest {
    /// Whether the request carries any field to change
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
    }
}
